//! JSON-lines input rows and output records

use std::io::{BufRead, Write};

use log::{debug, warn};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::request::ResultRecord;

/// Read prompt texts from JSON lines.
///
/// Each non-blank line is either a JSON string or an object whose `column`
/// field is a string. Stops after `limit` rows when given.
pub fn read_prompts<R: BufRead>(
  reader: R
, column: &str
, limit: Option<usize>
) -> Result<Vec<String>>
{   let mut texts = Vec::new();
    for (line_no, line) in reader.lines().enumerate()
    {   if limit.is_some_and(|l| texts.len() >= l)
        {   break;
        }
        let line = line?;
        if line.trim().is_empty()
        {   continue;
        }
        let row: Value = serde_json::from_str(&line).map_err(|e| {
          Error::ParseError(format!("line {}: {}", line_no + 1, e))
        })?;
        let text = match row
        {   Value::String(s) => s
          , Value::Object(mut obj) => match obj.remove(column)
            {   Some(Value::String(s)) => s
              , Some(other) => {
                  return Err(Error::ParseError(format!(
                    "line {}: column '{}' is not a string: {}"
                  , line_no + 1, column, other
                  )));
                }
              , None => {
                  warn!("Line {} has no '{}' column", line_no + 1, column);
                  return Err(Error::ParseError(format!(
                    "line {}: missing column '{}'"
                  , line_no + 1, column
                  )));
                }
            }
          , other => {
              return Err(Error::ParseError(format!(
                "line {}: expected string or object, got {}"
              , line_no + 1, other
              )));
            }
        };
        texts.push(text);
    }
    debug!("Read {} prompts", texts.len());
    Ok(texts)
}

/// Write one JSON object per record, in order
pub fn write_records<W: Write>(
  mut writer: W
, records: &[ResultRecord]
) -> Result<()>
{   for record in records
    {   serde_json::to_writer(&mut writer, record)
          .map_err(|e| Error::Io(e.to_string()))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
