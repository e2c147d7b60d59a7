//! Shaping gateway responses into output records

use chrono::{DateTime, FixedOffset, Utc};

use crate::request::{Prompt, QueryResponse, ResultRecord};

/// Builds `ResultRecord`s with a fixed temperature and civil-time offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseFormatter
{   pub temperature: f32
  , pub offset: FixedOffset
}

impl ResponseFormatter
{   pub fn new(temperature: f32, offset: FixedOffset) -> Self
    {   ResponseFormatter
        {   temperature
          , offset
        }
    }

    /// Stamp with the current time. `None` yields a degraded record.
    pub fn format(
      &self
    , prompt: &Prompt
    , response: Option<&QueryResponse>
    ) -> ResultRecord
    {   self.format_at(prompt, response, Utc::now())
    }

    pub fn format_at(
      &self
    , prompt: &Prompt
    , response: Option<&QueryResponse>
    , now: DateTime<Utc>
    ) -> ResultRecord
    {   let (model, text) = match response
        {   Some(r) => (
              r.metadata.model.clone()
            , r.first_content().unwrap_or_default().to_string()
            )
          , None => (String::new(), String::new())
        };
        ResultRecord
        {   timestamp: now.with_timezone(&self.offset).naive_local()
          , model
          , temperature: self.temperature
          , prompt: prompt.text.clone()
          , response: text
        }
    }

    pub fn degraded(&self, prompt: &Prompt) -> ResultRecord
    {   self.format(prompt, None)
    }
}
