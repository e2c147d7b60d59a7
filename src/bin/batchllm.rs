use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;

use batchllm::{table, BatchConfig, BatchDispatcher, GatewayClient};

/// Send every row of a JSON-lines file through a model gateway route
/// and write one JSON record per row, in input order.
#[derive(Debug, Parser)]
#[command(name = "batchllm", version)]
struct Args
{   /// JSON config file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>
  , /// JSON-lines input, one prompt per line
    #[arg(long)]
    input: PathBuf
  , /// Field holding the prompt when rows are objects
    #[arg(long, default_value = "text")]
    column: String
  , /// Only use the first N rows
    #[arg(long)]
    limit: Option<usize>
  , /// Output file; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>
  , #[arg(long)]
    route: Option<String>
  , #[arg(long)]
    temperature: Option<f32>
  , #[arg(long)]
    max_attempts: Option<u32>
  , #[arg(long)]
    base_delay_secs: Option<u64>
  , #[arg(long)]
    concurrency: Option<usize>
}

impl Args
{   fn batch_config(&self) -> anyhow::Result<BatchConfig>
    {   let mut config = match &self.config
        {   Some(path) => BatchConfig::from_json_file(path)
              .with_context(|| format!("loading {}", path.display()))?
          , None => {
              let mut config = BatchConfig::default();
              config.apply_env();
              config
            }
        };
        if let Some(route) = &self.route
        {   config.route = route.clone();
        }
        if let Some(temperature) = self.temperature
        {   config.temperature = temperature;
        }
        if let Some(max_attempts) = self.max_attempts
        {   config.max_attempts = max_attempts;
        }
        if let Some(base_delay_secs) = self.base_delay_secs
        {   config.base_delay_secs = base_delay_secs;
        }
        if let Some(concurrency) = self.concurrency
        {   config.concurrency_limit = concurrency;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()>
{   env_logger::init();
    let args = Args::parse();
    let config = args.batch_config()?;

    let input = File::open(&args.input)
      .with_context(|| format!("opening {}", args.input.display()))?;
    let prompts = table::read_prompts(
      BufReader::new(input)
    , &args.column
    , args.limit
    )?;

    let client = GatewayClient::from_config(&config.gateway)?;
    let dispatcher = BatchDispatcher::from_config(Arc::new(client), &config)?;
    let records = dispatcher.run_batch(prompts).await;

    match &args.output
    {   Some(path) => {
          let file = File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
          table::write_records(BufWriter::new(file), &records)?;
          info!("Wrote {} records to {}", records.len(), path.display());
        }
      , None => {
          table::write_records(io::stdout().lock(), &records)?;
        }
    }
    Ok(())
}
