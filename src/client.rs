use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::mpsc;

use crate::config::BatchConfig;
use crate::error::{Error, Result};
use crate::providers::RemoteQueryClient;
use crate::request::{Prompt, ResultRecord};
use crate::retry::RetryingQueryTask;

/// Reply sent by every spawned prompt task
type PromptReply = (usize, ResultRecord);

/// Fans prompts out to concurrent retrying tasks and collects one record
/// per prompt, in input order
pub struct BatchDispatcher
{   task: Arc<RetryingQueryTask>
}

impl BatchDispatcher
{   pub fn new(task: RetryingQueryTask) -> Self
    {   BatchDispatcher
        {   task: Arc::new(task)
        }
    }

    pub fn from_config(
      client: Arc<dyn RemoteQueryClient>
    , config: &BatchConfig
    ) -> Result<Self>
    {   debug!(
          "Creating BatchDispatcher for route {} (limit {})"
        , config.route, config.concurrency_limit
        );
        Ok(BatchDispatcher::new(
          RetryingQueryTask::from_config(client, config)?
        ))
    }

    /// Run every text to completion. `output[i]` always belongs to
    /// `texts[i]`; failures come back as degraded records.
    pub async fn run_batch<I, S>(&self, texts: I) -> Vec<ResultRecord>
    where
      I: IntoIterator<Item = S>
    , S: Into<String>
    {   let prompts = Prompt::sequence(texts);
        let total = prompts.len();
        info!("Dispatching batch of {} prompts", total);

        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel::<PromptReply>();
        let mut handles = Vec::with_capacity(total);

        for prompt in prompts.iter().cloned()
        {   let task = Arc::clone(&self.task);
            let reply = reply_tx.clone();
            handles.push(tokio::spawn(async move {
              let record = task.run(&prompt).await;
              let _ = reply.send((prompt.index, record));
            }));
        }
        drop(reply_tx);

        let mut slots: Vec<Option<ResultRecord>>
          = (0..total).map(|_| None).collect();
        while let Some((index, record)) = reply_rx.recv().await
        {   if let Some(slot) = slots.get_mut(index)
            {   *slot = Some(record);
            }
        }

        for (index, handle) in handles.into_iter().enumerate()
        {   if let Err(e) = handle.await
            {   error!("Prompt {} task died: {}", index, e);
            }
        }

        let records: Vec<ResultRecord> = slots.into_iter()
          .zip(prompts.iter())
          .map(|(slot, prompt)| {
            slot.unwrap_or_else(|| self.task.formatter().degraded(prompt))
          })
          .collect();

        let degraded = records.iter().filter(|r| r.is_degraded()).count();
        info!(
          "Batch complete: {} succeeded, {} degraded"
        , total - degraded, degraded
        );
        records
    }

    /// Blocking variant for synchronous callers.
    /// Inside a tokio runtime this returns an error; use `run_batch`.
    pub fn run_batch_blocking<I, S>(
      &self
    , texts: I
    ) -> Result<Vec<ResultRecord>>
    where
      I: IntoIterator<Item = S>
    , S: Into<String>
    {   if tokio::runtime::Handle::try_current().is_ok()
        {   error!("run_batch_blocking called from inside a runtime");
            return Err(Error::Other(
              "run_batch_blocking cannot run inside a tokio runtime; \
               await run_batch instead".to_string()
            ));
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
          .enable_all()
          .build()?;
        Ok(runtime.block_on(self.run_batch(texts)))
    }
}
