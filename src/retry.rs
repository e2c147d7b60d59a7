//! Per-prompt retry with exponential backoff

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::Semaphore;

use crate::config::BatchConfig;
use crate::error::{Error, ErrorClass, Result};
use crate::format::ResponseFormatter;
use crate::providers::RemoteQueryClient;
use crate::request::{Prompt, QueryRequest, QueryResponse, ResultRecord};

/// Retry policy for failed requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy
{   /// Attempts including the first; 0 behaves like 1
    pub max_attempts: u32
  , pub base_delay: Duration
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(
      max_attempts: u32
    , base_delay: Duration
    ) -> Self
    {   RetryPolicy
        {   max_attempts
          , base_delay
        }
    }

    pub fn attempts(&self) -> u32
    {   self.max_attempts.max(1)
    }

    /// Wait after failed attempt `attempt` (zero-based): base * 2^attempt
    pub fn backoff_for_attempt(
      &self
    , attempt: u32
    ) -> Duration
    {   self.base_delay
          .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(1, Duration::from_secs(5))
    }
}

/// Turns one prompt into exactly one record, degrading instead of failing
pub struct RetryingQueryTask
{   client: Arc<dyn RemoteQueryClient>
  , route: String
  , instructions: String
  , temperature: f32
  , policy: RetryPolicy
  , formatter: ResponseFormatter
  , gate: Arc<Semaphore>
}

impl RetryingQueryTask
{   pub fn new(
      client: Arc<dyn RemoteQueryClient>
    , route: impl Into<String>
    , instructions: impl Into<String>
    , policy: RetryPolicy
    , formatter: ResponseFormatter
    , gate: Arc<Semaphore>
    ) -> Self
    {   RetryingQueryTask
        {   client
          , route: route.into()
          , instructions: instructions.into()
          , temperature: formatter.temperature
          , policy
          , formatter
          , gate
        }
    }

    /// Gate sized by `concurrency_limit`
    pub fn from_config(
      client: Arc<dyn RemoteQueryClient>
    , config: &BatchConfig
    ) -> Result<Self>
    {   config.validate()?;
        let formatter = ResponseFormatter::new(
          config.temperature
        , config.utc_offset()?
        );
        Ok(RetryingQueryTask::new(
          client
        , config.route.clone()
        , config.instructions.clone()
        , RetryPolicy::new(config.max_attempts, config.base_delay())
        , formatter
        , Arc::new(Semaphore::new(config.concurrency_limit))
        ))
    }

    pub fn formatter(&self) -> &ResponseFormatter
    {   &self.formatter
    }

    pub fn request_for(&self, prompt: &Prompt) -> QueryRequest
    {   QueryRequest::new(
          &self.route
        , &self.instructions
        , &prompt.text
        , self.temperature
        )
    }

    pub async fn run(&self, prompt: &Prompt) -> ResultRecord
    {   let attempts = self.policy.attempts();
        let mut last_error = None;
        let mut made = 0;

        for attempt in 0..attempts
        {   made += 1;
            debug!(
              "Prompt {} attempt {}/{}"
            , prompt.index, attempt + 1, attempts
            );
            let request = self.request_for(prompt);
            match self.attempt(&request).await
            {   Ok(response) => {
                  return self.formatter.format(prompt, Some(&response));
                }
              , Err(e) if e.class() == ErrorClass::Fatal => {
                  last_error = Some(e);
                  break;
                }
              , Err(e) => {
                  if attempt + 1 < attempts
                  {   let delay = self.policy.backoff_for_attempt(attempt);
                      debug!(
                        "Prompt {} transient failure ({}), retrying in {:?}"
                      , prompt.index, e, delay
                      );
                      tokio::time::sleep(delay).await;
                  }
                  last_error = Some(e);
                }
            }
        }

        warn!(
          "Prompt {} degraded after {} attempt(s): {}"
        , prompt.index
        , made
        , last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string())
        );
        self.formatter.degraded(prompt)
    }

    /// One call, holding a gate permit only while it is in flight
    async fn attempt(
      &self
    , request: &QueryRequest
    ) -> Result<QueryResponse>
    {   let _permit = self.gate.acquire().await.map_err(|_| {
          Error::Other("concurrency gate closed".to_string())
        })?;
        self.client.call(&request.route, &request.body).await
    }
}
