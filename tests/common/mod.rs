#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use batchllm::{ChatRequest, Error, QueryResponse, RemoteQueryClient};

/// How the scripted client answers a given prompt
#[derive(Debug, Clone)]
pub enum Behavior
{   Succeed
    {   model: String
      , response: String
    }
  , /// Echo the prompt back as the response
    Echo
  , TransientForever
  , FatalForever
  , /// Rate-limited for the first n calls, then succeeds
    TransientThenSucceed(usize)
  , Panic
}

#[derive(Debug, Clone)]
pub struct CallLog
{   pub route: String
  , pub prompt: String
  , pub body: ChatRequest
  , pub at: Instant
}

pub struct ScriptedClient
{   script: HashMap<String, Behavior>
  , fallback: Behavior
  , delays: HashMap<String, Duration>
  , latency: Duration
  , calls: Mutex<Vec<CallLog>>
  , in_flight: AtomicUsize
  , max_in_flight: AtomicUsize
}

impl ScriptedClient
{   pub fn new(fallback: Behavior) -> Self
    {   ScriptedClient
        {   script: HashMap::new()
          , fallback
          , delays: HashMap::new()
          , latency: Duration::ZERO
          , calls: Mutex::new(Vec::new())
          , in_flight: AtomicUsize::new(0)
          , max_in_flight: AtomicUsize::new(0)
        }
    }

    pub fn on(mut self, prompt: &str, behavior: Behavior) -> Self
    {   self.script.insert(prompt.to_string(), behavior);
        self
    }

    pub fn delay(mut self, prompt: &str, delay: Duration) -> Self
    {   self.delays.insert(prompt.to_string(), delay);
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self
    {   self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<CallLog>
    {   self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, prompt: &str) -> Vec<CallLog>
    {   self.calls().into_iter().filter(|c| c.prompt == prompt).collect()
    }

    pub fn max_in_flight(&self) -> usize
    {   self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub fn succeed(model: &str, response: &str) -> Behavior
{   Behavior::Succeed
    {   model: model.to_string()
      , response: response.to_string()
    }
}

#[async_trait]
impl RemoteQueryClient for ScriptedClient
{   async fn call(
      &self
    , route: &str
    , body: &ChatRequest
    ) -> batchllm::Result<QueryResponse>
    {   let prompt = body.user_text().unwrap_or_default().to_string();

        let previous = {
          let mut calls = self.calls.lock().unwrap();
          let previous = calls.iter().filter(|c| c.prompt == prompt).count();
          calls.push(CallLog
          {   route: route.to_string()
            , prompt: prompt.clone()
            , body: body.clone()
            , at: Instant::now()
          });
          previous
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = self.delays.get(&prompt).copied().unwrap_or(self.latency);
        if !delay.is_zero()
        {   tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let behavior = self.script.get(&prompt)
          .cloned()
          .unwrap_or_else(|| self.fallback.clone());
        match behavior
        {   Behavior::Succeed { model, response } => {
              Ok(QueryResponse::new(model, response))
            }
          , Behavior::Echo => Ok(QueryResponse::new("echo", prompt))
          , Behavior::TransientForever => Err(Error::RateLimitExceeded)
          , Behavior::FatalForever => Err(Error::ApiError
            {   status: 401
              , message: "invalid token".to_string()
            })
          , Behavior::TransientThenSucceed(n) if previous < n => {
              Err(Error::Timeout)
            }
          , Behavior::TransientThenSucceed(_) => {
              Ok(QueryResponse::new("late", "recovered"))
            }
          , Behavior::Panic => panic!("scripted client blew up")
        }
    }
}
