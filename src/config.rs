//! Configuration for the gateway client and batch behavior

use std::path::Path;
use std::time::Duration;

use chrono::FixedOffset;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding `gateway.api_base`
pub const GATEWAY_URI_ENV: &str = "BATCHLLM_GATEWAY_URI";

pub const DEFAULT_ROUTE: &str = "chat-gpt-35-turbo-16k";

pub const DEFAULT_INSTRUCTIONS: &str = "Your role is a clinical scribe whose \
job it is to extract clinical information from a patient note so a clinician \
can appropriately and comprehensively asses the patient's health. For the \
clinical note provided, produce a structured table only consisting of only \
all symptoms and diagnoses mentioned. In this table, in column 1, list the \
section of the note the symptom or diagnosis is listed in; in column 2 list \
each symptom or diagnosis within each section of the provided clinical note; \
in column 3 list the corresponding CUI for each symptom or diagnosis; in \
column 4 list the status of the symptom or diagnosis as being current or past \
or future if the clinician writes they think it may develop in the future; in \
column 5 list the clinician's interpretation of whether the diagnosis is \
ruled-out, likely, unlikely, is a confirmed-diagnosis, was \
previously-diagnosed, or is a side effect of a procedure or medication; in \
column 6 list the procedure or medication it may be a side effect of; in \
column 7 list the person associated with the symptom or diagnosis. Exclude \
mention of clinical labs, surgical interventions and procedures, \
medications, and physical exam test results in column 2 of this table and \
only include symptoms and diagnoses.";

/// Gateway connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig
{   /// Gateway base URL
    pub api_base: String
  , /// Name of the environment variable holding the bearer token.
    /// No auth header is sent when unset.
    pub api_key_env: Option<String>
  , /// Per-request timeout in seconds
    pub timeout_secs: u64
}

impl Default for GatewayConfig
{   fn default() -> Self
    {   GatewayConfig
        {   api_base: "http://localhost:5000".to_string()
          , api_key_env: None
          , timeout_secs: 120
        }
    }
}

/// Batch configuration
///
/// `max_attempts` defaults to 1, which means a transient failure degrades
/// the prompt straight away. Raise it to enable backoff retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig
{   /// Gateway route (model/endpoint identifier)
    pub route: String
  , /// Sampling temperature sent with every request
    pub temperature: f32
  , /// Attempts per prompt, including the first
    pub max_attempts: u32
  , /// Backoff base; attempt n waits base * 2^n
    pub base_delay_secs: u64
  , /// Max client calls in flight at once
    pub concurrency_limit: usize
  , /// System instructions sent ahead of every prompt
    pub instructions: String
  , /// Offset of the civil time zone used for record timestamps
    pub utc_offset_hours: i32
  , pub gateway: GatewayConfig
}

impl Default for BatchConfig
{   fn default() -> Self
    {   BatchConfig
        {   route: DEFAULT_ROUTE.to_string()
          , temperature: 0.0
          , max_attempts: 1
          , base_delay_secs: 5
          , concurrency_limit: 10
          , instructions: DEFAULT_INSTRUCTIONS.to_string()
          , utc_offset_hours: -5
          , gateway: GatewayConfig::default()
        }
    }
}

impl BatchConfig
{   /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self>
    {   let path = path.as_ref();
        debug!("Loading batch config from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        let mut config: BatchConfig = serde_json::from_str(&raw)
          .map_err(|e| {
            Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self)
    {   if let Ok(uri) = std::env::var(GATEWAY_URI_ENV)
        {   if !uri.trim().is_empty()
            {   debug!("Gateway URI overridden from {}", GATEWAY_URI_ENV);
                self.gateway.api_base = uri;
            }
        }
    }

    pub fn validate(&self) -> Result<()>
    {   if self.route.trim().is_empty()
        {   return Err(Error::InvalidConfiguration(
              "route must not be empty".to_string()
            ));
        }
        if self.concurrency_limit == 0
        {   return Err(Error::InvalidConfiguration(
              "concurrency_limit must be at least 1".to_string()
            ));
        }
        if !self.temperature.is_finite()
        {   return Err(Error::InvalidConfiguration(
              "temperature must be a finite number".to_string()
            ));
        }
        self.utc_offset()?;
        Ok(())
    }

    pub fn base_delay(&self) -> Duration
    {   Duration::from_secs(self.base_delay_secs)
    }

    /// Fixed civil-time offset, no daylight adjustment
    pub fn utc_offset(&self) -> Result<FixedOffset>
    {   Some(self.utc_offset_hours)
          .filter(|h| (-23..=23).contains(h))
          .and_then(|h| h.checked_mul(3600))
          .and_then(FixedOffset::east_opt)
          .ok_or_else(|| {
            Error::InvalidConfiguration(
              format!("utc_offset_hours out of range: {}",
                self.utc_offset_hours)
            )
          })
    }
}
