use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, trace};

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::request::{ChatRequest, QueryResponse};

/// HTTP client for a model gateway exposing
/// `POST {api_base}/gateway/{route}/invocations`
#[derive(Debug, Clone)]
pub struct GatewayClient
{   api_base: String
  , api_key: Option<String>
  , http_client: reqwest::Client
}

impl GatewayClient
{   pub fn new(
      api_base: impl Into<String>
    , api_key: Option<String>
    , timeout: Duration
    ) -> Result<Self>
    {   let http_client = reqwest::Client::builder()
          .timeout(timeout)
          .build()
          .map_err(|e| {
            error!("Failed to build HTTP client: {}", e);
            Error::InvalidConfiguration(e.to_string())
          })?;
        Ok(GatewayClient::with_http_client(api_base, api_key, http_client))
    }

    /// Use a caller-built reqwest client (proxy, TLS, timeout settings)
    pub fn with_http_client(
      api_base: impl Into<String>
    , api_key: Option<String>
    , http_client: reqwest::Client
    ) -> Self
    {   debug!("Creating GatewayClient");
        let api_base: String = api_base.into();
        GatewayClient
        {   api_base: api_base.trim_end_matches('/').to_string()
          , api_key
          , http_client
        }
    }

    /// Build from config, reading the API key from the named env var
    pub fn from_config(config: &GatewayConfig) -> Result<Self>
    {   let api_key = match &config.api_key_env
        {   Some(var) => {
              let key = std::env::var(var)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                  error!("No API key in {}", var);
                  Error::MissingApiKey(var.clone())
                })?;
              Some(key)
            }
          , None => None
        };
        GatewayClient::new(
          config.api_base.clone()
        , api_key
        , Duration::from_secs(config.timeout_secs)
        )
    }

    pub fn invocations_url(&self, route: &str) -> String
    {   format!("{}/gateway/{}/invocations", self.api_base, route)
    }
}

#[async_trait]
impl super::RemoteQueryClient for GatewayClient
{   async fn call(
      &self
    , route: &str
    , body: &ChatRequest
    ) -> Result<QueryResponse>
    {   let url = self.invocations_url(route);
        debug!("Querying route {}", route);
        trace!("Gateway request: {:?}", body);

        let mut request = self.http_client
          .post(&url)
          .header("Content-Type", "application/json")
          .json(body);
        if let Some(key) = &self.api_key
        {   request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
          error!("HTTP error for {}: {}", route, e);
          Error::from(e)
        })?;

        let status = response.status();
        trace!("Gateway response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Gateway error {}: {}", status, error_text);
            return Err(status_error(status.as_u16(), error_text));
        }

        let raw = response.text().await.map_err(Error::from)?;
        parse_response(&raw)
    }
}

/// Map a non-success status to an error the retry policy understands
fn status_error(status: u16, message: String) -> Error
{   match status
    {   429 => Error::RateLimitExceeded
      , 408 | 504 => Error::Timeout
      , _ => Error::ApiError { status, message }
    }
}

/// Responses without a candidate are malformed
fn parse_response(raw: &str) -> Result<QueryResponse>
{   let parsed: QueryResponse = serde_json::from_str(raw)
      .map_err(|e| {
        error!("Parse error: {}", e);
        Error::ParseError(e.to_string())
      })?;
    if parsed.candidates.is_empty()
    {   error!("No candidates in response");
        return Err(Error::NoCandidatesInResponse);
    }
    Ok(parsed)
}
