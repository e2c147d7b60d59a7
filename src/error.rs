use thiserror::Error as ThisError;

/// Custom error type for batchllm operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error
{   /// API key environment variable is missing or empty
    #[error("Missing API key: {0}")]
    MissingApiKey(String)
  , /// Connection-level HTTP failure (DNS, refused, reset)
    #[error("HTTP error: {0}")]
    HttpError(String)
  , /// Gateway returned a non-success status
    #[error("API error ({status}): {message}")]
    ApiError
    {   status: u16
      , message: String
    }
  , /// Failed to parse gateway response
    #[error("Parse error: {0}")]
    ParseError(String)
  , /// Gateway response carried no candidates
    #[error("API response contained no candidates")]
    NoCandidatesInResponse
  , /// Rate limit exceeded
    #[error("API rate limit exceeded")]
    RateLimitExceeded
  , /// Request timed out
    #[error("Request timed out")]
    Timeout
  , /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String)
  , /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    Io(String)
  , /// Generic error
    #[error("Error: {0}")]
    Other(String)
}

/// Whether a failed attempt is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass
{   /// Retry with backoff while attempts remain
    Transient
  , /// Give up on the prompt immediately
    Fatal
}

impl Error
{   /// Classify this error for the retry policy
    pub fn class(&self) -> ErrorClass
    {   match self
        {   Error::RateLimitExceeded
          | Error::Timeout
          | Error::HttpError(_) => ErrorClass::Transient
          , Error::ApiError { status, .. }
              if is_transient_status(*status) => {
                ErrorClass::Transient
              }
          , _ => ErrorClass::Fatal
        }
    }

    pub fn is_transient(&self) -> bool
    {   self.class() == ErrorClass::Transient
    }
}

/// 408, 429 and every 5xx are worth retrying
pub fn is_transient_status(status: u16) -> bool
{   status == 408 || status == 429 || (500..600).contains(&status)
}

impl From<std::io::Error> for Error
{   fn from(e: std::io::Error) -> Self
    {   Error::Io(e.to_string())
    }
}

impl From<reqwest::Error> for Error
{   fn from(e: reqwest::Error) -> Self
    {   if e.is_timeout()
        {   Error::Timeout
        } else if e.is_decode()
        {   Error::ParseError(e.to_string())
        } else if let Some(status) = e.status()
        {   Error::ApiError
            {   status: status.as_u16()
              , message: e.to_string()
            }
        } else
        {   Error::HttpError(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
