//! Remote generation clients

use async_trait::async_trait;

use crate::request::{ChatRequest, QueryResponse};

pub mod gateway;

// Re-export for convenience
pub use gateway::GatewayClient;

/// A single honest attempt at querying a route.
///
/// Implementations never retry; callers decide from
/// `Error::class()` whether another attempt is worthwhile. Hung calls
/// must come back as `Error::Timeout`.
#[async_trait]
pub trait RemoteQueryClient: Send + Sync
{   async fn call(
      &self
    , route: &str
    , body: &ChatRequest
    ) -> crate::error::Result<QueryResponse>;
}
