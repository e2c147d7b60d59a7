pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod format;
pub mod retry;
pub mod client;
pub mod table;

/*

batchllm sends a whole table of prompts through a model gateway and
hands back one structured record per prompt, in the same order.
Calls run concurrently under a cap; transient failures back off and
retry; anything that still fails comes back as an empty placeholder
record instead of sinking the batch.

batchllm/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports and layout
│   ├── error.rs        # Error type and transient/fatal classes
│   ├── config.rs       # Batch and gateway configuration
│   ├── request.rs      # Prompt, gateway request/response, records
│   ├── providers/      # RemoteQueryClient and the HTTP gateway
│   ├── format.rs       # Response -> ResultRecord
│   ├── retry.rs        # RetryPolicy and RetryingQueryTask
│   ├── client.rs       # BatchDispatcher
│   ├── table.rs        # JSON-lines input and output
│   └── bin/batchllm.rs # CLI
└── tests/

*/

// ===== BATCHLLM API INTERFACE =====

pub use client::BatchDispatcher;
pub use config::{BatchConfig, GatewayConfig};
pub use error::{Error, ErrorClass, Result};
pub use format::ResponseFormatter;
pub use providers::{GatewayClient, RemoteQueryClient};
pub use request::{
  ChatMessage
, ChatRequest
, Prompt
, QueryRequest
, QueryResponse
, ResultRecord
};
pub use retry::{RetryPolicy, RetryingQueryTask};
