pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod normalize;
pub mod access;
pub mod client;
pub mod api;

/*

tokenprobe: a small relay between the probability page and the
OpenAI chat completions API. Each POST /completion is forwarded once
(no retry) with logprobs enabled, and the per-token log-probabilities
come back as plain probabilities with their top alternatives.

tokenprobe/
├── src/
│   ├── lib.rs          # Re-exports
│   ├── error.rs        # Error type and HTTP mapping
│   ├── config.rs       # Server config and credential store
│   ├── request.rs      # Request/result value types
│   ├── normalize.rs    # logprob -> probability transform
│   ├── access.rs       # Passkey check
│   ├── client.rs       # Completion forwarder
│   ├── api.rs          # axum routes
│   ├── providers/      # Upstream wire clients
│   └── bin/server.rs   # Entry point
└── tests/              # End-to-end tests against a fake upstream

*/

pub use api::{create_router, AppState};
pub use client::CompletionForwarder;
pub use config::{CredentialStore, ServerConfig, UpstreamConfig};
pub use error::{Error, FieldError};
pub use request::{
  Alternative, CompletionRequest, CompletionResult, TokenProbability, Usage,
};
