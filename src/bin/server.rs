//! tokenprobe server binary

use std::path::Path;
use std::sync::Arc;
use log::{info, warn};
use tokenprobe::config::{self, CredentialStore, ServerConfig};
use tokenprobe::providers::OpenAiClient;
use tokenprobe::{create_router, AppState, CompletionForwarder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>>
{   env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();

    info!("Starting tokenprobe v{}", env!("CARGO_PKG_VERSION"));

    // Optional JSON config file as first argument
    let config = match std::env::args().nth(1)
    {   Some(path) => ServerConfig::from_file(Path::new(&path))?
      , None => ServerConfig::default()
    }.apply_env();

    let credentials = CredentialStore::from_env();
    let passkey = config::secret_from_env(config::PASSKEY_VAR);
    if passkey.is_none()
    {   warn!(
          "{} not set; /verify-access will answer 500",
          config::PASSKEY_VAR
        );
    }

    let client = OpenAiClient::new(
      &config.upstream.api_base,
      config.upstream.timeout_secs
    )?;
    info!("Upstream: {}", client.api_base());

    let state = Arc::new(AppState
    {   forwarder: CompletionForwarder::new(client, credentials)
      , passkey
    });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
