//! HTTP routes for the probability page

use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, State},
  routing::{get, post},
  Json, Router,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use crate::client::CompletionForwarder;
use crate::error::Error;
use crate::request::{CompletionRequest, CompletionResult};

/// Shared handler state
pub struct AppState
{   pub forwarder: CompletionForwarder
  , /// Secret for `/verify-access`; None means unconfigured
    pub passkey: Option<String>
}

#[derive(Debug, Deserialize)]
pub struct VerifyAccessRequest
{   /// Absent counts as a mismatch
    #[serde(default)]
    pub passkey: String
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyAccessResponse
{   pub success: bool
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse
{   pub status: String
  , pub version: String
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse
{   pub models: Vec<String>
}

pub fn create_router(state: Arc<AppState>) -> Router
{   Router::new()
      .route("/health", get(health_check))
      .route("/completion", post(completion))
      .route("/verify-access", post(verify_access))
      .route("/models", get(list_models))
      .layer(CorsLayer::permissive())
      .with_state(state)
}

fn body_or_400<T>(
  payload: Result<Json<T>, JsonRejection>
) -> Result<T, Error>
{   payload
      .map(|Json(body)| body)
      .map_err(|rejection| {
        warn!("Rejected request body: {}", rejection.body_text());
        Error::InvalidRequest(rejection.body_text())
      })
}

pub async fn health_check() -> Json<HealthResponse>
{   Json(HealthResponse
    {   status: "ok".to_string()
      , version: env!("CARGO_PKG_VERSION").to_string()
    })
}

pub async fn completion(
  State(state): State<Arc<AppState>>
, payload: Result<Json<CompletionRequest>, JsonRejection>
) -> Result<Json<CompletionResult>, Error>
{   let request = body_or_400(payload)?;
    debug!("POST /completion {:?}", request);
    let result = state.forwarder.complete(request).await?;
    Ok(Json(result))
}

pub async fn verify_access(
  State(state): State<Arc<AppState>>
, payload: Result<Json<VerifyAccessRequest>, JsonRejection>
) -> Result<Json<VerifyAccessResponse>, Error>
{   let request = body_or_400(payload)?;
    crate::access::verify_passkey(
      state.passkey.as_deref(),
      &request.passkey
    )?;
    Ok(Json(VerifyAccessResponse { success: true }))
}

pub async fn list_models(
  State(state): State<Arc<AppState>>
) -> Result<Json<ModelsResponse>, Error>
{   let models = state.forwarder.models().await?;
    Ok(Json(ModelsResponse { models }))
}
