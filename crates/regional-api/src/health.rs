//! Liveness and readiness checks under `/health`.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use regional_core::store::RegionalStore;
use serde_json::{Value, json};

use crate::ApiState;

/// `GET /health`: `timestamp` is Unix milliseconds.
pub async fn health<S, U>(State(state): State<ApiState<S, U>>) -> Json<Value> {
  Json(json!({
    "status":    "UP",
    "service":   state.service,
    "timestamp": Utc::now().timestamp_millis(),
  }))
}

/// `GET /health/liveness`
pub async fn liveness() -> Json<Value> { Json(json!({ "status": "UP" })) }

/// `GET /health/readiness`: `503` when the store does not answer.
pub async fn readiness<S, U>(
  State(state): State<ApiState<S, U>>,
) -> (StatusCode, Json<Value>)
where
  S: RegionalStore,
{
  match state.store.ping().await {
    Ok(()) => (
      StatusCode::OK,
      Json(json!({ "status": "UP", "database": "UP" })),
    ),
    Err(e) => {
      tracing::error!(error = %e, "database readiness check failed");
      (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "DOWN", "database": "DOWN" })),
      )
    }
  }
}
