//! JSON REST API for the regional mirror.
//!
//! Exposes an axum [`Router`] backed by any [`RegionalStore`] and the
//! [`Reconciler`] that keeps it in sync. Read endpoints only ever see
//! committed state; the sync endpoint always answers `200` with a
//! [`SyncSummary`](regional_core::summary::SyncSummary).
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = regional_api::router(state); // everything under /api/v1
//! ```

pub mod error;
pub mod health;
pub mod regionais;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use regional_core::store::RegionalStore;
use regional_sync::{Reconciler, Upstream};

pub use error::ApiError;

/// Prefix every route is mounted under by [`router`].
pub const API_PREFIX: &str = "/api/v1";

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S, U> {
  pub store:      Arc<S>,
  pub reconciler: Arc<Reconciler<S, U>>,
  /// Name reported by `GET /health`.
  pub service:    &'static str,
}

impl<S, U> Clone for ApiState<S, U> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      reconciler: Arc::clone(&self.reconciler),
      service:    self.service,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API routes, relative to wherever they are nested.
pub fn api_router<S, U>(state: ApiState<S, U>) -> Router<()>
where
  S: RegionalStore + 'static,
  U: Upstream + 'static,
{
  Router::new()
    // Regionais
    .route("/regionais", get(regionais::list_active::<S, U>))
    .route("/regionais/all", get(regionais::list_all::<S, U>))
    .route(
      "/regionais/external/{external_id}",
      get(regionais::find_active::<S, U>),
    )
    .route("/regionais/sync", post(regionais::sync::<S, U>))
    // Health
    .route("/health", get(health::health::<S, U>))
    .route("/health/liveness", get(health::liveness))
    .route("/health/readiness", get(health::readiness::<S, U>))
    .with_state(state)
}

/// [`api_router`] mounted under [`API_PREFIX`].
pub fn router<S, U>(state: ApiState<S, U>) -> Router<()>
where
  S: RegionalStore + 'static,
  U: Upstream + 'static,
{
  Router::new().nest(API_PREFIX, api_router(state))
}
