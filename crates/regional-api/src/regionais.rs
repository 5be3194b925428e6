//! Handlers for `/regionais` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/regionais` | Active rows, by `external_id` |
//! | `GET`  | `/regionais/all` | Every row, by `id` |
//! | `GET`  | `/regionais/external/:external_id` | 404 if no active row |
//! | `POST` | `/regionais/sync` | Always `200` with a summary |

use axum::{
  Json,
  extract::{Path, State},
};
use regional_core::{
  regional::RegionalRecord,
  store::RegionalStore,
  summary::SyncSummary,
};
use regional_sync::Upstream;

use crate::{ApiState, error::ApiError};

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /regionais`
pub async fn list_active<S, U>(
  State(state): State<ApiState<S, U>>,
) -> Result<Json<Vec<RegionalRecord>>, ApiError>
where
  S: RegionalStore,
{
  let records = state.store.list_active().await.map_err(ApiError::store)?;
  Ok(Json(records))
}

/// `GET /regionais/all`
pub async fn list_all<S, U>(
  State(state): State<ApiState<S, U>>,
) -> Result<Json<Vec<RegionalRecord>>, ApiError>
where
  S: RegionalStore,
{
  let records = state.store.list_all().await.map_err(ApiError::store)?;
  Ok(Json(records))
}

/// `GET /regionais/external/:external_id`
pub async fn find_active<S, U>(
  State(state): State<ApiState<S, U>>,
  Path(external_id): Path<i64>,
) -> Result<Json<RegionalRecord>, ApiError>
where
  S: RegionalStore,
{
  state
    .store
    .find_active(external_id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| {
      ApiError::NotFound(format!("no active regional with external id {external_id}"))
    })
}

// ─── Sync ─────────────────────────────────────────────────────────────────────

/// `POST /regionais/sync`
///
/// Failures are reported in the summary's `message`, not as an error status.
pub async fn sync<S, U>(State(state): State<ApiState<S, U>>) -> Json<SyncSummary>
where
  S: RegionalStore + 'static,
  U: Upstream + 'static,
{
  tracing::info!("manual synchronization requested");
  Json(state.reconciler.trigger().await)
}
