//! Outcome types of a reconciliation.
//!
//! Failures are data: every way a reconciliation can end, successful or not,
//! is reported to callers as a [`SyncSummary`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Counters tallied by the applier for one committed plan.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct ApplyCounts {
  pub inserted:    u32,
  pub inactivated: u32,
  /// Renames; each one inactivated a row and inserted its replacement.
  pub updated:     u32,
}

impl ApplyCounts {
  pub fn is_noop(&self) -> bool { *self == Self::default() }
}

/// Why a reconciliation made no changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncFailure {
  /// Network error, non-2xx status, or size limit exceeded.
  #[error("upstream transport failure: {0}")]
  Transport(String),

  /// Payload not parseable, or a row missing a required field.
  #[error("upstream decode failure: {0}")]
  Decode(String),

  #[error("upstream returned an empty snapshot; nothing was applied")]
  EmptySnapshot,

  #[error("busy: another synchronization did not finish in time")]
  Busy,

  #[error("apply failure, transaction rolled back: {0}")]
  Apply(String),
}

/// The result of one reconciliation, before it is rendered for callers.
pub type SyncOutcome = Result<ApplyCounts, SyncFailure>;

/// What a caller of the sync endpoint receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
  pub inserted:    u32,
  pub inactivated: u32,
  pub updated:     u32,
  pub message:     String,
}

impl SyncSummary {
  pub fn completed(counts: ApplyCounts) -> Self {
    Self {
      inserted:    counts.inserted,
      inactivated: counts.inactivated,
      updated:     counts.updated,
      message:     "synchronization completed".to_owned(),
    }
  }

  /// A summary with zeroed counters describing `failure`.
  pub fn failed(failure: &SyncFailure) -> Self {
    Self {
      inserted:    0,
      inactivated: 0,
      updated:     0,
      message:     failure.to_string(),
    }
  }
}

impl From<&SyncOutcome> for SyncSummary {
  fn from(outcome: &SyncOutcome) -> Self {
    match outcome {
      Ok(counts) => Self::completed(*counts),
      Err(failure) => Self::failed(failure),
    }
  }
}
