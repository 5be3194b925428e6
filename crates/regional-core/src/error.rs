//! Error types for `regional-core`.

use thiserror::Error;

use crate::regional::MAX_NAME_LEN;

#[derive(Debug, Error)]
pub enum Error {
  /// Inactivation targeted a row that is missing or already inactive.
  #[error("regional row {0} is not active")]
  NotActive(i64),

  #[error("name for external id {0} exceeds {max} characters", max = MAX_NAME_LEN)]
  NameTooLong(i64),

  /// A failure raised by the storage backend behind a transaction handle.
  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
