//! Synchronization of the local regional table with its upstream source.
//!
//! - [`fetch`]: pulls one snapshot from the upstream HTTP service.
//! - [`reconcile`]: the single-flight [`Reconciler`] that fetches, plans and
//!   applies in one transaction.
//! - [`scheduler`]: the periodic ticker driving the reconciler.

pub mod fetch;
pub mod reconcile;
pub mod scheduler;

pub use fetch::{FetchOutcome, FetcherConfig, HttpFetcher, Upstream};
pub use reconcile::{Reconciler, reconcile_once};
pub use scheduler::{IntervalError, SyncScheduler};
