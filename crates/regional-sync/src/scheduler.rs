//! Periodic trigger for the [`Reconciler`].

use std::{sync::Arc, time::Duration};

use regional_core::store::RegionalStore;
use tokio::{
  task::JoinHandle,
  time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;

use crate::{fetch::Upstream, reconcile::Reconciler};

/// Default time between scheduled runs.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Longest accepted time between scheduled runs.
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A sync interval the scheduler cannot run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
  #[error("sync interval must be non-zero")]
  Zero,
  #[error("sync interval of {}s exceeds the maximum of {}s", .0.as_secs(), MAX_INTERVAL.as_secs())]
  TooLong(Duration),
}

/// Accept `interval` if it lies in `(0, MAX_INTERVAL]`.
pub fn check_interval(interval: Duration) -> Result<Duration, IntervalError> {
  if interval.is_zero() {
    Err(IntervalError::Zero)
  } else if interval > MAX_INTERVAL {
    Err(IntervalError::TooLong(interval))
  } else {
    Ok(interval)
  }
}

/// Calls [`Reconciler::tick`] on a fixed interval until cancelled.
///
/// The first tick fires one interval after start. A tick that comes due while
/// a run is still going is delayed, not bursted.
pub struct SyncScheduler<S, U> {
  reconciler: Arc<Reconciler<S, U>>,
  interval:   Duration,
}

impl<S, U> SyncScheduler<S, U>
where
  S: RegionalStore + 'static,
  U: Upstream + 'static,
{
  /// Fails if `interval` is zero or longer than [`MAX_INTERVAL`].
  pub fn new(
    reconciler: Arc<Reconciler<S, U>>,
    interval: Duration,
  ) -> Result<Self, IntervalError> {
    let interval = check_interval(interval)?;
    Ok(Self { reconciler, interval })
  }

  /// Run the ticker on its own task.
  pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(self.run(token))
  }

  /// Tick until `token` is cancelled. A run in progress when the token fires
  /// is allowed to finish.
  pub async fn run(self, token: CancellationToken) {
    let Some(first) = Instant::now().checked_add(self.interval) else {
      tracing::error!(
        interval_secs = self.interval.as_secs(),
        "sync interval out of range; scheduler idle until shutdown"
      );
      token.cancelled().await;
      return;
    };
    let mut ticker = interval_at(first, self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
      interval_secs = self.interval.as_secs(),
      "sync scheduler started"
    );

    loop {
      tokio::select! {
        _ = token.cancelled() => {
          tracing::info!("sync scheduler received shutdown signal");
          break;
        }
        _ = ticker.tick() => {
          self.reconciler.tick().await;
        }
      }
    }

    tracing::info!("sync scheduler stopped");
  }
}
