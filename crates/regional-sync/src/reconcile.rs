//! The reconciler: fetch → plan → apply, at most one at a time.
//!
//! Each run executes on its own task, so a caller that goes away (an HTTP
//! client disconnecting, say) never cancels a transaction halfway. Callers
//! only wait for the published outcome.

use std::{
  sync::{Arc, Mutex, MutexGuard, PoisonError},
  time::Duration,
};

use regional_core::{
  apply::apply,
  plan::plan,
  regional::dedupe_snapshot,
  store::RegionalStore,
  summary::{SyncFailure, SyncOutcome, SyncSummary},
};
use tokio::sync::watch;

use crate::fetch::{FetchOutcome, Upstream};

/// Default time an on-demand caller waits for a run it joined.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(60);

/// Receiver for the outcome of the run currently in flight. `None` until the
/// run publishes.
type InFlight = watch::Receiver<Option<SyncOutcome>>;

type SlotCell = Arc<Mutex<Option<InFlight>>>;

// ─── One run ─────────────────────────────────────────────────────────────────

/// Fetch one snapshot and, if it is usable, make the local table match it in
/// a single transaction.
///
/// An empty or failed fetch is a safety stop: nothing is read or written.
pub async fn reconcile_once<S, U>(store: &S, upstream: &U) -> SyncOutcome
where
  S: RegionalStore,
  U: Upstream,
{
  tracing::info!("starting synchronization");
  let snapshot = match upstream.fetch().await {
    FetchOutcome::Ok(rows) if rows.is_empty() => {
      return Err(SyncFailure::EmptySnapshot);
    }
    FetchOutcome::Ok(rows) => dedupe_snapshot(rows),
    FetchOutcome::Empty => return Err(SyncFailure::EmptySnapshot),
    FetchOutcome::TransportFailure(reason) => {
      return Err(SyncFailure::Transport(reason));
    }
    FetchOutcome::DecodeFailure(reason) => {
      return Err(SyncFailure::Decode(reason));
    }
  };

  store
    .run_in_transaction(move |tx| {
      let active = tx.list_active()?;
      let plan = plan(&snapshot, &active);
      tracing::debug!(
        snapshot = snapshot.len(),
        active = active.len(),
        actions = plan.len(),
        "planned reconciliation"
      );
      apply(tx, &plan)
    })
    .await
    .map_err(|e| SyncFailure::Apply(e.to_string()))
}

// ─── Single-flight ───────────────────────────────────────────────────────────

/// Whether a caller started the run it is waiting on or joined one already in
/// flight.
enum Claim {
  Led(InFlight),
  Joined(InFlight),
}

/// Clears the in-flight slot when the run ends, including by panic.
struct SlotGuard {
  slot: SlotCell,
}

impl Drop for SlotGuard {
  fn drop(&mut self) { *lock(&self.slot) = None; }
}

fn lock(slot: &Mutex<Option<InFlight>>) -> MutexGuard<'_, Option<InFlight>> {
  // The slot holds no invariant a panicking holder could break.
  slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs reconciliations against one store and one upstream, never more than
/// one at a time.
pub struct Reconciler<S, U> {
  store:     Arc<S>,
  upstream:  Arc<U>,
  lock_wait: Duration,
  slot:      SlotCell,
}

impl<S, U> Reconciler<S, U>
where
  S: RegionalStore + 'static,
  U: Upstream + 'static,
{
  pub fn new(store: Arc<S>, upstream: Arc<U>, lock_wait: Duration) -> Self {
    Self {
      store,
      upstream,
      lock_wait,
      slot: Arc::new(Mutex::new(None)),
    }
  }

  /// Whether a reconciliation is running right now.
  pub fn is_running(&self) -> bool { lock(&self.slot).is_some() }

  /// On-demand trigger.
  ///
  /// Starts a run, or joins the one in flight and waits up to the lock-wait
  /// timeout for its outcome. Always returns a summary.
  pub async fn trigger(&self) -> SyncSummary {
    SyncSummary::from(&self.run_on_demand().await)
  }

  /// [`trigger`](Self::trigger), before the outcome is rendered.
  pub async fn run_on_demand(&self) -> SyncOutcome {
    let outcome = match self.claim() {
      Claim::Led(rx) => wait(rx).await,
      Claim::Joined(rx) => {
        tracing::info!("synchronization already running; joining it");
        tokio::time::timeout(self.lock_wait, wait(rx))
          .await
          .unwrap_or(Err(SyncFailure::Busy))
      }
    };
    log_outcome("on-demand", &outcome);
    outcome
  }

  /// Periodic trigger. Returns `None` without doing anything if a run is
  /// already in flight.
  pub async fn tick(&self) -> Option<SyncOutcome> {
    let rx = match self.claim() {
      Claim::Led(rx) => rx,
      Claim::Joined(_) => {
        tracing::info!(
          "skipping scheduled synchronization; another one is still running"
        );
        return None;
      }
    };
    let outcome = wait(rx).await;
    log_outcome("scheduled", &outcome);
    Some(outcome)
  }

  /// Take the slot and spawn a run, or hand back the receiver of the run
  /// already holding it.
  fn claim(&self) -> Claim {
    let mut slot = lock(&self.slot);
    if let Some(rx) = slot.as_ref() {
      return Claim::Joined(rx.clone());
    }

    let (tx, rx) = watch::channel(None);
    *slot = Some(rx.clone());
    drop(slot);

    let guard = SlotGuard { slot: Arc::clone(&self.slot) };
    let store = Arc::clone(&self.store);
    let upstream = Arc::clone(&self.upstream);
    tokio::spawn(async move {
      let outcome = reconcile_once(&*store, &*upstream).await;
      // Free the slot before publishing so a caller woken by the outcome can
      // start the next run straight away.
      drop(guard);
      tx.send_replace(Some(outcome));
    });

    Claim::Led(rx)
  }
}

/// Wait for the run behind `rx` to publish.
async fn wait(mut rx: InFlight) -> SyncOutcome {
  match rx.wait_for(|outcome| outcome.is_some()).await {
    Ok(published) => (*published)
      .clone()
      .unwrap_or_else(|| Err(SyncFailure::Apply("no outcome published".into()))),
    Err(_) => Err(SyncFailure::Apply("synchronization task aborted".into())),
  }
}

fn log_outcome(trigger: &str, outcome: &SyncOutcome) {
  match outcome {
    Ok(counts) => tracing::info!(
      trigger,
      inserted = counts.inserted,
      inactivated = counts.inactivated,
      updated = counts.updated,
      "synchronization completed"
    ),
    Err(failure) => tracing::warn!(trigger, %failure, "synchronization failed"),
  }
}
