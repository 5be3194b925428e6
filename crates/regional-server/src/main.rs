//! regional-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, keeps it in sync with the upstream on a fixed interval, and
//! serves the JSON API over HTTP.
//!
//! # One-shot mode
//!
//! To run a single synchronization and print its summary:
//!
//! ```
//! cargo run -p regional-server -- --sync-once
//! ```

mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use regional_api::ApiState;
use regional_core::summary::SyncSummary;
use regional_store_sqlite::SqliteStore;
use regional_sync::{HttpFetcher, Reconciler, SyncScheduler};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Regional synchronization server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run one synchronization, print its summary as JSON, and exit.
  #[arg(long)]
  sync_once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  let fetcher = HttpFetcher::new(cfg.fetcher_config())
    .context("failed to build HTTP client")?;
  tracing::info!(upstream = fetcher.url(), "using upstream");

  let reconciler = Arc::new(Reconciler::new(
    Arc::clone(&store),
    Arc::new(fetcher),
    cfg.lock_wait(),
  ));

  // Helper mode: synchronize once and exit.
  if cli.sync_once {
    let outcome = reconciler.run_on_demand().await;
    println!("{}", serde_json::to_string_pretty(&SyncSummary::from(&outcome))?);
    outcome.context("synchronization failed")?;
    return Ok(());
  }

  let token = CancellationToken::new();
  let scheduler = SyncScheduler::new(Arc::clone(&reconciler), cfg.sync_interval())
    .context("invalid sync interval")?
    .spawn(token.clone());

  let app = regional_api::router(ApiState {
    store,
    reconciler,
    service: env!("CARGO_PKG_NAME"),
  })
    .layer(TraceLayer::new_for_http());
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal(token.clone()))
    .await
    .context("server error")?;

  // Stop ticking; a run already in flight finishes on its own task.
  token.cancel();
  scheduler.await.context("sync scheduler task failed")?;

  Ok(())
}

/// Resolve on Ctrl-C, or when `token` is cancelled elsewhere, and cancel
/// `token`.
async fn shutdown_signal(token: CancellationToken) {
  tokio::select! {
    result = tokio::signal::ctrl_c() => match result {
      Ok(()) => tracing::info!("shutdown signal received"),
      Err(e) => {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        token.cancelled().await;
      }
    },
    _ = token.cancelled() => {}
  }
  token.cancel();
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
