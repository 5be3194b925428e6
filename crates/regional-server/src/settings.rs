//! Runtime configuration.
//!
//! Layered from an optional TOML file, then `REGIONAL_*` environment
//! variables. Every field but `upstream_url` has a default.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context as _, ensure};
use regional_sync::{FetcherConfig, scheduler::check_interval};
use serde::Deserialize;

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                   String,
  #[serde(default = "default_port")]
  pub port:                   u16,
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  pub upstream_url:           String,
  #[serde(default = "default_upstream_timeout_secs")]
  pub upstream_timeout_secs:  u64,
  #[serde(default = "default_sync_interval_secs")]
  pub sync_interval_secs:     u64,
  #[serde(default = "default_lock_wait_timeout_secs")]
  pub lock_wait_timeout_secs: u64,
  #[serde(default = "default_max_response_bytes")]
  pub max_response_bytes:     usize,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("regionais.db") }
fn default_upstream_timeout_secs() -> u64 { 30 }
fn default_sync_interval_secs() -> u64 { 60 * 60 }
fn default_lock_wait_timeout_secs() -> u64 { 60 }
fn default_max_response_bytes() -> usize { 8 * 1024 * 1024 }

/// `REGIONAL_UPSTREAM_URL=…` and friends. `__` separates nested keys.
pub fn env_source() -> config::Environment {
  config::Environment::with_prefix("REGIONAL")
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

impl ServerConfig {
  /// Read `path` (if it exists), overlay the environment, and validate.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env_source())
      .build()
      .context("failed to read configuration")?;
    Self::from_settings(settings)
  }

  pub fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
    let cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.validate()?;
    Ok(cfg)
  }

  fn validate(&self) -> anyhow::Result<()> {
    ensure!(
      !self.upstream_url.trim().is_empty(),
      "upstream_url must not be empty"
    );
    check_interval(self.sync_interval()).context("invalid sync_interval_secs")?;
    ensure!(
      self.lock_wait_timeout_secs > 0,
      "lock_wait_timeout_secs must be positive"
    );
    ensure!(
      self.upstream_timeout_secs > 0,
      "upstream_timeout_secs must be positive"
    );
    ensure!(self.max_response_bytes > 0, "max_response_bytes must be positive");
    Ok(())
  }

  pub fn fetcher_config(&self) -> FetcherConfig {
    FetcherConfig {
      url:                self.upstream_url.clone(),
      timeout:            Duration::from_secs(self.upstream_timeout_secs),
      max_response_bytes: self.max_response_bytes,
    }
  }

  pub fn sync_interval(&self) -> Duration { Duration::from_secs(self.sync_interval_secs) }

  pub fn lock_wait(&self) -> Duration { Duration::from_secs(self.lock_wait_timeout_secs) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
