//! Upstream fetcher.
//!
//! One `GET {url}` per reconciliation. The body must be a JSON array of
//! `{"id": <integer>, "nome": <string>}` objects; unknown fields are ignored.
//! Every way the fetch can go wrong is reported as a [`FetchOutcome`]
//! variant, never as an error or a panic.

use std::{future::Future, time::Duration};

use regional_core::regional::ExternalRegional;
use reqwest::Client;
use serde::Deserialize;

/// Default wall-clock limit for one fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on the response body.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Result of pulling one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  /// A non-empty snapshot, in upstream order. May contain duplicate keys.
  Ok(Vec<ExternalRegional>),
  /// A well-formed but empty list.
  Empty,
  /// Network error, non-2xx status, timeout, or oversized body.
  TransportFailure(String),
  /// The body is not the expected JSON shape.
  DecodeFailure(String),
}

/// A source of upstream snapshots.
pub trait Upstream: Send + Sync {
  fn fetch(&self) -> impl Future<Output = FetchOutcome> + Send + '_;
}

// ─── HTTP fetcher ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FetcherConfig {
  pub url:                String,
  pub timeout:            Duration,
  pub max_response_bytes: usize,
}

impl FetcherConfig {
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url:                url.into(),
      timeout:            DEFAULT_TIMEOUT,
      max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
    }
  }
}

/// [`Upstream`] over HTTP.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpFetcher {
  client: Client,
  config: FetcherConfig,
}

/// Wire shape of one upstream row.
#[derive(Deserialize)]
struct UpstreamRow {
  id:   i64,
  nome: String,
}

impl HttpFetcher {
  pub fn new(config: FetcherConfig) -> reqwest::Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  pub fn url(&self) -> &str { &self.config.url }

  /// Download the body, enforcing the status and size limits.
  async fn fetch_body(&self) -> Result<Vec<u8>, String> {
    let url = &self.config.url;
    let limit = self.config.max_response_bytes;

    let mut resp = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| format!("GET {url} failed: {e}"))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(format!("GET {url} → {status}"));
    }

    if let Some(len) = resp.content_length()
      && len > limit as u64
    {
      return Err(format!(
        "response of {len} bytes exceeds the {limit} byte limit"
      ));
    }

    // Content-Length may be absent or wrong, so count what actually arrives.
    let mut body = Vec::new();
    while let Some(chunk) = resp
      .chunk()
      .await
      .map_err(|e| format!("reading body of GET {url} failed: {e}"))?
    {
      if body.len() + chunk.len() > limit {
        return Err(format!("response exceeds the {limit} byte limit"));
      }
      body.extend_from_slice(&chunk);
    }
    Ok(body)
  }
}

impl Upstream for HttpFetcher {
  async fn fetch(&self) -> FetchOutcome {
    let body = match self.fetch_body().await {
      Ok(body) => body,
      Err(reason) => return FetchOutcome::TransportFailure(reason),
    };
    let outcome = decode_snapshot(&body);
    if let FetchOutcome::Ok(rows) = &outcome {
      tracing::debug!(url = %self.config.url, rows = rows.len(), "fetched upstream snapshot");
    }
    outcome
  }
}

/// Decode a response body. A single malformed row rejects the whole
/// snapshot.
pub fn decode_snapshot(body: &[u8]) -> FetchOutcome {
  match serde_json::from_slice::<Vec<UpstreamRow>>(body) {
    Err(e) => FetchOutcome::DecodeFailure(e.to_string()),
    Ok(rows) if rows.is_empty() => FetchOutcome::Empty,
    Ok(rows) => FetchOutcome::Ok(
      rows
        .into_iter()
        .map(|r| ExternalRegional::new(r.id, r.nome))
        .collect(),
    ),
  }
}
