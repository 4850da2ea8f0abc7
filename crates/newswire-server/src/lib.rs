//! Process-level glue for the Newswire server: configuration loading and the
//! top-level HTTP router.

use std::{path::{Path, PathBuf}, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use newswire_api::{ApiState, api_router};
use newswire_core::{
  policy::{ArchivePolicy, DedupPolicy, LifecyclePolicy},
  store::NewsStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration.
///
/// Read from an optional TOML file, then overridden by `NEWSWIRE_*`
/// environment variables (`__` separates nested keys, e.g.
/// `NEWSWIRE_DEDUP__SAFETY_CEILING_MINUTES`). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  pub sweep_interval_secs: u64,
  pub lifecycle:           LifecyclePolicy,
  pub archive:             ArchivePolicy,
  pub dedup:               DedupPolicy,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "127.0.0.1".to_string(),
      port:                8080,
      store_path:          PathBuf::from("~/.local/share/newswire/newswire.db"),
      sweep_interval_secs: 60,
      lifecycle:           LifecyclePolicy::default(),
      archive:             ArchivePolicy::default(),
      dedup:               DedupPolicy::default(),
    }
  }
}

impl ServerConfig {
  /// Layer `path` (if it exists) under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::from_builder(
      config::Config::builder().add_source(config::File::from(path).required(false)),
    )
  }

  /// Finish `builder` with the environment layer and deserialise.
  pub fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> Result<Self, config::ConfigError> {
    builder
      .add_source(
        config::Environment::with_prefix("NEWSWIRE")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  /// Reject configurations the sweeps cannot run with.
  pub fn validate(&self) -> Result<(), newswire_core::Error> {
    if self.sweep_interval_secs == 0 {
      return Err(newswire_core::Error::InvalidPolicy(
        "sweep_interval_secs must be positive".into(),
      ));
    }
    self.lifecycle.validate()?;
    self.archive.validate()?;
    self.dedup.validate(&self.lifecycle)
  }

  pub fn sweep_interval(&self) -> Duration { Duration::from_secs(self.sweep_interval_secs) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full HTTP surface: the JSON API under `/api` plus a health probe.
pub fn router<S>(state: Arc<ApiState<S>>) -> Router
where
  S: NewsStore + 'static,
{
  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}
