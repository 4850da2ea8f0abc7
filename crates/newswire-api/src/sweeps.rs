//! `POST /sweeps`: run dedup, lifecycle and archive now.
//!
//! Waits for any sweep already in progress, then runs a full one and returns
//! its report.

use std::sync::Arc;

use axum::{Json, extract::State};
use newswire_core::store::NewsStore;
use newswire_engine::SweepReport;

use crate::ApiState;

/// `POST /sweeps`
pub async fn run<S: NewsStore>(State(state): State<Arc<ApiState<S>>>) -> Json<SweepReport> {
  let report = state.sweeper.run_sweep().await;
  tracing::info!(clean = report.is_clean(), "on-demand sweep finished");
  Json(report)
}
