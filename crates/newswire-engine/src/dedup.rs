//! Duplicate collapse, orphan cleanup and the safety-ceiling backstop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use newswire_core::{
  Classify as _,
  policy::{DedupPolicy, LifecyclePolicy},
  store::NewsStore,
};

use crate::{EngineError, Result};

/// Counts from one dedup sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupSummary {
  /// Names that had more than one live event at snapshot time.
  pub duplicate_groups: usize,
  pub events_removed:   usize,
  pub orphans_purged:   u64,
  pub force_completed:  usize,
  pub errors:           usize,
}

pub struct Deduplicator<S> {
  store:  Arc<S>,
  policy: DedupPolicy,
}

impl<S: NewsStore> Deduplicator<S> {
  /// The safety ceiling is checked against `lifecycle` so the backstop can
  /// never fire before the regular policy would.
  pub fn new(
    store: Arc<S>,
    policy: DedupPolicy,
    lifecycle: &LifecyclePolicy,
  ) -> Result<Self> {
    policy.validate(lifecycle)?;
    Ok(Self { store, policy })
  }

  pub fn policy(&self) -> &DedupPolicy { &self.policy }

  pub async fn run_sweep(&self) -> Result<DedupSummary> {
    self.sweep_at(Utc::now()).await
  }

  pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<DedupSummary> {
    let names = self
      .store
      .duplicate_live_names()
      .await
      .map_err(EngineError::store)?;

    let mut summary = DedupSummary { duplicate_groups: names.len(), ..Default::default() };

    // One transaction per name; the group is re-read inside it.
    for name in names {
      match self.store.collapse_duplicates(name.clone()).await {
        Ok(removed) => {
          if !removed.is_empty() {
            tracing::info!(%name, ?removed, "collapsed duplicate live events");
          }
          summary.events_removed += removed.len();
        }
        Err(e) => {
          summary.errors += 1;
          tracing::warn!(%name, kind = %e.kind(), error = %e, "duplicate collapse failed");
        }
      }
    }

    match self.store.purge_orphan_updates().await {
      Ok(purged) => {
        if purged > 0 {
          tracing::info!(purged, "purged orphan updates");
        }
        summary.orphans_purged = purged;
      }
      Err(e) => {
        summary.errors += 1;
        tracing::warn!(kind = %e.kind(), error = %e, "orphan purge failed");
      }
    }

    let cutoff = now - self.policy.safety_ceiling();
    match self.store.force_complete_started_before(cutoff, now).await {
      Ok(forced) => {
        if !forced.is_empty() {
          // The lifecycle engine should have caught these first.
          tracing::warn!(?forced, %cutoff, "safety ceiling force-completed live events");
        }
        summary.force_completed = forced.len();
      }
      Err(e) => {
        summary.errors += 1;
        tracing::warn!(kind = %e.kind(), error = %e, "safety-ceiling sweep failed");
      }
    }

    Ok(summary)
  }
}
