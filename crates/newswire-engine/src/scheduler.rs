//! Running the sweeps together, on demand or on a timer.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
  sync::{Mutex, watch},
  time::MissedTickBehavior,
};

use newswire_core::{
  Classify as _,
  policy::{ArchivePolicy, DedupPolicy, LifecyclePolicy},
  store::NewsStore,
};

use crate::{
  ArchiveSummary, Archiver, DedupSummary, Deduplicator, LifecycleEngine,
  LifecycleSummary, Result,
};

/// Everything one tick did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
  pub started_at: DateTime<Utc>,
  pub dedup:      DedupSummary,
  pub lifecycle:  LifecycleSummary,
  pub archive:    ArchiveSummary,
  /// Stages that could not take their snapshot, with the error.
  pub aborted:    Vec<String>,
}

impl SweepReport {
  pub fn is_clean(&self) -> bool {
    self.aborted.is_empty()
      && self.dedup.errors == 0
      && self.lifecycle.errors == 0
      && self.archive.errors == 0
  }
}

/// The three engines, run in a fixed order and never concurrently with
/// themselves.
///
/// Dedup runs first so the lifecycle engine sees one event per name, and the
/// archiver runs last so a completion from this tick is picked up as soon
/// as its grace window allows.
pub struct Sweeper<S> {
  dedup:     Deduplicator<S>,
  lifecycle: LifecycleEngine<S>,
  archiver:  Archiver<S>,
  lock:      Mutex<()>,
}

impl<S: NewsStore> Sweeper<S> {
  pub fn new(
    store: Arc<S>,
    lifecycle: LifecyclePolicy,
    archive: ArchivePolicy,
    dedup: DedupPolicy,
  ) -> Result<Self> {
    Ok(Self {
      dedup:     Deduplicator::new(store.clone(), dedup, &lifecycle)?,
      lifecycle: LifecycleEngine::new(store.clone(), lifecycle)?,
      archiver:  Archiver::new(store, archive)?,
      lock:      Mutex::new(()),
    })
  }

  pub fn lifecycle(&self) -> &LifecycleEngine<S> { &self.lifecycle }

  pub fn archiver(&self) -> &Archiver<S> { &self.archiver }

  pub fn deduplicator(&self) -> &Deduplicator<S> { &self.dedup }

  pub async fn run_sweep(&self) -> SweepReport { self.sweep_at(Utc::now()).await }

  /// One full sweep as though the clock read `now`. Never fails: a stage
  /// that cannot start is recorded in [`SweepReport::aborted`] and the next
  /// stage still runs.
  pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
    let _guard = self.lock.lock().await;
    let mut report = SweepReport { started_at: now, ..Default::default() };

    match self.dedup.sweep_at(now).await {
      Ok(s) => report.dedup = s,
      Err(e) => {
        tracing::error!(stage = "dedup", kind = %e.kind(), error = %e, "sweep aborted");
        report.aborted.push(format!("dedup: {e}"));
      }
    }
    match self.lifecycle.sweep_at(now).await {
      Ok(s) => report.lifecycle = s,
      Err(e) => {
        tracing::error!(stage = "lifecycle", kind = %e.kind(), error = %e, "sweep aborted");
        report.aborted.push(format!("lifecycle: {e}"));
      }
    }
    match self.archiver.sweep_at(now).await {
      Ok(s) => report.archive = s,
      Err(e) => {
        tracing::error!(stage = "archive", kind = %e.kind(), error = %e, "sweep aborted");
        report.aborted.push(format!("archive: {e}"));
      }
    }

    report
  }

  /// Sweep every `interval` until `shutdown` flips to `true` or its sender
  /// is dropped. The first sweep runs immediately; ticks missed while a
  /// sweep overran are delayed rather than bunched up.
  pub async fn run_forever(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_secs = interval.as_secs(), "sweeper started");

    loop {
      tokio::select! {
        _ = ticker.tick() => {
          let report = self.run_sweep().await;
          log_report(&report);
        }
        changed = shutdown.changed() => {
          if changed.is_err() || *shutdown.borrow() {
            break;
          }
        }
      }
    }

    tracing::info!("sweeper stopped");
  }
}

fn log_report(report: &SweepReport) {
  let SweepReport { dedup, lifecycle, archive, .. } = report;
  if report.is_clean() {
    tracing::info!(
      duplicates_removed = dedup.events_removed,
      orphans_purged = dedup.orphans_purged,
      force_completed = dedup.force_completed,
      completed = lifecycle.completed,
      lost_races = lifecycle.lost_races,
      articles_created = archive.articles_created,
      events_purged = archive.events_purged,
      "sweep finished"
    );
  } else {
    tracing::warn!(
      dedup_errors = dedup.errors,
      lifecycle_errors = lifecycle.errors,
      archive_errors = archive.errors,
      aborted = ?report.aborted,
      "sweep finished with errors"
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_report_is_clean() {
    let mut report = SweepReport::default();
    assert!(report.is_clean());
    report.archive.errors = 1;
    assert!(!report.is_clean());
  }
}
