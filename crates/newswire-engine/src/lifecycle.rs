//! The live → completed transition.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;

use newswire_core::{
  event::EventStatus,
  policy::LifecyclePolicy,
  store::{EventQuery, NewsStore},
};

use crate::{
  EngineError, Result,
  error::log_event_failure,
};

/// Counts from one lifecycle sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleSummary {
  /// Live events examined.
  pub scanned:    usize,
  pub completed:  usize,
  /// Events that changed between the snapshot and the write; they are
  /// re-evaluated next tick.
  pub lost_races: usize,
  pub errors:     usize,
}

pub struct LifecycleEngine<S> {
  store:  Arc<S>,
  policy: LifecyclePolicy,
}

impl<S: NewsStore> LifecycleEngine<S> {
  pub fn new(store: Arc<S>, policy: LifecyclePolicy) -> Result<Self> {
    policy.validate()?;
    Ok(Self { store, policy })
  }

  pub fn policy(&self) -> &LifecyclePolicy { &self.policy }

  /// Sweep every live event against the policy as of now.
  pub async fn run_sweep(&self) -> Result<LifecycleSummary> {
    self.sweep_at(Utc::now()).await
  }

  /// Sweep as though the clock read `now`.
  ///
  /// Each transition is its own conditional write keyed on the version read
  /// in the snapshot, so concurrent ingestion only ever costs a lost race.
  pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<LifecycleSummary> {
    let live = self
      .store
      .list_events(&EventQuery::with_status(EventStatus::Live))
      .await
      .map_err(EngineError::store)?;

    let mut summary = LifecycleSummary { scanned: live.len(), ..Default::default() };

    let mut per_name: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &live {
      *per_name.entry(event.name.as_str()).or_default() += 1;
    }
    for (name, count) in per_name.iter().filter(|(_, n)| **n > 1) {
      tracing::error!(
        name,
        count,
        kind = "invariant_violation",
        "several live events share a name; dedup will collapse them"
      );
    }

    for event in &live {
      let Some(reason) = self.policy.evaluate(event, now) else {
        continue;
      };

      match self
        .store
        .mark_completed(event.event_id, event.version, now, reason)
        .await
      {
        Ok(true) => {
          summary.completed += 1;
          tracing::info!(
            event_id = %event.event_id,
            name = %event.name,
            category = %event.category,
            %reason,
            "event completed"
          );
        }
        Ok(false) => {
          summary.lost_races += 1;
          tracing::debug!(event_id = %event.event_id, "event changed since snapshot");
        }
        Err(e) => {
          summary.errors += 1;
          log_event_failure("lifecycle", event.event_id, &e);
        }
      }
    }

    Ok(summary)
  }
}
