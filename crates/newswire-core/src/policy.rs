//! Time-based policies applied by the sweeps.
//!
//! All durations are configured in whole minutes so they read naturally in
//! `config.toml`; accessors hand out [`TimeDelta`]s.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  event::{Category, CompletionReason, LiveEvent},
};

/// Upper bound for any configured duration (ten years).
const MAX_MINUTES: u64 = 10 * 365 * 24 * 60;

fn minutes(m: u64) -> TimeDelta {
  i64::try_from(m.min(MAX_MINUTES))
    .ok()
    .and_then(TimeDelta::try_minutes)
    .unwrap_or(TimeDelta::MAX)
}

fn check_range(field: &str, value: u64, allow_zero: bool) -> Result<()> {
  if value == 0 && !allow_zero {
    return Err(Error::InvalidPolicy(format!("{field} must be positive")));
  }
  if value > MAX_MINUTES {
    return Err(Error::InvalidPolicy(format!(
      "{field} exceeds {MAX_MINUTES} minutes"
    )));
  }
  Ok(())
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

/// Rules deciding when a live event must become completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecyclePolicy {
  /// Ceiling for categories with no entry in the table.
  pub default_max_live_minutes:    u64,
  /// Per-category ceilings, keyed by a full path or a single segment.
  pub category_max_live_minutes:   BTreeMap<String, u64>,
  /// How long an event may go without updates before it counts as quiet.
  pub inactivity_grace_minutes:    u64,
  /// Quiet events are only completed once they have run at least this long.
  pub min_runtime_minutes:         u64,
  /// Delay after an announced end time before the event is completed.
  pub scheduled_end_grace_minutes: u64,
}

impl Default for LifecyclePolicy {
  fn default() -> Self {
    let category_max_live_minutes = [
      ("football", 150),
      ("soccer", 150),
      ("basketball", 180),
      ("baseball", 180),
      ("hockey", 180),
      ("tennis", 300),
      ("conference", 240),
      ("speech", 240),
      ("meeting", 240),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v))
    .collect();

    Self {
      default_max_live_minutes: 180,
      category_max_live_minutes,
      inactivity_grace_minutes: 30,
      min_runtime_minutes: 60,
      scheduled_end_grace_minutes: 5,
    }
  }
}

impl LifecyclePolicy {
  pub fn validate(&self) -> Result<()> {
    check_range("default_max_live_minutes", self.default_max_live_minutes, false)?;
    for (key, value) in &self.category_max_live_minutes {
      if Category::new(key).is_blank() {
        return Err(Error::InvalidPolicy("blank category key".to_owned()));
      }
      check_range(&format!("category_max_live_minutes.{key}"), *value, false)?;
    }
    check_range("inactivity_grace_minutes", self.inactivity_grace_minutes, false)?;
    check_range("min_runtime_minutes", self.min_runtime_minutes, true)?;
    check_range(
      "scheduled_end_grace_minutes",
      self.scheduled_end_grace_minutes,
      true,
    )
  }

  fn table_lookup(&self, key: &str) -> Option<u64> {
    self
      .category_max_live_minutes
      .iter()
      .find(|(k, _)| Category::new(k).as_str() == key)
      .map(|(_, v)| *v)
  }

  /// The maximum live duration for `category`: the exact path first, then
  /// each segment from most to least specific, then the default.
  pub fn max_live_for(&self, category: &Category) -> TimeDelta {
    let configured = if category.is_blank() {
      None
    } else {
      self
        .table_lookup(category.as_str())
        .or_else(|| category.segments().rev().find_map(|s| self.table_lookup(s)))
    };
    minutes(configured.unwrap_or(self.default_max_live_minutes))
  }

  /// The longest ceiling any category can get.
  pub fn longest_ceiling_minutes(&self) -> u64 {
    self
      .category_max_live_minutes
      .values()
      .copied()
      .chain(std::iter::once(self.default_max_live_minutes))
      .max()
      .unwrap_or(self.default_max_live_minutes)
  }

  pub fn inactivity_grace(&self) -> TimeDelta { minutes(self.inactivity_grace_minutes) }

  pub fn min_runtime(&self) -> TimeDelta { minutes(self.min_runtime_minutes) }

  pub fn scheduled_end_grace(&self) -> TimeDelta {
    minutes(self.scheduled_end_grace_minutes)
  }

  /// Decide whether `event` must leave the live state at `now`.
  ///
  /// Returns `None` for events that are not live, that have not started yet,
  /// or that are still within every limit.
  pub fn evaluate(
    &self,
    event: &LiveEvent,
    now: DateTime<Utc>,
  ) -> Option<CompletionReason> {
    if !event.is_live() {
      return None;
    }
    let elapsed = now - event.start_time;
    if elapsed < TimeDelta::zero() {
      return None;
    }

    if elapsed > self.max_live_for(&event.category) {
      return Some(CompletionReason::DurationExceeded);
    }

    if let Some(end) = event.scheduled_end
      && now - end >= self.scheduled_end_grace()
    {
      return Some(CompletionReason::ScheduledEnd);
    }

    let quiet_for = now - event.last_activity();
    if quiet_for > self.inactivity_grace() && elapsed >= self.min_runtime() {
      return Some(CompletionReason::Inactive);
    }

    None
  }
}

// ─── Archive ─────────────────────────────────────────────────────────────────

/// What the live listings show for an event between completion and purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletedVisibility {
  /// Drop out of live listings the moment it completes.
  #[default]
  Hidden,
  /// Stay listed, labelled completed, until purged.
  Labeled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchivePolicy {
  /// Time between completion and archival/purge.
  pub grace_period_minutes: u64,
  pub completed_visibility: CompletedVisibility,
}

impl Default for ArchivePolicy {
  fn default() -> Self {
    Self {
      grace_period_minutes: 5,
      completed_visibility: CompletedVisibility::default(),
    }
  }
}

impl ArchivePolicy {
  pub fn validate(&self) -> Result<()> {
    check_range("grace_period_minutes", self.grace_period_minutes, true)
  }

  pub fn grace_period(&self) -> TimeDelta { minutes(self.grace_period_minutes) }
}

// ─── Dedup ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupPolicy {
  /// Age past which any still-live event is forced to completed. Must be
  /// longer than every lifecycle ceiling.
  pub safety_ceiling_minutes: u64,
}

impl Default for DedupPolicy {
  fn default() -> Self { Self { safety_ceiling_minutes: 24 * 60 } }
}

impl DedupPolicy {
  pub fn validate(&self, lifecycle: &LifecyclePolicy) -> Result<()> {
    check_range("safety_ceiling_minutes", self.safety_ceiling_minutes, false)?;
    let longest = lifecycle.longest_ceiling_minutes();
    if self.safety_ceiling_minutes <= longest {
      return Err(Error::InvalidPolicy(format!(
        "safety_ceiling_minutes ({}) must exceed the longest category ceiling ({longest})",
        self.safety_ceiling_minutes
      )));
    }
    Ok(())
  }

  pub fn safety_ceiling(&self) -> TimeDelta { minutes(self.safety_ceiling_minutes) }
}
