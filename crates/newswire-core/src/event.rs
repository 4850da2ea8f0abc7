//! Live events and their incremental updates.
//!
//! A live event is tracked while a real-world occurrence is in progress. Its
//! status only ever moves forward (`live` → `completed`); once completed it is
//! waiting to be archived into an article and then deleted.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Row identity of a [`LiveEvent`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Row identity of an [`EventUpdate`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UpdateId(pub i64);

impl fmt::Display for UpdateId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Category ────────────────────────────────────────────────────────────────

/// A `/`-separated, case-insensitive category path such as `sports/football`.
///
/// Normalised on construction: segments are trimmed and lowercased, empty
/// segments are dropped. A category with no segments is legal; it simply
/// matches no specific policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Category(String);

impl Category {
  pub fn new(raw: &str) -> Self {
    let normalised = raw
      .split('/')
      .map(|s| s.trim().to_lowercase())
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>()
      .join("/");
    Self(normalised)
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn is_blank(&self) -> bool { self.0.is_empty() }

  /// Segments from least to most specific (`["sports", "football"]`).
  pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> {
    self.0.split('/').filter(|s| !s.is_empty())
  }

  /// The most specific segment, if any.
  pub fn leaf(&self) -> Option<&str> { self.segments().next_back() }
}

impl From<String> for Category {
  fn from(s: String) -> Self { Self::new(&s) }
}

impl From<&str> for Category {
  fn from(s: &str) -> Self { Self::new(s) }
}

impl From<Category> for String {
  fn from(c: Category) -> Self { c.0 }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where an event is in its lifecycle. `Completed` is terminal.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventStatus {
  Live,
  Completed,
}

impl EventStatus {
  /// Parse the stored discriminant, mapping failures into the core taxonomy.
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
  }
}

/// Why an event left the `live` state.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CompletionReason {
  /// Ran past the maximum live duration for its category.
  DurationExceeded,
  /// Its announced end time (plus grace) has passed.
  ScheduledEnd,
  /// No updates for longer than the inactivity grace window.
  Inactive,
  /// Forced by the deduplicator's safety-ceiling backstop.
  SafetyCeiling,
}

impl CompletionReason {
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownCompletionReason(s.to_owned()))
  }
}

// ─── LiveEvent ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveEvent {
  pub event_id:          EventId,
  pub name:              String,
  pub category:          Category,
  pub status:            EventStatus,
  pub description:       String,
  pub venue:             Option<String>,
  pub start_time:        DateTime<Utc>,
  /// Announced end time, when the source knows one.
  pub scheduled_end:     Option<DateTime<Utc>>,
  /// Bumped on every appended update.
  pub last_updated:      DateTime<Utc>,
  pub completed_at:      Option<DateTime<Utc>>,
  pub completion_reason: Option<CompletionReason>,
  /// Optimistic-concurrency token; every write to the row increments it.
  pub version:           i64,
}

impl LiveEvent {
  pub fn is_live(&self) -> bool { self.status == EventStatus::Live }

  /// The most recent sign of life: the last update, or the start.
  pub fn last_activity(&self) -> DateTime<Utc> {
    self.last_updated.max(self.start_time)
  }
}

/// Input to [`crate::store::NewsStore::create_event`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
  pub name:          String,
  pub category:      Category,
  #[serde(default)]
  pub description:   String,
  #[serde(default)]
  pub venue:         Option<String>,
  /// Defaults to the time of insertion.
  #[serde(default)]
  pub start_time:    Option<DateTime<Utc>>,
  #[serde(default)]
  pub scheduled_end: Option<DateTime<Utc>>,
}

impl NewEvent {
  pub fn new(
    name: impl Into<String>,
    category: impl Into<Category>,
    description: impl Into<String>,
  ) -> Self {
    Self {
      name:          name.into(),
      category:      category.into(),
      description:   description.into(),
      venue:         None,
      start_time:    None,
      scheduled_end: None,
    }
  }

  pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
    self.start_time = Some(start);
    self
  }
}

// ─── EventUpdate ─────────────────────────────────────────────────────────────

/// An incremental fragment of coverage attached to a live event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventUpdate {
  pub update_id:  UpdateId,
  pub event_id:   EventId,
  pub timestamp:  DateTime<Utc>,
  pub title:      Option<String>,
  pub content:    String,
  /// 0.0–1.0 editorial weight assigned at ingestion.
  pub importance: f64,
}

/// Input to [`crate::store::NewsStore::append_update`].
#[derive(Debug, Clone)]
pub struct NewUpdate {
  pub event_id:   EventId,
  pub timestamp:  DateTime<Utc>,
  pub title:      Option<String>,
  pub content:    String,
  pub importance: f64,
}

impl NewUpdate {
  pub const DEFAULT_IMPORTANCE: f64 = 0.5;

  pub fn new(
    event_id: EventId,
    timestamp: DateTime<Utc>,
    content: impl Into<String>,
  ) -> Self {
    Self {
      event_id,
      timestamp,
      title: None,
      content: content.into(),
      importance: Self::DEFAULT_IMPORTANCE,
    }
  }

  pub fn titled(mut self, title: impl Into<String>) -> Self {
    self.title = Some(title.into());
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn category_is_normalised() {
    let c = Category::new(" Sports / Football/ ");
    assert_eq!(c.as_str(), "sports/football");
    assert_eq!(c.leaf(), Some("football"));
    assert_eq!(c.segments().collect::<Vec<_>>(), ["sports", "football"]);
  }

  #[test]
  fn blank_category_has_no_leaf() {
    let c = Category::new(" / ");
    assert!(c.is_blank());
    assert_eq!(c.leaf(), None);
  }

  #[test]
  fn status_round_trips_through_discriminant() {
    assert_eq!(EventStatus::Completed.as_ref(), "completed");
    assert_eq!(EventStatus::parse("live").unwrap(), EventStatus::Live);
    assert!(matches!(
      EventStatus::parse("upcoming"),
      Err(Error::UnknownStatus(s)) if s == "upcoming"
    ));
  }

  #[test]
  fn reason_discriminants_are_snake_case() {
    assert_eq!(CompletionReason::SafetyCeiling.as_ref(), "safety_ceiling");
    assert_eq!(
      CompletionReason::parse("duration_exceeded").unwrap(),
      CompletionReason::DurationExceeded
    );
  }
}
