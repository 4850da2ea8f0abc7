//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 UTC strings
//! (microsecond precision, `Z` suffix) so that string comparison in SQL agrees
//! with chronological order. Tags are stored as compact JSON.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use newswire_core::{
  article::{Article, ArticleId, ArticleOrigin},
  event::{
    Category, CompletionReason, EventId, EventStatus, EventUpdate, LiveEvent,
    UpdateId,
  },
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Drop precision the column cannot hold, so values handed back to callers
/// compare equal to what a later read returns.
pub fn stored_precision(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── LIKE patterns ───────────────────────────────────────────────────────────

/// Wrap `text` in `%…%`, escaping LIKE metacharacters with `\`.
pub fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

/// The half-open string range `[prefix/, prefix0)` that contains every
/// sub-category of `category`. `'0'` is the character after `'/'`.
pub fn subcategory_range(category: &Category) -> (String, String) {
  let base = category.as_str();
  (format!("{base}/"), format!("{base}0"))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const EVENT_COLUMNS: &str = "event_id, name, category, status, description, venue,
   start_time, scheduled_end, last_updated, completed_at, completion_reason, version";

/// Raw values read directly from a `live_events` row.
pub struct RawEvent {
  pub event_id:          i64,
  pub name:              String,
  pub category:          String,
  pub status:            String,
  pub description:       String,
  pub venue:             Option<String>,
  pub start_time:        String,
  pub scheduled_end:     Option<String>,
  pub last_updated:      String,
  pub completed_at:      Option<String>,
  pub completion_reason: Option<String>,
  pub version:           i64,
}

impl RawEvent {
  /// Row mapper for queries selecting [`EVENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:          row.get(0)?,
      name:              row.get(1)?,
      category:          row.get(2)?,
      status:            row.get(3)?,
      description:       row.get(4)?,
      venue:             row.get(5)?,
      start_time:        row.get(6)?,
      scheduled_end:     row.get(7)?,
      last_updated:      row.get(8)?,
      completed_at:      row.get(9)?,
      completion_reason: row.get(10)?,
      version:           row.get(11)?,
    })
  }

  pub fn into_event(self) -> Result<LiveEvent> {
    Ok(LiveEvent {
      event_id:          EventId(self.event_id),
      name:              self.name,
      category:          Category::new(&self.category),
      status:            EventStatus::parse(&self.status)?,
      description:       self.description,
      venue:             self.venue,
      start_time:        decode_dt(&self.start_time)?,
      scheduled_end:     decode_opt_dt(self.scheduled_end)?,
      last_updated:      decode_dt(&self.last_updated)?,
      completed_at:      decode_opt_dt(self.completed_at)?,
      completion_reason: self
        .completion_reason
        .as_deref()
        .map(CompletionReason::parse)
        .transpose()?,
      version:           self.version,
    })
  }
}

pub const UPDATE_COLUMNS: &str =
  "update_id, event_id, timestamp, title, content, importance";

/// Raw values read directly from an `event_updates` row.
pub struct RawUpdate {
  pub update_id:  i64,
  pub event_id:   i64,
  pub timestamp:  String,
  pub title:      Option<String>,
  pub content:    String,
  pub importance: f64,
}

impl RawUpdate {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      update_id:  row.get(0)?,
      event_id:   row.get(1)?,
      timestamp:  row.get(2)?,
      title:      row.get(3)?,
      content:    row.get(4)?,
      importance: row.get(5)?,
    })
  }

  pub fn into_update(self) -> Result<EventUpdate> {
    Ok(EventUpdate {
      update_id:  UpdateId(self.update_id),
      event_id:   EventId(self.event_id),
      timestamp:  decode_dt(&self.timestamp)?,
      title:      self.title,
      content:    self.content,
      importance: self.importance,
    })
  }
}

pub const ARTICLE_COLUMNS: &str = "article_id, title, body, summary, category, source_label,
   tags, source_event_id, created_at";

/// Raw values read directly from an `articles` row.
pub struct RawArticle {
  pub article_id:      i64,
  pub title:           String,
  pub body:            String,
  pub summary:         Option<String>,
  pub category:        String,
  pub source_label:    String,
  pub tags:            String,
  pub source_event_id: Option<i64>,
  pub created_at:      String,
}

impl RawArticle {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      article_id:      row.get(0)?,
      title:           row.get(1)?,
      body:            row.get(2)?,
      summary:         row.get(3)?,
      category:        row.get(4)?,
      source_label:    row.get(5)?,
      tags:            row.get(6)?,
      source_event_id: row.get(7)?,
      created_at:      row.get(8)?,
    })
  }

  pub fn into_article(self) -> Result<Article> {
    let origin = match self.source_event_id {
      Some(id) => ArticleOrigin::ArchivedEvent { event_id: EventId(id) },
      None => ArticleOrigin::Authored,
    };
    Ok(Article {
      article_id: ArticleId(self.article_id),
      title: self.title,
      body: self.body,
      summary: self.summary,
      category: Category::new(&self.category),
      source_label: self.source_label,
      tags: decode_tags(&self.tags)?,
      origin,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let b = a + TimeDelta::microseconds(1);
    let c = a + TimeDelta::milliseconds(500);
    assert!(encode_dt(a) < encode_dt(b));
    assert!(encode_dt(b) < encode_dt(c));
    assert_eq!(encode_dt(a), "2024-01-01T12:00:00.000000Z");
    assert_eq!(decode_dt(&encode_dt(c)).unwrap(), c);
  }

  #[test]
  fn like_metacharacters_are_escaped() {
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
  }

  #[test]
  fn subcategory_range_brackets_children_only() {
    let (lo, hi) = subcategory_range(&Category::new("sports"));
    for inside in ["sports/football", "sports/tennis/atp"] {
      assert!(lo.as_str() <= inside && inside < hi.as_str(), "{inside}");
    }
    for outside in ["sports", "sportsbook", "finance"] {
      assert!(!(lo.as_str() <= outside && outside < hi.as_str()), "{outside}");
    }
  }
}
