//! Articles: the permanent, non-live records that browse and search serve.
//!
//! Most articles are authored elsewhere; the ones this crate cares about are
//! produced by archiving a completed live event. The relationship is one-way
//! and established exactly once: the article remembers which event it came
//! from, the event is deleted afterwards.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Category, EventId};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ArticleId(pub i64);

impl fmt::Display for ArticleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Where an article came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArticleOrigin {
  /// Written directly (RSS import, editorial, ...).
  #[default]
  Authored,
  /// Produced by archiving a completed live event. At most one article may
  /// exist per `event_id`.
  ArchivedEvent { event_id: EventId },
}

impl ArticleOrigin {
  pub fn source_event(&self) -> Option<EventId> {
    match self {
      Self::Authored => None,
      Self::ArchivedEvent { event_id } => Some(*event_id),
    }
  }
}

/// An immutable article row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
  pub article_id:   ArticleId,
  pub title:        String,
  pub body:         String,
  pub summary:      Option<String>,
  pub category:     Category,
  /// Display attribution, e.g. "Football News".
  pub source_label: String,
  pub tags:         Vec<String>,
  pub origin:       ArticleOrigin,
  /// Server-assigned; never changes after creation.
  pub created_at:   DateTime<Utc>,
}

/// Input to the article-creating store operations.
/// `created_at` is always set by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewArticle {
  pub title:        String,
  #[serde(default)]
  pub body:         String,
  #[serde(default)]
  pub summary:      Option<String>,
  pub category:     Category,
  pub source_label: String,
  #[serde(default)]
  pub tags:         Vec<String>,
  #[serde(default)]
  pub origin:       ArticleOrigin,
}
