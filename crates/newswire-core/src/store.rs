//! The `NewsStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `newswire-store-sqlite`).
//! The sweep engines and the HTTP glue depend on this abstraction, not on any
//! concrete backend. No business policy lives behind it: every decision is
//! made by the caller and handed down as a conditional write.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  Classify,
  article::{Article, ArticleId, NewArticle},
  event::{
    Category, CompletionReason, EventId, EventStatus, EventUpdate, LiveEvent,
    NewEvent, NewUpdate,
  },
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`NewsStore::list_events`].
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
  pub status:           Option<EventStatus>,
  /// Matches the category itself and everything beneath it
  /// (`sports` matches `sports/football`).
  pub category:         Option<Category>,
  /// Free-text filter over name and description.
  pub text:             Option<String>,
  pub completed_after:  Option<DateTime<Utc>>,
  pub completed_before: Option<DateTime<Utc>>,
  pub limit:            Option<usize>,
}

impl EventQuery {
  pub fn with_status(status: EventStatus) -> Self {
    Self { status: Some(status), ..Default::default() }
  }
}

/// Parameters for [`NewsStore::list_articles`].
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
  pub category:      Option<Category>,
  /// `Some(true)` → only archived-event articles, `Some(false)` → only
  /// authored ones.
  pub archived_only: Option<bool>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the persistent store shared by ingestion, presentation
/// and the sweeps.
///
/// Every method is a single bounded transaction. Status transitions are
/// expressed as conditional writes that report whether they applied, so two
/// concurrent sweeps can never both act on the same event.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait NewsStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Events ────────────────────────────────────────────────────────────

  /// Create and persist a new live event.
  fn create_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<LiveEvent, Self::Error>> + Send + '_;

  /// Retrieve an event by id. Returns `None` if not found.
  fn get_event(
    &self,
    id: EventId,
  ) -> impl Future<Output = Result<Option<LiveEvent>, Self::Error>> + Send + '_;

  /// List events matching `query`, newest start first.
  fn list_events<'a>(
    &'a self,
    query: &'a EventQuery,
  ) -> impl Future<Output = Result<Vec<LiveEvent>, Self::Error>> + Send + 'a;

  /// Delete an event and its updates, whatever its status.
  fn delete_event(
    &self,
    id: EventId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Updates ───────────────────────────────────────────────────────────

  /// Append an update. Fails with a not-found error if the event does not
  /// exist and a validation error if it is no longer live. Bumps the event's
  /// `last_updated` and `version`.
  fn append_update(
    &self,
    input: NewUpdate,
  ) -> impl Future<Output = Result<EventUpdate, Self::Error>> + Send + '_;

  /// All updates for an event, oldest first (ties broken by id).
  fn get_updates(
    &self,
    event_id: EventId,
  ) -> impl Future<Output = Result<Vec<EventUpdate>, Self::Error>> + Send + '_;

  // ── Lifecycle writes ──────────────────────────────────────────────────

  /// Flip `live` → `completed` iff the row still carries `expected_version`.
  /// Returns `false` when the event changed or vanished since it was read.
  fn mark_completed(
    &self,
    id: EventId,
    expected_version: i64,
    at: DateTime<Utc>,
    reason: CompletionReason,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Force every live event that started before `cutoff` to completed.
  fn force_complete_started_before(
    &self,
    cutoff: DateTime<Utc>,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<EventId>, Self::Error>> + Send + '_;

  /// Delete a completed event and its updates iff the row still carries
  /// `expected_version`. Returns `false` if the event is gone, not completed
  /// or changed since it was read.
  fn purge_completed_event(
    &self,
    id: EventId,
    expected_version: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Deduplication ─────────────────────────────────────────────────────

  /// Names shared by more than one live event.
  fn duplicate_live_names(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Within one transaction, keep the canonical live event named `name` and
  /// delete the others (with their updates). Returns the removed ids.
  fn collapse_duplicates(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Vec<EventId>, Self::Error>> + Send + '_;

  /// Delete updates whose event no longer exists. Returns the count.
  fn purge_orphan_updates(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Articles ──────────────────────────────────────────────────────────

  /// Persist an authored article.
  fn create_article(
    &self,
    input: NewArticle,
  ) -> impl Future<Output = Result<Article, Self::Error>> + Send + '_;

  /// Persist an article derived from an event, unless one already exists
  /// for the same source event. Returns the article and whether it was
  /// newly created. Safe to call any number of times.
  fn create_article_from_event(
    &self,
    input: NewArticle,
  ) -> impl Future<Output = Result<(Article, bool), Self::Error>> + Send + '_;

  fn get_article(
    &self,
    id: ArticleId,
  ) -> impl Future<Output = Result<Option<Article>, Self::Error>> + Send + '_;

  /// The article archived from `event_id`, if any.
  fn find_article_for_event(
    &self,
    event_id: EventId,
  ) -> impl Future<Output = Result<Option<Article>, Self::Error>> + Send + '_;

  /// List articles matching `query`, newest first.
  fn list_articles<'a>(
    &'a self,
    query: &'a ArticleQuery,
  ) -> impl Future<Output = Result<Vec<Article>, Self::Error>> + Send + 'a;
}
