//! Completed events → articles, then purge.
//!
//! Archival is two separate writes. The article is created (or found, if a
//! previous attempt already created it) and only then is the source event
//! deleted. A failure between the two leaves a completed event with an
//! existing article, which the next sweep purges without writing a second
//! article. The purge carries the version read at the start of the sweep, so
//! an event touched in between is left for the next sweep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use newswire_core::{
  archive::compose_article,
  article::Article,
  event::{EventStatus, EventUpdate, LiveEvent},
  policy::ArchivePolicy,
  store::{EventQuery, NewsStore},
};

use crate::{
  EngineError, Result,
  error::log_event_failure,
};

/// Counts from one archive sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
  /// Completed events past their grace window.
  pub scanned:          usize,
  pub articles_created: usize,
  /// Events whose article already existed from an earlier attempt.
  pub articles_reused:  usize,
  pub events_purged:    usize,
  /// Purges skipped because the event changed or vanished after it was read.
  pub lost_races:       usize,
  pub errors:           usize,
}

pub struct Archiver<S> {
  store:  Arc<S>,
  policy: ArchivePolicy,
}

impl<S: NewsStore> Archiver<S> {
  pub fn new(store: Arc<S>, policy: ArchivePolicy) -> Result<Self> {
    policy.validate()?;
    Ok(Self { store, policy })
  }

  pub fn policy(&self) -> &ArchivePolicy { &self.policy }

  /// Build and persist the article for a completed `event`.
  ///
  /// Returns the article and whether this call created it. Calling it again
  /// for the same event returns the existing article. A live event is
  /// refused before anything is written.
  pub async fn create_article_from_event(
    &self,
    event: &LiveEvent,
    updates: &[EventUpdate],
  ) -> Result<(Article, bool)> {
    let input = compose_article(event, updates)?;
    self
      .store
      .create_article_from_event(input)
      .await
      .map_err(EngineError::store)
  }

  pub async fn run_sweep(&self) -> Result<ArchiveSummary> {
    self.sweep_at(Utc::now()).await
  }

  pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<ArchiveSummary> {
    let grace = self.policy.grace_period();
    let completed = self
      .store
      .list_events(&EventQuery::with_status(EventStatus::Completed))
      .await
      .map_err(EngineError::store)?;

    let due: Vec<&LiveEvent> = completed
      .iter()
      .filter(|e| e.completed_at.is_none_or(|at| at + grace <= now))
      .collect();

    let mut summary = ArchiveSummary { scanned: due.len(), ..Default::default() };

    for event in due {
      let (article, created) = match self.archive_one(event).await {
        Ok(outcome) => outcome,
        Err(e) => {
          summary.errors += 1;
          log_event_failure("archive", event.event_id, &e);
          continue;
        }
      };

      if created {
        summary.articles_created += 1;
        tracing::info!(
          event_id = %event.event_id,
          article_id = %article.article_id,
          title = %article.title,
          "archived event"
        );
      } else {
        summary.articles_reused += 1;
        tracing::debug!(
          event_id = %event.event_id,
          article_id = %article.article_id,
          "article already existed"
        );
      }

      match self
        .store
        .purge_completed_event(event.event_id, event.version)
        .await
      {
        Ok(true) => summary.events_purged += 1,
        Ok(false) => {
          summary.lost_races += 1;
          tracing::debug!(
            event_id = %event.event_id,
            "event changed or already purged; leaving it for the next sweep"
          )
        }
        Err(e) => {
          summary.errors += 1;
          log_event_failure("purge", event.event_id, &e);
        }
      }
    }

    Ok(summary)
  }

  async fn archive_one(&self, event: &LiveEvent) -> Result<(Article, bool)> {
    let updates = self
      .store
      .get_updates(event.event_id)
      .await
      .map_err(EngineError::store)?;
    self.create_article_from_event(event, &updates).await
  }
}
