//! Read-side queries for the "currently live" views.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use newswire_core::{
  event::{Category, EventStatus, LiveEvent},
  policy::{ArchivePolicy, CompletedVisibility},
  store::{EventQuery, NewsStore},
};

use crate::{EngineError, Result};

/// Presentation queries over live and just-completed events.
///
/// What a completed event looks like during its grace window is decided by
/// [`CompletedVisibility`]: hidden from live listings, or listed with its
/// `completed` status so the caller can label it.
pub struct LiveFeed<S> {
  store:  Arc<S>,
  policy: ArchivePolicy,
}

impl<S: NewsStore> LiveFeed<S> {
  pub fn new(store: Arc<S>, policy: ArchivePolicy) -> Self { Self { store, policy } }

  pub async fn list_live(&self, category: Option<Category>) -> Result<Vec<LiveEvent>> {
    self.list_live_at(category, Utc::now()).await
  }

  pub async fn list_live_at(
    &self,
    category: Option<Category>,
    now: DateTime<Utc>,
  ) -> Result<Vec<LiveEvent>> {
    let query = EventQuery {
      status: Some(EventStatus::Live),
      category: category.clone(),
      ..Default::default()
    };
    let mut events = self.store.list_events(&query).await.map_err(EngineError::store)?;

    if self.policy.completed_visibility == CompletedVisibility::Labeled {
      let recent = self
        .recently_completed(category, self.policy.grace_period(), now)
        .await?;
      events.extend(recent);
      events.sort_by(|a, b| {
        (b.start_time, b.event_id).cmp(&(a.start_time, a.event_id))
      });
    }

    Ok(events)
  }

  /// Completed events whose completion falls within `within` of now
  /// (default: the archive grace period), most recently completed first.
  pub async fn list_recently_completed(
    &self,
    within: Option<TimeDelta>,
  ) -> Result<Vec<LiveEvent>> {
    self.list_recently_completed_at(within, Utc::now()).await
  }

  pub async fn list_recently_completed_at(
    &self,
    within: Option<TimeDelta>,
    now: DateTime<Utc>,
  ) -> Result<Vec<LiveEvent>> {
    let within = within.unwrap_or_else(|| self.policy.grace_period());
    let mut events = self.recently_completed(None, within, now).await?;
    events.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    Ok(events)
  }

  async fn recently_completed(
    &self,
    category: Option<Category>,
    within: TimeDelta,
    now: DateTime<Utc>,
  ) -> Result<Vec<LiveEvent>> {
    let since = now.checked_sub_signed(within).ok_or_else(|| {
      newswire_core::Error::WindowOutOfRange(format!(
        "{} minutes before {now}",
        within.num_minutes()
      ))
    })?;
    let query = EventQuery {
      status: Some(EventStatus::Completed),
      category,
      completed_after: Some(since),
      ..Default::default()
    };
    self.store.list_events(&query).await.map_err(EngineError::store)
  }
}
