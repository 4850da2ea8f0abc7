//! End-to-end sweep scenarios against a real SQLite store.

use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use newswire_core::{
  Classify as _, ErrorKind,
  archive::ARCHIVED_EVENT_TAG,
  event::{CompletionReason, EventId, EventStatus, NewEvent, NewUpdate},
  policy::{ArchivePolicy, CompletedVisibility, DedupPolicy, LifecyclePolicy},
  store::{ArticleQuery, NewsStore},
};
use newswire_engine::{LiveFeed, Sweeper};
use newswire_store_sqlite::SqliteStore;

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 20, 18, 0, 0).unwrap() }

fn at(minutes: i64) -> DateTime<Utc> { t0() + TimeDelta::minutes(minutes) }

async fn store() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

fn sweeper(store: &Arc<SqliteStore>) -> Sweeper<SqliteStore> {
  Sweeper::new(
    store.clone(),
    LifecyclePolicy::default(),
    ArchivePolicy::default(),
    DedupPolicy::default(),
  )
  .expect("default policies are valid")
}

async fn event(
  s: &SqliteStore,
  name: &str,
  category: &str,
  start: i64,
) -> EventId {
  s.create_event(NewEvent::new(name, category, "").starting_at(at(start)))
    .await
    .unwrap()
    .event_id
}

/// A file-backed database, for scenarios that need to write rows the store
/// API refuses to create.
struct TempDb(PathBuf);

impl TempDb {
  fn new(tag: &str) -> Self {
    Self(std::env::temp_dir().join(format!(
      "newswire-{tag}-{}-{}.db",
      std::process::id(),
      Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )))
  }
}

impl Drop for TempDb {
  fn drop(&mut self) {
    for suffix in ["", "-wal", "-shm"] {
      let _ = std::fs::remove_file(format!("{}{suffix}", self.0.display()));
    }
  }
}

// ─── Lifecycle → archive ─────────────────────────────────────────────────────

#[tokio::test]
async fn football_match_completes_then_archives_after_grace() {
  let s = store().await;
  let sweeper = sweeper(&s);
  let feed = LiveFeed::new(s.clone(), ArchivePolicy::default());

  let id = s
    .create_event(NewEvent {
      description: "Premier League".into(),
      ..NewEvent::new("Match A - Live", "sports/football", "").starting_at(at(0))
    })
    .await
    .unwrap()
    .event_id;
  s.append_update(NewUpdate::new(id, at(2), "Kick-off")).await.unwrap();
  s.append_update(NewUpdate::new(id, at(145), "Full time: 2-1").titled("FT"))
    .await
    .unwrap();

  // T0+2h31m: past the 150-minute football ceiling.
  let report = sweeper.sweep_at(at(151)).await;
  assert!(report.is_clean(), "{report:?}");
  assert_eq!(report.lifecycle.completed, 1);
  assert_eq!(report.archive.articles_created, 0);

  let e = s.get_event(id).await.unwrap().unwrap();
  assert_eq!(e.status, EventStatus::Completed);
  assert_eq!(e.completion_reason, Some(CompletionReason::DurationExceeded));
  assert_eq!(e.completed_at, Some(at(151)));

  // During the grace window the event is hidden from live listings but
  // reported as recently completed.
  assert!(feed.list_live_at(None, at(153)).await.unwrap().is_empty());
  let recent = feed.list_recently_completed_at(None, at(153)).await.unwrap();
  assert_eq!(recent.len(), 1);
  assert_eq!(recent[0].event_id, id);

  // T0+2h36m: grace elapsed.
  let report = sweeper.sweep_at(at(156)).await;
  assert!(report.is_clean(), "{report:?}");
  assert_eq!(report.archive.articles_created, 1);
  assert_eq!(report.archive.events_purged, 1);

  assert!(s.get_event(id).await.unwrap().is_none());
  assert!(s.get_updates(id).await.unwrap().is_empty());

  let article = s.find_article_for_event(id).await.unwrap().unwrap();
  assert_eq!(article.title, "Match A");
  assert_eq!(article.body, "[18:02] Kick-off\n\n[20:25] FT\nFull time: 2-1");
  assert_eq!(article.summary.as_deref(), Some("Premier League"));
  assert_eq!(article.source_label, "Football News");
  assert_eq!(article.tags, ["sports", "football", ARCHIVED_EVENT_TAG]);
  assert_eq!(article.category.as_str(), "sports/football");
}

#[tokio::test]
async fn event_without_updates_archives_with_empty_body() {
  let s = store().await;
  let sweeper = sweeper(&s);
  let id = event(&s, "LIVE: Budget Speech", "government/speech", 0).await;

  // Quiet since start and past the minimum runtime.
  let report = sweeper.sweep_at(at(61)).await;
  assert_eq!(report.lifecycle.completed, 1);
  let e = s.get_event(id).await.unwrap().unwrap();
  assert_eq!(e.completion_reason, Some(CompletionReason::Inactive));

  let report = sweeper.sweep_at(at(66)).await;
  assert_eq!(report.archive.articles_created, 1);

  let article = s.find_article_for_event(id).await.unwrap().unwrap();
  assert_eq!(article.title, "Budget Speech");
  assert_eq!(article.body, "");
  assert_eq!(article.source_label, "Speech News");
}

#[tokio::test]
async fn active_event_within_ceiling_stays_live() {
  let s = store().await;
  let sweeper = sweeper(&s);
  let id = event(&s, "Open Final", "sports/tennis", 0).await;
  s.append_update(NewUpdate::new(id, at(230), "Fifth set")).await.unwrap();

  let report = sweeper.sweep_at(at(240)).await;
  assert_eq!(report.lifecycle.completed, 0);
  assert!(s.get_event(id).await.unwrap().unwrap().is_live());
}

// ─── Archiver ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn archiving_twice_yields_one_article() {
  let s = store().await;
  let sweeper = sweeper(&s);
  let id = event(&s, "Fed Rate Decision", "finance", 0).await;
  s.append_update(NewUpdate::new(id, at(5), "Rates held")).await.unwrap();
  assert!(
    s.mark_completed(id, 1, at(60), CompletionReason::Inactive)
      .await
      .unwrap()
  );

  let event = s.get_event(id).await.unwrap().unwrap();
  let updates = s.get_updates(id).await.unwrap();
  let archiver = sweeper.archiver();

  let (first, created) = archiver.create_article_from_event(&event, &updates).await.unwrap();
  assert!(created);
  let (second, created) = archiver.create_article_from_event(&event, &updates).await.unwrap();
  assert!(!created);
  assert_eq!(first.article_id, second.article_id);

  // The sweep reuses the article left behind and purges the event.
  let report = sweeper.sweep_at(at(70)).await;
  assert_eq!(report.archive.articles_created, 0);
  assert_eq!(report.archive.articles_reused, 1);
  assert_eq!(report.archive.events_purged, 1);

  let all = s.list_articles(&ArticleQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn late_update_is_refused_not_lost() {
  let s = store().await;
  let sweeper = sweeper(&s);
  let id = event(&s, "Match C", "sports/football", 0).await;
  s.append_update(NewUpdate::new(id, at(5), "first")).await.unwrap();
  s.mark_completed(id, 1, at(60), CompletionReason::Inactive).await.unwrap();

  let event = s.get_event(id).await.unwrap().unwrap();
  let updates = s.get_updates(id).await.unwrap();
  sweeper.archiver().create_article_from_event(&event, &updates).await.unwrap();

  // The sender is told the correction was not taken.
  let err = s
    .append_update(NewUpdate::new(id, at(61), "correction"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let report = sweeper.sweep_at(at(70)).await;
  assert_eq!(report.archive.articles_reused, 1);
  assert_eq!(report.archive.events_purged, 1);
  assert_eq!(report.archive.lost_races, 0);

  let article = s.find_article_for_event(id).await.unwrap().unwrap();
  assert!(article.body.contains("first"));
  assert!(!article.body.contains("correction"));
}

#[tokio::test]
async fn live_event_is_never_archived() {
  let s = store().await;
  let sweeper = sweeper(&s);
  let id = event(&s, "Match B", "sports/football", 0).await;
  let live = s.get_event(id).await.unwrap().unwrap();

  let err = sweeper
    .archiver()
    .create_article_from_event(&live, &[])
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert!(s.find_article_for_event(id).await.unwrap().is_none());
  assert!(s.get_event(id).await.unwrap().unwrap().is_live());
}

// ─── Dedup ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_names_collapse_to_latest_start() {
  let s = store().await;
  let sweeper = sweeper(&s);
  let older = event(&s, "Fed Rate Decision", "finance", 0).await;
  let newer = event(&s, "Fed Rate Decision", "finance", 60).await;

  let report = sweeper.sweep_at(at(61)).await;
  assert_eq!(report.dedup.duplicate_groups, 1);
  assert_eq!(report.dedup.events_removed, 1);

  assert!(s.get_event(older).await.unwrap().is_none());
  let kept = s.get_event(newer).await.unwrap().unwrap();
  assert!(kept.is_live());
  assert!(s.duplicate_live_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn orphan_updates_are_purged_without_error() {
  let db = TempDb::new("orphans");
  let s = Arc::new(SqliteStore::open(&db.0).await.unwrap());

  {
    let raw = rusqlite::Connection::open(&db.0).unwrap();
    raw
      .execute(
        "INSERT INTO event_updates (event_id, timestamp, content)
         VALUES (999, '2024-03-20T18:00:00.000000Z', 'stray')",
        [],
      )
      .unwrap();
  }

  let report = sweeper(&s).sweep_at(at(0)).await;
  assert!(report.is_clean(), "{report:?}");
  assert_eq!(report.dedup.orphans_purged, 1);
  assert!(s.get_updates(EventId(999)).await.unwrap().is_empty());
}

#[tokio::test]
async fn safety_ceiling_catches_stale_live_events() {
  let s = store().await;
  let sweeper = sweeper(&s);
  let stale = event(&s, "Forgotten Stream", "misc", -25 * 60).await;

  let report = sweeper.sweep_at(at(0)).await;
  assert_eq!(report.dedup.force_completed, 1);
  assert_eq!(report.lifecycle.completed, 0);

  let e = s.get_event(stale).await.unwrap().unwrap();
  assert_eq!(e.completion_reason, Some(CompletionReason::SafetyCeiling));
}

#[tokio::test]
async fn safety_ceiling_below_category_ceiling_is_rejected() {
  let s = store().await;
  let result = Sweeper::new(
    s,
    LifecyclePolicy::default(),
    ArchivePolicy::default(),
    DedupPolicy { safety_ceiling_minutes: 200 },
  );
  let err = result.err().expect("ceiling below tennis must be refused");
  assert_eq!(err.kind(), ErrorKind::Config);
}

// ─── Feed ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn labeled_visibility_keeps_completed_events_listed() {
  let s = store().await;
  let policy = ArchivePolicy {
    completed_visibility: CompletedVisibility::Labeled,
    ..Default::default()
  };
  let feed = LiveFeed::new(s.clone(), policy);

  let done = event(&s, "Match A", "sports/football", 0).await;
  let live = event(&s, "Match B", "sports/football", 30).await;
  let _other = event(&s, "Fed Rate Decision", "finance", 10).await;
  s.mark_completed(done, 0, at(151), CompletionReason::DurationExceeded)
    .await
    .unwrap();

  let listed = feed.list_live_at(Some("sports".into()), at(153)).await.unwrap();
  let ids: Vec<_> = listed.iter().map(|e| (e.event_id, e.status)).collect();
  assert_eq!(ids, [(live, EventStatus::Live), (done, EventStatus::Completed)]);

  // Outside the grace window it drops out again.
  let listed = feed.list_live_at(Some("sports".into()), at(157)).await.unwrap();
  assert_eq!(listed.len(), 1);
}
