//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{TimeDelta, Utc};
use newswire_core::{
  event::{CompletionReason, NewEvent},
  policy::{ArchivePolicy, DedupPolicy, LifecyclePolicy},
  store::NewsStore,
};
use newswire_engine::{LiveFeed, Sweeper};
use newswire_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{ApiState, api_router};

async fn make_state() -> Arc<ApiState<SqliteStore>> {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let sweeper = Sweeper::new(
    store.clone(),
    LifecyclePolicy::default(),
    ArchivePolicy::default(),
    DedupPolicy::default(),
  )
  .unwrap();
  Arc::new(ApiState {
    feed: LiveFeed::new(store.clone(), ArchivePolicy::default()),
    sweeper: Arc::new(sweeper),
    store,
  })
}

fn router(state: &Arc<ApiState<SqliteStore>>) -> Router { api_router(state.clone()) }

async fn send(
  state: &Arc<ApiState<SqliteStore>>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = router(state).oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

// ── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_event() {
  let state = make_state().await;
  let (status, created) = send(
    &state,
    "POST",
    "/events",
    Some(json!({ "name": "Match A", "category": "Sports/Football" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["status"], "live");
  assert_eq!(created["category"], "sports/football");

  let id = created["event_id"].as_i64().unwrap();
  let (status, fetched) = send(&state, "GET", &format!("/events/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched["name"], "Match A");
}

#[tokio::test]
async fn blank_event_name_is_rejected() {
  let state = make_state().await;
  let (status, body) = send(
    &state,
    "POST",
    "/events",
    Some(json!({ "name": "  ", "category": "news" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn missing_event_is_404() {
  let state = make_state().await;
  let (status, body) = send(&state, "GET", "/events/4242", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn append_and_list_updates() {
  let state = make_state().await;
  let event = state
    .store
    .create_event(NewEvent::new("Fed Rate Decision", "finance", ""))
    .await
    .unwrap();
  let uri = format!("/events/{}/updates", event.event_id);

  let (status, update) = send(
    &state,
    "POST",
    &uri,
    Some(json!({ "title": "Decision", "content": "Rates held at 5.25%" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(update["importance"], 0.5);

  let (status, updates) = send(&state, "GET", &uri, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updates.as_array().unwrap().len(), 1);
  assert_eq!(updates[0]["content"], "Rates held at 5.25%");
}

#[tokio::test]
async fn append_to_missing_event_is_404() {
  let state = make_state().await;
  let (status, _) = send(
    &state,
    "POST",
    "/events/999/updates",
    Some(json!({ "content": "stray" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn out_of_range_importance_is_rejected() {
  let state = make_state().await;
  let event = state
    .store
    .create_event(NewEvent::new("Match A", "sports", ""))
    .await
    .unwrap();
  let (status, _) = send(
    &state,
    "POST",
    &format!("/events/{}/updates", event.event_id),
    Some(json!({ "content": "x", "importance": 3.0 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_events_by_text() {
  let state = make_state().await;
  state.store.create_event(NewEvent::new("Match A", "sports", "")).await.unwrap();
  state
    .store
    .create_event(NewEvent::new("Budget Speech", "government", "annual budget"))
    .await
    .unwrap();

  let (status, found) = send(&state, "GET", "/events?q=budget&status=live", None).await;
  assert_eq!(status, StatusCode::OK);
  let found = found.as_array().unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0]["name"], "Budget Speech");
}

// ── Live feed ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn completed_events_leave_the_live_feed() {
  let state = make_state().await;
  let done = state
    .store
    .create_event(NewEvent::new("Match A", "sports/football", ""))
    .await
    .unwrap();
  state
    .store
    .create_event(NewEvent::new("Match B", "sports/football", ""))
    .await
    .unwrap();
  state
    .store
    .mark_completed(done.event_id, 0, Utc::now(), CompletionReason::DurationExceeded)
    .await
    .unwrap();

  let (status, live) = send(&state, "GET", "/live?category=sports", None).await;
  assert_eq!(status, StatusCode::OK);
  let live = live.as_array().unwrap();
  assert_eq!(live.len(), 1);
  assert_eq!(live[0]["name"], "Match B");

  let (status, recent) = send(&state, "GET", "/live/recently-completed", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(recent[0]["name"], "Match A");
  assert_eq!(recent[0]["completion_reason"], "duration_exceeded");

  let (status, _) = send(&state, "GET", "/live/recently-completed?within_minutes=0", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreachable_completion_window_is_rejected() {
  let state = make_state().await;
  let (status, body) = send(
    &state,
    "GET",
    "/live/recently-completed?within_minutes=100000000000000",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("out of range"));
}

#[tokio::test]
async fn append_to_completed_event_is_rejected() {
  let state = make_state().await;
  let event = state
    .store
    .create_event(NewEvent::new("Match A", "sports", ""))
    .await
    .unwrap();
  state
    .store
    .mark_completed(event.event_id, 0, Utc::now(), CompletionReason::Inactive)
    .await
    .unwrap();

  let (status, _) = send(
    &state,
    "POST",
    &format!("/events/{}/updates", event.event_id),
    Some(json!({ "content": "late" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Sweeps & articles ───────────────────────────────────────────────────────

#[tokio::test]
async fn sweep_archives_into_articles() {
  let state = make_state().await;
  let start = Utc::now() - TimeDelta::minutes(200);
  let event = state
    .store
    .create_event(NewEvent::new("LIVE: Match A", "sports/football", "").starting_at(start))
    .await
    .unwrap();
  // Completed well before the grace window.
  state
    .store
    .mark_completed(
      event.event_id,
      0,
      start + TimeDelta::minutes(151),
      CompletionReason::DurationExceeded,
    )
    .await
    .unwrap();

  let (status, report) = send(&state, "POST", "/sweeps", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["archive"]["articles_created"], 1);
  assert_eq!(report["archive"]["events_purged"], 1);

  let (status, articles) = send(&state, "GET", "/articles?archived=true", None).await;
  assert_eq!(status, StatusCode::OK);
  let articles = articles.as_array().unwrap();
  assert_eq!(articles.len(), 1);
  assert_eq!(articles[0]["title"], "Match A");
  assert_eq!(articles[0]["origin"]["kind"], "archived_event");

  let id = articles[0]["article_id"].as_i64().unwrap();
  let (status, article) = send(&state, "GET", &format!("/articles/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(article["source_label"], "Football News");

  let (status, _) = send(&state, "GET", "/articles/777", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
