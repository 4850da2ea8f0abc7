//! Handlers for `/events` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/events` | Optional `?status=&category=&q=&limit=` |
//! | `POST` | `/events` | Body: [`NewEvent`] |
//! | `GET`  | `/events/{id}` | 404 if not found |
//! | `GET`  | `/events/{id}/updates` | Oldest first; 404 if the event is gone |
//! | `POST` | `/events/{id}/updates` | Body: [`AppendBody`]; 404 if the event is gone, 400 once completed |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use newswire_core::{
  event::{Category, EventId, EventStatus, EventUpdate, LiveEvent, NewEvent, NewUpdate},
  store::{EventQuery, NewsStore},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status:   Option<EventStatus>,
  pub category: Option<String>,
  /// Free text matched against name and description.
  pub q:        Option<String>,
  pub limit:    Option<usize>,
}

/// `GET /events`
pub async fn list<S: NewsStore>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<LiveEvent>>, ApiError> {
  let query = EventQuery {
    status: params.status,
    category: params.category.map(Category::from),
    text: params.q,
    limit: params.limit,
    ..Default::default()
  };
  let events = state
    .store
    .list_events(&query)
    .await
    .map_err(ApiError::backend)?;
  Ok(Json(events))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /events`
pub async fn create<S: NewsStore>(
  State(state): State<Arc<ApiState<S>>>,
  Json(body): Json<NewEvent>,
) -> Result<impl IntoResponse, ApiError> {
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("event name must not be empty".into()));
  }
  if let (Some(start), Some(end)) = (body.start_time, body.scheduled_end)
    && end < start
  {
    return Err(ApiError::BadRequest("scheduled_end precedes start_time".into()));
  }
  if body.category.is_blank() {
    tracing::debug!(name = %body.name, "event has no category; default policy applies");
  }

  let event = state
    .store
    .create_event(body)
    .await
    .map_err(ApiError::backend)?;
  tracing::info!(event_id = %event.event_id, name = %event.name, "event created");
  Ok((StatusCode::CREATED, Json(event)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /events/{id}`
pub async fn get_one<S: NewsStore>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<EventId>,
) -> Result<Json<LiveEvent>, ApiError> {
  let event = state
    .store
    .get_event(id)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;
  Ok(Json(event))
}

// ─── Updates ──────────────────────────────────────────────────────────────────

/// `GET /events/{id}/updates`
pub async fn list_updates<S: NewsStore>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<EventId>,
) -> Result<Json<Vec<EventUpdate>>, ApiError> {
  state
    .store
    .get_event(id)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;

  let updates = state
    .store
    .get_updates(id)
    .await
    .map_err(ApiError::backend)?;
  Ok(Json(updates))
}

#[derive(Debug, Deserialize)]
pub struct AppendBody {
  /// Defaults to the time of receipt.
  pub timestamp:  Option<DateTime<Utc>>,
  pub title:      Option<String>,
  pub content:    String,
  pub importance: Option<f64>,
}

/// `POST /events/{id}/updates`
pub async fn append_update<S: NewsStore>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<EventId>,
  Json(body): Json<AppendBody>,
) -> Result<impl IntoResponse, ApiError> {
  let importance = body.importance.unwrap_or(NewUpdate::DEFAULT_IMPORTANCE);
  if !(0.0..=1.0).contains(&importance) {
    return Err(ApiError::BadRequest(format!(
      "importance must be within 0.0..=1.0, got {importance}"
    )));
  }

  let update = state
    .store
    .append_update(NewUpdate {
      event_id: id,
      timestamp: body.timestamp.unwrap_or_else(Utc::now),
      title: body.title,
      content: body.content,
      importance,
    })
    .await
    .map_err(ApiError::backend)?;
  Ok((StatusCode::CREATED, Json(update)))
}
