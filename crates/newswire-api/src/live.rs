//! Handlers for the live feed.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/live` | Optional `?category=`; completed events per the visibility policy |
//! | `GET`  | `/live/recently-completed` | Optional `?within_minutes=`, default the archive grace |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::TimeDelta;
use newswire_core::{
  event::{Category, LiveEvent},
  store::NewsStore,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LiveParams {
  pub category: Option<String>,
}

/// `GET /live`
pub async fn list_live<S: NewsStore>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<LiveParams>,
) -> Result<Json<Vec<LiveEvent>>, ApiError> {
  let events = state
    .feed
    .list_live(params.category.map(Category::from))
    .await
    .map_err(ApiError::backend)?;
  Ok(Json(events))
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
  pub within_minutes: Option<i64>,
}

/// `GET /live/recently-completed`
pub async fn recently_completed<S: NewsStore>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<RecentParams>,
) -> Result<Json<Vec<LiveEvent>>, ApiError> {
  let within = match params.within_minutes {
    Some(m) if m <= 0 => {
      return Err(ApiError::BadRequest("within_minutes must be positive".into()));
    }
    Some(m) => Some(
      TimeDelta::try_minutes(m)
        .ok_or_else(|| ApiError::BadRequest(format!("within_minutes out of range: {m}")))?,
    ),
    None => None,
  };

  let events = state
    .feed
    .list_recently_completed(within)
    .await
    .map_err(ApiError::backend)?;
  Ok(Json(events))
}
