//! Handlers for `/articles` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/articles` | Optional `?category=&archived=&limit=&offset=` |
//! | `GET`  | `/articles/{id}` | 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use newswire_core::{
  article::{Article, ArticleId},
  event::Category,
  store::{ArticleQuery, NewsStore},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub category: Option<String>,
  /// `true` for archived-event articles only, `false` for authored only.
  pub archived: Option<bool>,
  pub limit:    Option<usize>,
  pub offset:   Option<usize>,
}

/// `GET /articles`
pub async fn list<S: NewsStore>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Article>>, ApiError> {
  let query = ArticleQuery {
    category:      params.category.map(Category::from),
    archived_only: params.archived,
    limit:         params.limit,
    offset:        params.offset,
  };
  let articles = state
    .store
    .list_articles(&query)
    .await
    .map_err(ApiError::backend)?;
  Ok(Json(articles))
}

/// `GET /articles/{id}`
pub async fn get_one<S: NewsStore>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<ArticleId>,
) -> Result<Json<Article>, ApiError> {
  let article = state
    .store
    .get_article(id)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound(format!("article {id} not found")))?;
  Ok(Json(article))
}
