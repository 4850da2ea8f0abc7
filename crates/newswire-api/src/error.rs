//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use newswire_core::{Classify, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A store or engine failure, carried with its classification.
  #[error("{source}")]
  Backend {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  pub fn backend<E>(err: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self::Backend { kind: err.kind(), source: Box::new(err) }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Backend { kind, source } => {
        let status = match kind {
          ErrorKind::NotFound => StatusCode::NOT_FOUND,
          ErrorKind::Validation => StatusCode::BAD_REQUEST,
          ErrorKind::Storage | ErrorKind::InvariantViolation | ErrorKind::Config => {
            tracing::error!(%kind, error = %source, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
          }
        };
        (status, source.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
