//! Error type for `newswire-store-sqlite`.

use newswire_core::{Classify, ErrorKind, event::EventId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] newswire_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to attach an update to an event that does not exist.
  #[error("event not found: {0}")]
  EventNotFound(EventId),

  /// Updates are only accepted while an event is live.
  #[error("event {0} is no longer live")]
  EventClosed(EventId),

  #[error("database schema version {found} is newer than supported ({supported})")]
  UnsupportedSchemaVersion { found: i64, supported: i64 },
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::Database(_) => ErrorKind::Storage,
      Self::Json(_) | Self::DateParse(_) => ErrorKind::Validation,
      Self::EventNotFound(_) => ErrorKind::NotFound,
      Self::EventClosed(_) => ErrorKind::Validation,
      Self::UnsupportedSchemaVersion { .. } => ErrorKind::Config,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
