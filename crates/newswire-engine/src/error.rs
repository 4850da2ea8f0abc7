//! Error type for `newswire-engine`.

use newswire_core::{Classify, ErrorKind, event::EventId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  /// A policy or composition rule rejected the input.
  #[error(transparent)]
  Core(#[from] newswire_core::Error),

  /// A backend failure, boxed together with its kind.
  #[error("store error: {source}")]
  Store {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl EngineError {
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self::Store { kind: err.kind(), source: Box::new(err) }
  }
}

impl Classify for EngineError {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::Store { kind, .. } => *kind,
    }
  }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Log a per-event failure at a level matching its kind and move on.
///
/// A missing row means another sweep (or an operator) got there first, so it
/// is only worth a debug line.
pub(crate) fn log_event_failure<E>(stage: &'static str, event_id: EventId, err: &E)
where
  E: std::error::Error + Classify,
{
  let kind = err.kind();
  match kind {
    ErrorKind::NotFound => {
      tracing::debug!(stage, %event_id, %kind, error = %err, "event vanished mid-sweep")
    }
    ErrorKind::InvariantViolation | ErrorKind::Config => {
      tracing::error!(stage, %event_id, %kind, error = %err, "sweep step failed")
    }
    ErrorKind::Validation | ErrorKind::Storage => {
      tracing::warn!(stage, %event_id, %kind, error = %err, "sweep step failed; retrying next tick")
    }
  }
}
