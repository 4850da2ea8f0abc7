//! Error types for `newswire-core`.

use thiserror::Error;

use crate::{article::ArticleId, event::EventId};

/// The coarse class of a failure, used by the sweeps to decide how loudly to
/// log and whether to keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  /// Malformed input; callers fall back to a conservative default.
  Validation,
  /// The target row is gone, usually because a concurrent sweep removed it.
  NotFound,
  /// A (possibly transient) persistence failure; retried on the next tick.
  Storage,
  /// Downstream state contradicts an invariant that a sweep should maintain.
  InvariantViolation,
  /// The store or the policy is unusable as configured.
  Config,
}

/// Implemented by every error that can surface from a sweep.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("event not found: {0}")]
  EventNotFound(EventId),

  #[error("article not found: {0}")]
  ArticleNotFound(ArticleId),

  #[error("event {0} is not completed")]
  NotCompleted(EventId),

  #[error("unknown event status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown completion reason: {0:?}")]
  UnknownCompletionReason(String),

  #[error("invalid policy: {0}")]
  InvalidPolicy(String),

  #[error("time window out of range: {0}")]
  WindowOutOfRange(String),

  #[error("invariant violated: {0}")]
  Invariant(String),
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::EventNotFound(_) | Self::ArticleNotFound(_) => ErrorKind::NotFound,
      Self::NotCompleted(_)
      | Self::UnknownStatus(_)
      | Self::UnknownCompletionReason(_)
      | Self::WindowOutOfRange(_) => ErrorKind::Validation,
      Self::InvalidPolicy(_) => ErrorKind::Config,
      Self::Invariant(_) => ErrorKind::InvariantViolation,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
