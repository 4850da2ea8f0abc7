//! JSON REST API for Newswire.
//!
//! Exposes an axum [`Router`] over any [`newswire_core::store::NewsStore`]:
//! ingestion of events and updates, the live feed, archived articles and an
//! on-demand sweep. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", newswire_api::api_router(state))
//! ```

pub mod articles;
pub mod error;
pub mod events;
pub mod live;
pub mod sweeps;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use newswire_core::store::NewsStore;
use newswire_engine::{LiveFeed, Sweeper};

pub use error::ApiError;

/// Everything the handlers need, shared behind one `Arc`.
pub struct ApiState<S> {
  pub store:   Arc<S>,
  pub feed:    LiveFeed<S>,
  pub sweeper: Arc<Sweeper<S>>,
}

/// Build a fully-materialised API router over `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: Arc<ApiState<S>>) -> Router<()>
where
  S: NewsStore + 'static,
{
  Router::new()
    // Ingestion
    .route("/events", get(events::list::<S>).post(events::create::<S>))
    .route("/events/{id}", get(events::get_one::<S>))
    .route(
      "/events/{id}/updates",
      get(events::list_updates::<S>).post(events::append_update::<S>),
    )
    // Presentation
    .route("/live", get(live::list_live::<S>))
    .route("/live/recently-completed", get(live::recently_completed::<S>))
    .route("/articles", get(articles::list::<S>))
    .route("/articles/{id}", get(articles::get_one::<S>))
    // Maintenance
    .route("/sweeps", post(sweeps::run::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
