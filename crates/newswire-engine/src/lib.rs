//! Maintenance sweeps for Newswire live events.
//!
//! Three engines act on a shared [`newswire_core::store::NewsStore`]:
//!
//! - [`lifecycle::LifecycleEngine`] flips live events to completed.
//! - [`archiver::Archiver`] turns completed events into articles and purges
//!   the source rows once the grace window has passed.
//! - [`dedup::Deduplicator`] collapses same-named live events, purges orphan
//!   updates and force-completes anything past the safety ceiling.
//!
//! [`scheduler::Sweeper`] runs them in order on a timer. [`feed::LiveFeed`]
//! answers the presentation queries.

pub mod archiver;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod lifecycle;
pub mod scheduler;

pub use archiver::{ArchiveSummary, Archiver};
pub use dedup::{DedupSummary, Deduplicator};
pub use error::{EngineError, Result};
pub use feed::LiveFeed;
pub use lifecycle::{LifecycleEngine, LifecycleSummary};
pub use scheduler::{SweepReport, Sweeper};
