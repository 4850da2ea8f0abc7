//! Core types and trait definitions for the Newswire live-event pipeline.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the domain model, the error taxonomy, the [`store::NewsStore`] abstraction
//! and the pure policies (lifecycle rules, article composition, canonical
//! selection) that the sweep engines apply.

pub mod archive;
pub mod article;
pub mod dedup;
pub mod error;
pub mod event;
pub mod policy;
pub mod store;

pub use error::{Classify, Error, ErrorKind, Result};
