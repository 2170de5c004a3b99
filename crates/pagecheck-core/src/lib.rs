//! # Pagecheck Core
//!
//! Shared, runtime-free logic for Pagecheck: page and annotation models,
//! the [`store::PageStore`] abstraction with an in-memory backend, the
//! fact-check rule table, and the structured rich-text formatting surface.
//!
//! This crate contains no tokio, sqlx, network, or filesystem dependencies.
//! Async traits return immediately-ready futures in the implementations
//! shipped here.

pub mod error;
pub mod factcheck;
pub mod format;
pub mod models;
pub mod store;
