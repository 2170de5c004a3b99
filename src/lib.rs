//! # Pagecheck
//!
//! A page editor backend with fact-check annotations.
//!
//! Pages are JSON blobs (`{html, text, annotations}`) persisted under a
//! generated id. An [`EditorSession`] loads a page, collects fact-check and
//! comment annotations on selected text, and writes the page back on
//! explicit save or after a debounced quiet interval.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐  PageStore  ┌──────────────┐  HTTP  ┌──────────────┐
//! │ EditorSession │────────────▶│ HttpPageStore│───────▶│  server      │
//! │  + Debouncer  │             └──────────────┘        │  (axum)      │
//! └──────┬────────┘                                     └──────┬───────┘
//!        │ FactChecker                                         │ PageStore
//!        ▼                                                     ▼
//! ┌───────────────┐                                     ┌──────────────┐
//! │ stub / http   │                                     │ SQLite pages │
//! └───────────────┘                                     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pagecheck init                               # create database
//! pagecheck serve                              # start HTTP server
//! pagecheck page create --content '{"html":"<p>The moon is a square.</p>"}'
//! pagecheck annotate <id> "The moon is a square."
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`server`] | Page store HTTP API |
//! | [`sqlite_store`] | SQLite page store |
//! | [`client`] | HTTP page store client |
//! | [`factcheck`] | Stub and HTTP fact checkers |
//! | [`session`] | Editor session controller |
//! | [`autosave`] | Debounced task scheduling |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod autosave;
pub mod check_cmd;
pub mod client;
pub mod config;
pub mod db;
pub mod factcheck;
pub mod migrate;
pub mod page_cmd;
pub mod server;
pub mod session;
pub mod sqlite_store;

pub use pagecheck_core::{error, format, models, store};
pub use session::{EditorSession, SessionError, SessionOptions};
