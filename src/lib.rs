//! Browsing-interaction tracking and page annotations for the MindCache extension.
//!
//! MindCache passively records meaningful browsing interactions (clicks,
//! scrolls, selections, visits), rolls them up into periodic summaries, and
//! keeps user-authored highlights, notes, and quotes tied to the pages they
//! were made on.
//!
//! # Architecture
//!
//! - **Storage**: a flat key → JSON namespace ([`storage::Storage`]) backed by
//!   SQLite or memory, with change notifications
//! - **Background**: a single task that owns every write to the interaction
//!   log, summaries, settings, and annotation collections
//! - **Content**: a per-page [`content::ContentContext`] that classifies raw
//!   events and sends them to the background without waiting
//! - **Transport**: the message contract over an mpsc queue in-process, or
//!   `POST /message` over HTTP
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, and health checks
//! - [`storage`]: Key/value storage trait, backends, and async front
//! - [`tracking`]: Event classifier, interaction log, summarizer, settings, stats, analytics
//! - [`annotations`]: Highlight/note/quote collections, counts, and export
//! - [`anchoring`]: Re-placing highlight markers on a reloaded page
//! - [`badge`]: Per-domain counts on the toolbar badge
//! - [`background`]: The single-writer background service and its message contract
//! - [`content`]: Per-page tracking context
//! - [`backup`]: Full backup and restore
//! - [`server`]: HTTP surface

pub mod anchoring;
pub mod annotations;
pub mod background;
pub mod backup;
pub mod badge;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod server;
pub mod storage;
pub mod tracking;
