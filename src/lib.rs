//! # Scholar Digest
//!
//! Aggregates unread Google Scholar alert emails from Gmail into a single
//! digest of paper links, counting how often each paper was recommended.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Paper, Message, RunSummary)
//! - [`sources`]: Mailbox access behind the [`MessageSource`] trait
//! - [`digest`]: Extraction, aggregation, rendering and mark-as-read
//! - [`utils`]: HTTP client
//! - [`config`]: Configuration management

pub mod config;
pub mod digest;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::Paper;
pub use sources::{GmailSource, MessageSource};
