//! Core data models for alert messages, papers and run summaries.

mod message;
mod paper;
mod summary;

pub use message::Message;
pub use paper::{split_first_line, Abstract, Paper, FIRST_LINE_CHARS};
pub use summary::RunSummary;
