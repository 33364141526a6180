//! Per-run counters shown in the digest header.

use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use std::fmt::Display;

/// Counts gathered during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// When the digest was generated
    pub generated_at: DateTime<Local>,

    /// Number of unread messages fetched
    pub unread_emails: usize,

    /// Paper mentions across all messages, duplicates included
    pub total_papers: usize,

    /// Distinct papers after deduplication
    pub unique_papers: usize,

    /// Messages that could not be extracted
    pub error_count: usize,
}

impl RunSummary {
    /// Timestamp in RFC 3339 with second precision.
    pub fn date(&self) -> String {
        rfc3339(&self.generated_at)
    }
}

/// RFC 3339 with second precision; a zero offset is written as `Z`.
fn rfc3339<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
