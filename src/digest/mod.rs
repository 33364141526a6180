//! The digest pipeline: fetch, extract, aggregate, render, mark as read.
//!
//! Each stage lives in its own module:
//!
//! - [`extract`]: pull papers out of one alert message body
//! - [`aggregate`]: count mentions per distinct paper across messages
//! - [`render`]: produce the Markdown or HTML report
//! - [`mark_read`]: clear the unread marker on processed messages
//!
//! Per-message and per-entry problems are logged and counted; only a failed
//! fetch, a template failure or a broken output stream abort [`run`].

pub mod aggregate;
pub mod extract;
pub mod mark_read;
pub mod render;

pub use aggregate::{aggregate, Aggregate};
pub use extract::{extract_papers, normalize_url, ExtractError, UrlDecodeError, SCHOLAR_URL_PREFIX};
pub use mark_read::mark_read;
pub use render::{markdown_to_html, render, render_markdown, RenderError};

use chrono::Local;
use std::io::Write;

use crate::config::Config;
use crate::models::{Message, RunSummary};
use crate::sources::{MessageSource, SourceError};

/// Errors that end a run
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("failed to fetch messages: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the whole pipeline once and write the report to `out`.
pub async fn run<W: Write>(
    source: &dyn MessageSource,
    config: &Config,
    out: &mut W,
) -> Result<RunSummary, DigestError> {
    let label = &config.gmail.label;
    tracing::info!("Fetching unread messages labelled {:?} from {}", label, source.id());
    let messages = source.list_unread(label).await?;

    let aggregate = extract_all(&messages);
    let summary = RunSummary {
        generated_at: Local::now(),
        unread_emails: messages.len(),
        total_papers: aggregate.total_titles,
        unique_papers: aggregate.unique_titles(),
        error_count: aggregate.error_count,
    };

    let report = render(&summary, &aggregate, config.report.format)?;
    out.write_all(report.as_bytes())?;
    out.flush()?;

    if config.report.mark_read {
        let ids: Vec<String> = messages.iter().map(|m| m.id.clone()).collect();
        // already logged; the report is out, so the run still succeeds
        let _ = mark_read(source, &ids).await;
    }

    Ok(summary)
}

/// Extract every message and fold the results into one aggregate.
pub fn extract_all(messages: &[Message]) -> Aggregate {
    aggregate(messages.iter().map(|message| {
        let result = extract_papers(&message.body, &message.subject);
        if let Err(e) = &result {
            tracing::warn!("Skipping message {}: {}", message.id, e);
        }
        result
    }))
}

/// Write all mailbox label names to `out`.
pub async fn list_labels<W: Write>(
    source: &dyn MessageSource,
    out: &mut W,
) -> Result<(), DigestError> {
    let labels = source.list_labels().await?;
    if labels.is_empty() {
        writeln!(out, "No labels found.")?;
        return Ok(());
    }

    writeln!(out, "Labels:")?;
    for label in labels {
        writeln!(out, "- {}", label)?;
    }
    Ok(())
}
