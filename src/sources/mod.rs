//! Message sources: where unread alert messages come from.
//!
//! This module defines the [`MessageSource`] trait the digest pipeline talks to.
//! [`GmailSource`] implements it on top of the Gmail v1 REST API and
//! [`MockSource`] keeps everything in memory for tests.
//!
//! Authentication and transport are the source's business; the pipeline only
//! needs three calls: list the unread messages under a label, clear the unread
//! marker on a batch of messages and, for diagnostics, list all labels.

mod gmail;
pub mod mock;

pub use gmail::GmailSource;
pub use mock::MockSource;

use crate::models::Message;
use async_trait::async_trait;

/// The MessageSource trait defines the interface to a mailbox.
#[async_trait]
pub trait MessageSource: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g., "gmail")
    fn id(&self) -> &str;

    /// Fetch every unread message carrying the given label, bodies included
    async fn list_unread(&self, label: &str) -> Result<Vec<Message>, SourceError>;

    /// Remove the unread marker from all given messages in one request
    async fn batch_clear_unread(&self, ids: &[String]) -> Result<(), SourceError>;

    /// Names of all labels in the mailbox
    async fn list_labels(&self) -> Result<Vec<String>, SourceError>;
}

/// Errors that can occur when interacting with a message source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The client could not be set up (missing credentials, bad settings)
    #[error("Client initialization failed: {0}")]
    Auth(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (JSON, base64, ...)
    #[error("Parse error: {0}")]
    Parse(String),

    /// API error from the provider
    #[error("API error: {0}")]
    Api(String),
}
