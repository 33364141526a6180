//! Clearing the unread marker once the digest has been produced.

use crate::sources::{MessageSource, SourceError};

/// Mark all given messages as read in one batch request.
///
/// Best effort: a failure is logged and returned, but the caller is not
/// expected to abort because the report already went out.
pub async fn mark_read(source: &dyn MessageSource, ids: &[String]) -> Result<(), SourceError> {
    if ids.is_empty() {
        tracing::debug!("No messages to mark as read");
        return Ok(());
    }

    match source.batch_clear_unread(ids).await {
        Ok(()) => {
            tracing::info!("Marked {} messages as read", ids.len());
            Ok(())
        }
        Err(e) => {
            tracing::warn!(
                "Failed to remove the UNREAD label from {} messages: {}",
                ids.len(),
                e
            );
            Err(e)
        }
    }
}
