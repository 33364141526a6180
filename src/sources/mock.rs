//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::Message;
use crate::sources::{MessageSource, SourceError};

/// A mock mailbox that returns predefined messages and records mark-read calls.
#[derive(Debug, Default)]
pub struct MockSource {
    messages: Mutex<Vec<Message>>,
    labels: Mutex<Vec<String>>,
    fail_mark_read: Mutex<bool>,
    cleared: Mutex<Vec<Vec<String>>>,
}

impl MockSource {
    /// Create a new, empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source holding the given unread messages.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        let source = Self::new();
        source.set_messages(messages);
        source
    }

    /// Set the unread messages to return.
    pub fn set_messages(&self, messages: Vec<Message>) {
        let mut guard = self.messages.lock().unwrap();
        *guard = messages;
    }

    /// Set the label names to return.
    pub fn set_labels(&self, labels: Vec<String>) {
        let mut guard = self.labels.lock().unwrap();
        *guard = labels;
    }

    /// Make every following mark-read call fail.
    pub fn fail_mark_read(&self, fail: bool) {
        let mut guard = self.fail_mark_read.lock().unwrap();
        *guard = fail;
    }

    /// Id batches passed to successful mark-read calls, oldest first.
    pub fn cleared_batches(&self) -> Vec<Vec<String>> {
        self.cleared.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSource for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    async fn list_unread(&self, _label: &str) -> Result<Vec<Message>, SourceError> {
        let guard = self.messages.lock().unwrap();
        Ok(guard.clone())
    }

    async fn batch_clear_unread(&self, ids: &[String]) -> Result<(), SourceError> {
        if *self.fail_mark_read.lock().unwrap() {
            return Err(SourceError::Api("batchModify rejected".to_string()));
        }
        self.cleared.lock().unwrap().push(ids.to_vec());
        Ok(())
    }

    async fn list_labels(&self) -> Result<Vec<String>, SourceError> {
        let guard = self.labels.lock().unwrap();
        Ok(guard.clone())
    }
}

/// Helper function to create an alert-like message for testing.
///
/// Each `(title, url)` pair becomes an `h3 > a` entry followed by an author
/// line and an abstract `div`, the way Scholar alert emails are laid out.
pub fn make_alert_message(id: &str, entries: &[(&str, &str)]) -> Message {
    let mut body = String::from("<html><body>");
    for (title, url) in entries {
        body.push_str(&format!(
            "<h3><a href=\"http://scholar.google.com/scholar_url?url={}&amp;hl=en&amp;oi=scholaralrt\">{}</a></h3>\
             <div>Some Author - Journal, 2019</div>\
             <div>Abstract of {}</div>",
            urlencoding::encode(url),
            title,
            title
        ));
    }
    body.push_str("</body></html>");
    Message::new(id, format!("Alert {}", id), body)
}
