//! An unread alert message as handed over by a message source.

/// A single mail message with its decoded HTML body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Provider message id, used to clear the unread marker later
    pub id: String,

    /// Subject header, empty when missing
    pub subject: String,

    /// Raw HTML body bytes; empty when the message carried no HTML part
    pub body: Vec<u8>,
}

impl Message {
    /// Create a new message
    pub fn new(id: impl Into<String>, subject: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}
