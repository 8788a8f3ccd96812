//! Mail service error types.

use thiserror::Error;

/// Errors that can occur while talking to the mail service.
#[derive(Error, Debug)]
pub enum MailError {
    /// The request never produced a response.
    #[error("Mail request failed: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("Mail API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("Failed to decode mail response: {0}")]
    Decode(String),
}

impl MailError {
    /// True when the service rejected our credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, MailError::Api { status: 401 | 403, .. })
    }
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MailError::Decode(err.to_string())
        } else {
            MailError::Http(err.to_string())
        }
    }
}

/// Result type for mail operations.
pub type Result<T> = std::result::Result<T, MailError>;

/// Errors that can occur while composing or sending a reply.
#[derive(Error, Debug)]
pub enum ReplyError {
    /// The original message lacks a header the reply is built from.
    #[error("Original message has no '{0}' header")]
    MissingHeader(&'static str),

    #[error("Invalid address in '{header}' header: {reason}")]
    InvalidAddress {
        header: &'static str,
        reason: String,
    },

    #[error("Failed to build reply: {0}")]
    Build(String),

    #[error("Failed to send reply: {0}")]
    Send(#[from] MailError),
}
