use thiserror::Error;

/// Errors from the document sync service.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync request failed: {0}")]
    Http(String),

    #[error("Sync API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Registration or token refresh was refused.
    #[error("Sync service rejected the device: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
