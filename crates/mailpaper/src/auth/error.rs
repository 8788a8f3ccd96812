//! Authorization error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::mail::MailError;
use crate::sync::SyncError;

/// Errors that can occur while loading or acquiring credentials.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The OAuth client file could not be read.
    #[error("Failed to read client config '{path}': {source}")]
    ClientConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OAuth client file was read but is not usable.
    #[error("Invalid client config '{path}': {reason}")]
    InvalidClientConfig { path: PathBuf, reason: String },

    /// A cached token file is missing or unreadable.
    #[error("Failed to read token '{path}': {reason}")]
    TokenRead { path: PathBuf, reason: String },

    #[error("Failed to write token '{path}': {source}")]
    TokenWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The operator could not be asked, or gave no answer.
    #[error("Operator prompt failed: {0}")]
    Prompt(String),

    /// Code exchange or refresh at the OAuth token endpoint failed.
    #[error("OAuth2 token request failed: {0}")]
    TokenExchange(String),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl AuthError {
    /// Errors that re-running authorization cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AuthError::ClientConfig { .. } | AuthError::InvalidClientConfig { .. }
        )
    }
}

/// Result type for authorization.
pub type Result<T> = std::result::Result<T, AuthError>;
