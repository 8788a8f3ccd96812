use std::path::PathBuf;
use thiserror::Error;

use crate::auth::AuthError;
use crate::mail::MailError;
use crate::sync::SyncError;

#[derive(Error, Debug)]
pub enum MailpaperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("Mail service error: {0}")]
    Mail(#[from] MailError),

    #[error("Sync service error: {0}")]
    Sync(#[from] SyncError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum ConvertError {
    /// Sniffing found nothing, or a type outside every allow-list.
    #[error("Unsupported File Type")]
    UnsupportedFileType,

    #[error("Failed to process image: {0}")]
    ImageProcessing(String),

    #[error("Failed to build PDF: {0}")]
    PdfProcessing(String),

    #[error("Office document conversion failed: {0}")]
    Office(String),

    #[error("Office document conversion timed out after {0}s")]
    OfficeTimeout(u64),

    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MailpaperError>;
