//! Document sync service access.

pub mod client;
pub mod error;

pub use client::{DocumentSync, RemarkableAuthApi, RemarkableClient};
pub use error::SyncError;
