//! Credential acquisition for the mail and document services.
//!
//! Authorizers own the whole login flow: reading cached tokens, refreshing
//! them, and falling back to an interactive step through an [`OperatorPrompt`].
//! The poller only ever asks them for a ready client.

pub mod error;
pub mod google;
pub mod prompt;
pub mod remarkable;
pub mod store;

use async_trait::async_trait;

use crate::mail::MailService;
use crate::sync::DocumentSync;

pub use error::AuthError;
pub use google::{GoogleAuthorizer, OAuthClient, StoredMailToken, GMAIL_SCOPE};
pub use prompt::{OperatorPrompt, StdinPrompt};
pub use remarkable::RemarkableAuthorizer;

/// Produces an authorized mail client.
#[async_trait]
pub trait MailAuthorizer: Send + Sync {
    async fn authorize(&self) -> error::Result<Box<dyn MailService>>;

    /// Called after the service rejected the current credentials; cached
    /// access tokens must not be reused.
    async fn reauthorize(&self) -> error::Result<Box<dyn MailService>> {
        self.authorize().await
    }
}

/// Produces an authorized document sync client.
#[async_trait]
pub trait SyncAuthorizer: Send + Sync {
    async fn authorize(&self) -> error::Result<Box<dyn DocumentSync>>;
}
