//! reMarkable device pairing.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use secrecy::SecretString;

use super::error::Result;
use super::prompt::OperatorPrompt;
use super::store;
use super::SyncAuthorizer;
use crate::config::{Config, RemarkableConfig};
use crate::sync::{DocumentSync, RemarkableAuthApi, RemarkableClient};

/// Resumes a stored device pairing, or pairs anew with an operator-supplied code.
pub struct RemarkableAuthorizer {
    token_path: PathBuf,
    remarkable: RemarkableConfig,
    prompt: Arc<dyn OperatorPrompt>,
    api: RemarkableAuthApi,
}

impl RemarkableAuthorizer {
    pub fn new(config: &Config, prompt: Arc<dyn OperatorPrompt>) -> Result<Self> {
        Ok(Self {
            token_path: config.remarkable_token_path.clone(),
            remarkable: config.remarkable.clone(),
            prompt,
            api: RemarkableAuthApi::new(&config.remarkable)?,
        })
    }

    /// Returns a fresh user token, pairing the device first if needed.
    pub async fn obtain_user_token(&self) -> Result<SecretString> {
        match self.resume().await {
            Ok(token) => Ok(token),
            Err(e) => {
                warn!("Stored reMarkable pairing unusable, pairing again: {}", e);
                self.pair().await
            }
        }
    }

    async fn resume(&self) -> Result<SecretString> {
        let device_token = store::read_secret(&self.token_path).await?;
        Ok(self.api.refresh_user_token(&device_token).await?)
    }

    async fn pair(&self) -> Result<SecretString> {
        let code = self
            .prompt
            .ask(
                &format!(
                    "Please visit this URL and generate a code: {}",
                    self.remarkable.pairing_url
                ),
                "Please enter the code here: ",
            )
            .await?;

        let device_token = self.api.register_device(&code).await?;
        store::write_secret(&self.token_path, &device_token).await?;
        info!("Device token stored in {}", self.token_path.display());

        Ok(self.api.refresh_user_token(&device_token).await?)
    }
}

#[async_trait]
impl SyncAuthorizer for RemarkableAuthorizer {
    async fn authorize(&self) -> Result<Box<dyn DocumentSync>> {
        let user_token = self.obtain_user_token().await?;
        let client = RemarkableClient::new(user_token, &self.remarkable)?;
        Ok(Box::new(client))
    }
}
