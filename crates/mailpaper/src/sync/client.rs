//! reMarkable cloud client.
//!
//! A paired device holds a long-lived device token. Each session exchanges it
//! for a short-lived user token, which authorizes uploads.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::error::{Result, SyncError};
use crate::config::RemarkableConfig;
use crate::http::{create_http_client, truncate_body};

/// Destination for converted PDFs.
#[async_trait]
pub trait DocumentSync: Send + Sync {
    async fn upload_pdf(&self, name: &str, pdf: &[u8]) -> Result<()>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

const REGISTER_PATH: &str = "/token/json/2/device/new";
const REFRESH_PATH: &str = "/token/json/2/user/new";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    code: &'a str,
    device_desc: &'a str,
    #[serde(rename = "deviceID")]
    device_id: &'a str,
}

/// Device registration and token refresh against the auth host.
pub struct RemarkableAuthApi {
    http: Client,
    auth_url: String,
    device_desc: String,
}

impl RemarkableAuthApi {
    pub fn new(config: &RemarkableConfig) -> Result<Self> {
        let http = create_http_client(REQUEST_TIMEOUT)
            .map_err(|e| SyncError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            device_desc: config.device_desc.clone(),
        })
    }

    /// Pairs a new device with a one-time code and returns its device token.
    pub async fn register_device(&self, code: &str) -> Result<SecretString> {
        let device_id = uuid::Uuid::new_v4().to_string();
        info!("Registering device {} ({})", device_id, self.device_desc);

        let response = self
            .http
            .post(format!("{}{}", self.auth_url, REGISTER_PATH))
            .json(&RegisterRequest {
                code: code.trim(),
                device_desc: &self.device_desc,
                device_id: &device_id,
            })
            .send()
            .await?;

        let token = read_token(response).await?;
        info!("Device registered");
        Ok(token)
    }

    /// Exchanges a device token for a fresh user token.
    pub async fn refresh_user_token(&self, device_token: &SecretString) -> Result<SecretString> {
        debug!("Refreshing user token");
        let response = self
            .http
            .post(format!("{}{}", self.auth_url, REFRESH_PATH))
            .bearer_auth(device_token.expose_secret())
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?;

        read_token(response).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Api {
        status: status.as_u16(),
        body: truncate_body(&body),
    })
}

/// Token endpoints answer with the bare token as the body.
async fn read_token(response: Response) -> Result<SecretString> {
    let response = check_status(response).await?;
    let token = response.text().await?;
    let token = token.trim();
    if token.is_empty() {
        return Err(SyncError::Rejected("empty token in response".to_string()));
    }
    Ok(SecretString::from(token.to_string()))
}

/// Upload client holding a live user token.
pub struct RemarkableClient {
    http: Client,
    upload_url: String,
    user_token: SecretString,
}

impl RemarkableClient {
    pub fn new(user_token: SecretString, config: &RemarkableConfig) -> Result<Self> {
        let http = create_http_client(UPLOAD_TIMEOUT)
            .map_err(|e| SyncError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            upload_url: config.upload_url.clone(),
            user_token,
        })
    }
}

/// Value of the `rm-meta` header: base64 of `{"file_name": name}`.
fn upload_meta(name: &str) -> String {
    let mut meta = serde_json::Map::new();
    meta.insert(
        "file_name".to_string(),
        serde_json::Value::String(name.to_string()),
    );
    STANDARD.encode(serde_json::Value::Object(meta).to_string())
}

#[async_trait]
impl DocumentSync for RemarkableClient {
    async fn upload_pdf(&self, name: &str, pdf: &[u8]) -> Result<()> {
        info!("Uploading '{}' ({} bytes)", name, pdf.len());

        let response = self
            .http
            .post(&self.upload_url)
            .bearer_auth(self.user_token.expose_secret())
            .header("rm-meta", upload_meta(name))
            .header("rm-source", "RoR-Browser")
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(pdf.to_vec())
            .send()
            .await?;

        check_status(response).await?;
        info!("Uploaded '{}'", name);
        Ok(())
    }
}
