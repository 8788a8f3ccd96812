//! Google OAuth2 for Gmail access.
//!
//! The operator opens a consent URL, approves offline access and pastes the
//! resulting code back. Tokens are cached on disk and refreshed with the
//! refresh token while it remains valid.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::error::{AuthError, Result};
use super::prompt::OperatorPrompt;
use super::store;
use super::MailAuthorizer;
use crate::config::{Config, GmailConfig};
use crate::http::{create_http_client, truncate_body};
use crate::mail::{GmailClient, MailService};

/// Full mailbox access; needed to read attachments and send replies.
pub const GMAIL_SCOPE: &str = "https://mail.google.com/";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The client file downloaded from the Google Cloud console.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretEntry>,
    web: Option<ClientSecretEntry>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretEntry {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

/// OAuth2 client identity loaded from the client file.
#[derive(Debug)]
pub struct OAuthClient {
    pub client_id: String,
    client_secret: SecretString,
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
}

impl OAuthClient {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthError::ClientConfig {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let invalid = |reason: String| AuthError::InvalidClientConfig {
            path: path.to_path_buf(),
            reason,
        };

        let file: ClientSecretFile =
            serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;
        let entry = file
            .installed
            .or(file.web)
            .ok_or_else(|| invalid("expected an 'installed' or 'web' section".to_string()))?;
        let redirect_uri = entry
            .redirect_uris
            .into_iter()
            .next()
            .ok_or_else(|| invalid("no redirect_uris".to_string()))?;

        Ok(Self {
            client_id: entry.client_id,
            client_secret: SecretString::from(entry.client_secret),
            redirect_uri,
            auth_uri: entry
                .auth_uri
                .unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
            token_uri: entry
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }

    /// Consent page asking for offline access to the mailbox.
    pub fn authorization_url(&self) -> Result<Url> {
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("access_type", "offline"),
                ("scope", GMAIL_SCOPE),
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ],
        )
        .map_err(|e| AuthError::InvalidClientConfig {
            path: PathBuf::new(),
            reason: format!("invalid auth_uri '{}': {}", self.auth_uri, e),
        })
    }
}

/// Response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Error response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Cached token, stored in the same shape Google's client libraries use.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredMailToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub expiry_date: Option<i64>,
}

impl std::fmt::Debug for StoredMailToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredMailToken")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scope", &self.scope)
            .field("expiry_date", &self.expiry_date)
            .finish()
    }
}

impl StoredMailToken {
    /// Builds the cached form, keeping the previous refresh token when the
    /// endpoint does not issue a new one.
    pub fn from_response(
        response: TokenResponse,
        previous_refresh_token: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh_token),
            scope: response.scope,
            token_type: response.token_type,
            expiry_date: response
                .expires_in
                .map(|secs| now.timestamp_millis() + (secs as i64) * 1000),
        }
    }

    /// Tokens without a known expiry are assumed valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry <= now.timestamp_millis() + EXPIRY_MARGIN_SECS * 1000,
            None => false,
        }
    }
}

/// Loads or acquires Gmail credentials and builds authorized clients.
pub struct GoogleAuthorizer {
    credentials_path: PathBuf,
    token_path: PathBuf,
    gmail: GmailConfig,
    prompt: Arc<dyn OperatorPrompt>,
    http: Client,
}

impl GoogleAuthorizer {
    pub fn new(config: &Config, prompt: Arc<dyn OperatorPrompt>) -> Result<Self> {
        let http = create_http_client(REQUEST_TIMEOUT).map_err(|e| {
            AuthError::TokenExchange(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            credentials_path: config.credentials_path.clone(),
            token_path: config.google_token_path.clone(),
            gmail: config.gmail.clone(),
            prompt,
            http,
        })
    }

    /// Returns a usable token: cached, refreshed, or newly authorized.
    pub async fn obtain_token(&self) -> Result<StoredMailToken> {
        self.load_token(true).await
    }

    /// Like [`obtain_token`](Self::obtain_token), but never trusts the cached
    /// access token. Used after the mail service rejected it.
    pub async fn obtain_fresh_token(&self) -> Result<StoredMailToken> {
        self.load_token(false).await
    }

    async fn load_token(&self, reuse_cached: bool) -> Result<StoredMailToken> {
        let client = OAuthClient::load(&self.credentials_path).await?;
        let now = Utc::now();

        let cached = match store::read_json::<StoredMailToken>(&self.token_path).await {
            Ok(token) => Some(token),
            Err(e) => {
                debug!("No usable cached Gmail token: {}", e);
                None
            }
        };

        match cached {
            Some(token) if reuse_cached && !token.is_expired(now) => {
                debug!("Using cached Gmail token");
                Ok(token)
            }
            Some(StoredMailToken {
                refresh_token: Some(refresh_token),
                ..
            }) => match self.refresh(&client, refresh_token).await {
                Ok(token) => Ok(token),
                Err(e) => {
                    warn!("Gmail token refresh failed, asking for a new authorization: {}", e);
                    self.request_new_token(&client).await
                }
            },
            _ => self.request_new_token(&client).await,
        }
    }

    async fn refresh(
        &self,
        client: &OAuthClient,
        refresh_token: String,
    ) -> Result<StoredMailToken> {
        info!("Refreshing Gmail access token");

        let params = [
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.expose_secret()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response = self.post_token_request(client, &params).await?;

        let token = StoredMailToken::from_response(response, Some(refresh_token), Utc::now());
        store::write_json(&self.token_path, &token).await?;
        Ok(token)
    }

    async fn request_new_token(&self, client: &OAuthClient) -> Result<StoredMailToken> {
        let url = client.authorization_url()?;
        let code = self
            .prompt
            .ask(
                &format!("Please authorize this app by using this url: {}", url),
                "Please enter the code from that page here: ",
            )
            .await?;

        let params = [
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.expose_secret()),
            ("code", code.as_str()),
            ("redirect_uri", client.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self.post_token_request(client, &params).await?;

        let token = StoredMailToken::from_response(response, None, Utc::now());
        store::write_json(&self.token_path, &token).await?;
        info!("Gmail authorization stored in {}", self.token_path.display());
        Ok(token)
    }

    async fn post_token_request(
        &self,
        client: &OAuthClient,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&client.token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(error) => format!(
                    "{} {}",
                    error.error,
                    error.error_description.unwrap_or_default()
                ),
                Err(_) => truncate_body(&body),
            };
            return Err(AuthError::TokenExchange(format!(
                "({}) {}",
                status,
                reason.trim()
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("Failed to parse token response: {}", e)))
    }
}

#[async_trait]
impl MailAuthorizer for GoogleAuthorizer {
    async fn authorize(&self) -> Result<Box<dyn MailService>> {
        let token = self.obtain_token().await?;
        let client = GmailClient::new(SecretString::from(token.access_token), &self.gmail)?;
        Ok(Box::new(client))
    }

    async fn reauthorize(&self) -> Result<Box<dyn MailService>> {
        let token = self.obtain_fresh_token().await?;
        let client = GmailClient::new(SecretString::from(token.access_token), &self.gmail)?;
        Ok(Box::new(client))
    }
}
