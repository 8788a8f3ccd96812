//! Gmail API HTTP client

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::api::{AttachmentBody, ListMessagesResponse, Message, MessageRef};
use super::error::{MailError, Result};
use crate::config::GmailConfig;
use crate::http::{create_http_client, truncate_body};

/// The mailbox operations the poller relies on.
#[async_trait]
pub trait MailService: Send + Sync {
    /// Most recent messages, first page only.
    async fn list_messages(&self) -> Result<Vec<MessageRef>>;

    async fn get_message(&self, id: &str) -> Result<Message>;

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<AttachmentBody>;

    /// Sends an RFC 5322 message, already base64url-encoded, into `thread_id`.
    async fn send_raw(&self, raw: &str, thread_id: &str) -> Result<()>;
}

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Gmail API client authorized with a bearer access token.
pub struct GmailClient {
    http: Client,
    access_token: SecretString,
    base_url: String,
    user_id: String,
    max_results: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    raw: &'a str,
    thread_id: &'a str,
}

impl GmailClient {
    pub fn new(access_token: SecretString, config: &GmailConfig) -> Result<Self> {
        let http = create_http_client(DEFAULT_REQUEST_TIMEOUT)
            .map_err(|e| MailError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            access_token,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
            max_results: config.max_results,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/users/{}/{}", self.base_url, self.user_id, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.access_token.expose_secret())
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        response.json::<T>().await.map_err(MailError::from)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MailError::Api {
            status: status.as_u16(),
            body: truncate_body(&body),
        })
    }
}

#[async_trait]
impl MailService for GmailClient {
    async fn list_messages(&self) -> Result<Vec<MessageRef>> {
        let max_results = self.max_results.to_string();
        let response = self
            .authorized(self.http.get(self.url("messages")))
            .query(&[("maxResults", max_results.as_str())])
            .send()
            .await?;

        let list: ListMessagesResponse = Self::read_json(response).await?;
        debug!(
            "Listed {} messages (estimate {:?})",
            list.messages.len(),
            list.result_size_estimate
        );
        Ok(list.messages)
    }

    async fn get_message(&self, id: &str) -> Result<Message> {
        let response = self
            .authorized(self.http.get(self.url(&format!("messages/{}", id))))
            .query(&[("format", "full")])
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentBody> {
        let path = format!("messages/{}/attachments/{}", message_id, attachment_id);
        let response = self
            .authorized(self.http.get(self.url(&path)))
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn send_raw(&self, raw: &str, thread_id: &str) -> Result<()> {
        let response = self
            .authorized(self.http.post(self.url("messages/send")))
            .json(&SendRequest { raw, thread_id })
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }
}
