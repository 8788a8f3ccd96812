//! Gmail API response types
//!
//! Read-only views over `users.messages` JSON (format `full`).

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{MailError, Result};

/// Gmail encodes bodies as URL-safe base64, with or without padding.
pub(crate) const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Response from `users.messages.list`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesResponse {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    pub next_page_token: Option<String>,
    pub result_size_estimate: Option<u32>,
}

/// Message reference returned by a listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    /// Milliseconds since the epoch, as a decimal string.
    pub internal_date: Option<String>,
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub part_id: Option<String>,
    pub mime_type: Option<String>,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    pub body: Option<MessagePartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Attachment payload from `users.messages.attachments.get`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttachmentBody {
    pub data: String,
    #[serde(default)]
    pub size: u64,
}

impl AttachmentBody {
    pub fn decode(&self) -> Result<Vec<u8>> {
        GMAIL_BASE64
            .decode(self.data.trim())
            .map_err(|e| MailError::Decode(format!("Invalid attachment encoding: {}", e)))
    }
}

/// An attachment part: a named part whose body lives behind an attachment id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub filename: String,
    pub attachment_id: String,
}

impl Message {
    /// First top-level header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// The `Date` header, falling back to the service's receive time.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.header("Date")
            .and_then(parse_rfc822_date)
            .or_else(|| {
                self.internal_date
                    .as_deref()
                    .and_then(|ms| ms.parse::<i64>().ok())
                    .and_then(DateTime::from_timestamp_millis)
            })
    }

    pub fn is_multipart(&self) -> bool {
        self.payload
            .as_ref()
            .and_then(|p| p.parts.as_ref())
            .is_some()
    }

    /// Parts with both a filename and an attachment id, in document order.
    pub fn attachments(&self) -> Vec<AttachmentRef> {
        let mut found = Vec::new();
        if let Some(parts) = self.payload.as_ref().and_then(|p| p.parts.as_ref()) {
            collect_attachments(parts, &mut found);
        }
        found
    }
}

fn collect_attachments(parts: &[MessagePart], found: &mut Vec<AttachmentRef>) {
    for part in parts {
        let attachment_id = part.body.as_ref().and_then(|b| b.attachment_id.as_ref());
        if let (false, Some(id)) = (part.filename.is_empty(), attachment_id) {
            found.push(AttachmentRef {
                filename: part.filename.clone(),
                attachment_id: id.clone(),
            });
        }
        if let Some(children) = &part.parts {
            collect_attachments(children, found);
        }
    }
}

fn parse_rfc822_date(value: &str) -> Option<DateTime<Utc>> {
    let parsed = mail_parser::DateTime::parse_rfc822(value)?;
    if !parsed.is_valid() {
        return None;
    }
    DateTime::from_timestamp(parsed.to_timestamp(), 0)
}
