//! Threaded status replies to the sender of an attachment.

use base64::Engine;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Mailboxes};
use tracing::{info, warn};

use super::api::{Message, GMAIL_BASE64};
use super::client::MailService;
use super::error::ReplyError;

pub const UPLOAD_SUCCESSFUL: &str = "Upload Successful 🙂";
pub const CONVERSION_FAILED: &str = "Failed to convert to PDF 🙁";
pub const UPLOAD_FAILED: &str = "Could not upload to reMarkable 🙁";

/// A reply ready for the mail service's send call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReply {
    /// Base64url-encoded RFC 5322 message.
    pub raw: String,
    pub thread_id: String,
}

/// Builds a reply to `original`: same subject, sender and recipient swapped,
/// threaded through `In-Reply-To` and `References`.
pub fn compose_reply(original: &Message, body: &str) -> Result<OutgoingReply, ReplyError> {
    let subject = required_header(original, "Subject")?;
    let from = first_mailbox(original, "To")?;
    let to = first_mailbox(original, "From")?;
    let message_id = required_header(original, "Message-ID")?;

    let references = match original.header("References") {
        Some(existing) if !existing.trim().is_empty() => {
            format!("{} {}", existing.trim(), message_id)
        }
        _ => message_id.to_string(),
    };

    let email = lettre::Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .in_reply_to(message_id.to_string())
        .references(references)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| ReplyError::Build(e.to_string()))?;

    Ok(OutgoingReply {
        raw: GMAIL_BASE64.encode(email.formatted()),
        thread_id: original.thread_id.clone(),
    })
}

/// Composes and sends a reply. Failures are logged and otherwise ignored.
pub async fn send_reply(mail: &dyn MailService, original: &Message, body: &str) {
    let result = match compose_reply(original, body) {
        Ok(reply) => mail
            .send_raw(&reply.raw, &reply.thread_id)
            .await
            .map_err(ReplyError::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => info!(message = %original.id, "Response sent"),
        Err(e) => warn!(message = %original.id, "Could not send email: {}", e),
    }
}

fn required_header<'a>(message: &'a Message, name: &'static str) -> Result<&'a str, ReplyError> {
    message.header(name).ok_or(ReplyError::MissingHeader(name))
}

/// The first address of a possibly multi-address header.
fn first_mailbox(message: &Message, name: &'static str) -> Result<Mailbox, ReplyError> {
    let value = required_header(message, name)?;
    let mailboxes: Mailboxes = value.parse().map_err(|e| ReplyError::InvalidAddress {
        header: name,
        reason: format!("{}", e),
    })?;
    mailboxes
        .iter()
        .next()
        .cloned()
        .ok_or(ReplyError::InvalidAddress {
            header: name,
            reason: "no address".to_string(),
        })
}
