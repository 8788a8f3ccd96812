//! Mail service access: Gmail REST client, message views and status replies.

pub mod api;
pub mod client;
pub mod error;
pub mod reply;

pub use api::{AttachmentBody, AttachmentRef, Header, Message, MessagePart, MessageRef};
pub use client::{GmailClient, MailService};
pub use error::{MailError, ReplyError};
pub use reply::{compose_reply, send_reply, OutgoingReply};
