//! In-memory stand-ins for the external services.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use tokio::time::Instant;

use mailpaper::auth::error::Result as AuthResult;
use mailpaper::auth::{AuthError, MailAuthorizer, SyncAuthorizer};
use mailpaper::convert::OfficeConverter;
use mailpaper::mail::error::Result as MailResult;
use mailpaper::mail::{AttachmentBody, MailError, MailService, Message, MessageRef};
use mailpaper::sync::error::Result as SyncResult;
use mailpaper::{ConvertError, DocumentSync, SyncError};

/// A reply captured by the fake mailbox.
#[derive(Debug, Clone)]
pub struct SentReply {
    pub thread_id: String,
    pub body: String,
    pub subject: Option<String>,
    pub in_reply_to: Option<String>,
}

#[derive(Default)]
struct MailboxState {
    messages: Vec<Message>,
    attachments: HashMap<String, AttachmentBody>,
    broken_messages: HashSet<String>,
    listing_failures: usize,
    listing_failure_status: u16,
    listing_delay: Duration,
    listing_starts: Vec<Instant>,
    fail_sends: bool,
    send_attempts: usize,
    message_fetches: Vec<String>,
    attachment_fetches: Vec<String>,
    sent: Vec<SentReply>,
}

/// Scripted mailbox. Clones share state, so a clone handed to the poller can
/// be inspected from the test.
#[derive(Clone, Default)]
pub struct FakeMailbox {
    state: Arc<Mutex<MailboxState>>,
}

impl FakeMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message; listings return the newest first.
    pub fn deliver(&self, message: Message) {
        self.state.lock().unwrap().messages.insert(0, message);
    }

    pub fn add_attachment(&self, attachment_id: &str, body: AttachmentBody) {
        self.state
            .lock()
            .unwrap()
            .attachments
            .insert(attachment_id.to_string(), body);
    }

    /// `get_message` for this id fails until `repair_message` is called.
    pub fn break_message(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .broken_messages
            .insert(id.to_string());
    }

    pub fn repair_message(&self, id: &str) {
        self.state.lock().unwrap().broken_messages.remove(id);
    }

    /// The next `count` listings answer 401.
    pub fn fail_listings(&self, count: usize) {
        self.fail_listings_with_status(count, 401);
    }

    pub fn fail_listings_with_status(&self, count: usize, status: u16) {
        let mut state = self.state.lock().unwrap();
        state.listing_failures = count;
        state.listing_failure_status = status;
    }

    /// Every listing takes `delay` before answering.
    pub fn delay_listings(&self, delay: Duration) {
        self.state.lock().unwrap().listing_delay = delay;
    }

    /// Every `send_raw` call fails.
    pub fn fail_sends(&self) {
        self.state.lock().unwrap().fail_sends = true;
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().listing_starts.len()
    }

    /// When each listing call began.
    pub fn listing_starts(&self) -> Vec<Instant> {
        self.state.lock().unwrap().listing_starts.clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.state.lock().unwrap().send_attempts
    }

    pub fn message_fetches(&self) -> Vec<String> {
        self.state.lock().unwrap().message_fetches.clone()
    }

    pub fn attachment_fetches(&self) -> Vec<String> {
        self.state.lock().unwrap().attachment_fetches.clone()
    }

    pub fn sent(&self) -> Vec<SentReply> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_bodies(&self) -> Vec<String> {
        self.sent().into_iter().map(|reply| reply.body).collect()
    }
}

#[async_trait]
impl MailService for FakeMailbox {
    async fn list_messages(&self) -> MailResult<Vec<MessageRef>> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.listing_starts.push(Instant::now());
            state.listing_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.listing_failures > 0 {
            state.listing_failures -= 1;
            return Err(MailError::Api {
                status: state.listing_failure_status,
                body: "Invalid Credentials".to_string(),
            });
        }
        Ok(state
            .messages
            .iter()
            .map(|m| MessageRef {
                id: m.id.clone(),
                thread_id: m.thread_id.clone(),
            })
            .collect())
    }

    async fn get_message(&self, id: &str) -> MailResult<Message> {
        let mut state = self.state.lock().unwrap();
        state.message_fetches.push(id.to_string());
        if state.broken_messages.contains(id) {
            return Err(MailError::Http("connection reset".to_string()));
        }
        state
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| MailError::Api {
                status: 404,
                body: "Not Found".to_string(),
            })
    }

    async fn get_attachment(
        &self,
        _message_id: &str,
        attachment_id: &str,
    ) -> MailResult<AttachmentBody> {
        let mut state = self.state.lock().unwrap();
        state.attachment_fetches.push(attachment_id.to_string());
        state
            .attachments
            .get(attachment_id)
            .cloned()
            .ok_or_else(|| MailError::Api {
                status: 404,
                body: "Not Found".to_string(),
            })
    }

    async fn send_raw(&self, raw: &str, thread_id: &str) -> MailResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            state.send_attempts += 1;
            if state.fail_sends {
                return Err(MailError::Api {
                    status: 500,
                    body: "Backend Error".to_string(),
                });
            }
        }

        let bytes = URL_SAFE.decode(raw).unwrap();
        let parsed = mail_parser::MessageParser::default().parse(&bytes).unwrap();
        let reply = SentReply {
            thread_id: thread_id.to_string(),
            body: parsed
                .body_text(0)
                .map(|text| text.trim_end().to_string())
                .unwrap_or_default(),
            subject: parsed.subject().map(str::to_string),
            in_reply_to: parsed.in_reply_to().as_text().map(str::to_string),
        };
        self.state.lock().unwrap().sent.push(reply);
        Ok(())
    }
}

#[derive(Default)]
struct SyncState {
    failures_remaining: usize,
    attempts: usize,
    uploads: Vec<(String, Vec<u8>)>,
}

/// Document sync that fails a configurable number of uploads first.
#[derive(Clone, Default)]
pub struct FlakySync {
    state: Arc<Mutex<SyncState>>,
}

impl FlakySync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, count: usize) {
        self.state.lock().unwrap().failures_remaining = count;
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().unwrap().uploads.clone()
    }
}

#[async_trait]
impl DocumentSync for FlakySync {
    async fn upload_pdf(&self, name: &str, pdf: &[u8]) -> SyncResult<()> {
        let mut state = self.state.lock().unwrap();
        state.attempts += 1;
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(SyncError::Api {
                status: 401,
                body: "token expired".to_string(),
            });
        }
        state.uploads.push((name.to_string(), pdf.to_vec()));
        Ok(())
    }
}

/// Hands out clones of one mailbox and counts logins.
pub struct CountingMailAuth {
    mailbox: FakeMailbox,
    calls: AtomicUsize,
    forced: AtomicUsize,
}

impl CountingMailAuth {
    pub fn new(mailbox: FakeMailbox) -> Self {
        Self {
            mailbox,
            calls: AtomicUsize::new(0),
            forced: AtomicUsize::new(0),
        }
    }

    /// Logins that may reuse cached credentials.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Logins that had to discard the cached access token.
    pub fn forced_calls(&self) -> usize {
        self.forced.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailAuthorizer for CountingMailAuth {
    async fn authorize(&self) -> AuthResult<Box<dyn MailService>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.mailbox.clone()))
    }

    async fn reauthorize(&self) -> AuthResult<Box<dyn MailService>> {
        self.forced.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.mailbox.clone()))
    }
}

/// Hands out clones of one sync service; logins after the first can be made to fail.
pub struct CountingSyncAuth {
    sync: FlakySync,
    calls: AtomicUsize,
    refuse_after_first: bool,
}

impl CountingSyncAuth {
    pub fn new(sync: FlakySync) -> Self {
        Self {
            sync,
            calls: AtomicUsize::new(0),
            refuse_after_first: false,
        }
    }

    pub fn refusing_relogin(sync: FlakySync) -> Self {
        Self {
            refuse_after_first: true,
            ..Self::new(sync)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncAuthorizer for CountingSyncAuth {
    async fn authorize(&self) -> AuthResult<Box<dyn DocumentSync>> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse_after_first && previous > 0 {
            return Err(AuthError::Prompt("stdin closed".to_string()));
        }
        Ok(Box::new(self.sync.clone()))
    }
}

/// Office converter returning canned output.
pub struct FakeOffice {
    output: Option<Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl FakeOffice {
    pub fn returning(output: Vec<u8>) -> Self {
        Self {
            output: Some(output),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            output: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Extensions of the documents handed over, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OfficeConverter for FakeOffice {
    async fn to_pdf(&self, _input: &[u8], ext: &str) -> Result<Vec<u8>, ConvertError> {
        self.calls.lock().unwrap().push(ext.to_string());
        self.output
            .clone()
            .ok_or_else(|| ConvertError::Office("soffice exited with status 1".to_string()))
    }
}
