//! Inbox polling loop.
//!
//! Each cycle lists the newest messages, and for every message received after
//! start-up that has not been handled yet, converts each attachment to PDF,
//! uploads it and replies to the sender. Failures of one message never stop
//! the others. Expired credentials are recovered by re-running the relevant
//! authorizer.

pub mod report;
pub mod seen;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::auth::{AuthError, MailAuthorizer, SyncAuthorizer};
use crate::convert::Converter;
use crate::mail::reply::{CONVERSION_FAILED, UPLOAD_FAILED, UPLOAD_SUCCESSFUL};
use crate::mail::{send_reply, AttachmentRef, MailError, MailService, Message};
use crate::sync::DocumentSync;

pub use report::CycleReport;
pub use seen::SeenSet;

/// Live clients and run-scoped state.
pub struct Session {
    pub mail: Box<dyn MailService>,
    pub sync: Box<dyn DocumentSync>,
    pub seen: SeenSet,
    /// Messages dated before this are backlog and ignored.
    pub started_at: DateTime<Utc>,
}

enum MessageOutcome {
    Skipped(&'static str),
    Processed,
}

enum AttachmentOutcome {
    Uploaded,
    ConversionFailed,
    UploadFailed,
}

pub struct InboxPoller {
    session: Session,
    mail_auth: Arc<dyn MailAuthorizer>,
    sync_auth: Arc<dyn SyncAuthorizer>,
    converter: Converter,
    interval: Duration,
}

impl InboxPoller {
    /// Logs in to both services and records the start time.
    pub async fn start(
        mail_auth: Arc<dyn MailAuthorizer>,
        sync_auth: Arc<dyn SyncAuthorizer>,
        converter: Converter,
        interval: Duration,
    ) -> Result<Self, AuthError> {
        let started_at = Utc::now();

        let mail = mail_auth.authorize().await?;
        info!("Logged in to Gmail");
        let sync = sync_auth.authorize().await?;
        info!("Logged in to reMarkable");

        let session = Session {
            mail,
            sync,
            seen: SeenSet::new(),
            started_at,
        };
        Ok(Self::new(session, mail_auth, sync_auth, converter, interval))
    }

    pub fn new(
        session: Session,
        mail_auth: Arc<dyn MailAuthorizer>,
        sync_auth: Arc<dyn SyncAuthorizer>,
        converter: Converter,
        interval: Duration,
    ) -> Self {
        Self {
            session,
            mail_auth,
            sync_auth,
            converter,
            interval,
        }
    }

    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.session.started_at = started_at;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Polls until Ctrl-C.
    pub async fn run(&mut self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Polls until `shutdown` completes. The interval starts after each cycle finishes.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            interval_secs = self.interval.as_secs(),
            "Monitoring inbox for attachments"
        );

        loop {
            tokio::select! {
                _ = self.poll_once() => {}
                _ = &mut shutdown => break,
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => break,
            }
        }

        info!("Stopped monitoring");
    }

    /// Runs a single polling cycle.
    pub async fn poll_once(&mut self) -> CycleReport {
        let span = info_span!("poll_cycle");
        let report = self.poll_cycle().instrument(span).await;
        if report.is_idle() {
            debug!("Cycle complete: {}", report);
        } else {
            info!("Cycle complete: {}", report);
        }
        report
    }

    async fn poll_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        let messages = match self.session.mail.list_messages().await {
            Ok(messages) => messages,
            Err(e) => {
                report.listing_failed = true;
                let rejected = e.is_unauthorized();
                if rejected {
                    warn!("Gmail rejected the credentials, logging in again: {}", e);
                } else {
                    warn!("Could not list messages, logging in to Gmail again: {}", e);
                }
                self.recover_mail(rejected).await;
                return report;
            }
        };

        debug!("Listed {} messages", messages.len());

        for message_ref in messages {
            report.examined += 1;
            let span = info_span!("message", id = %message_ref.id);
            match self
                .process_message(&message_ref.id, &mut report)
                .instrument(span)
                .await
            {
                Ok(MessageOutcome::Processed) => report.processed += 1,
                Ok(MessageOutcome::Skipped(reason)) => {
                    debug!(id = %message_ref.id, reason, "Skipped message");
                    report.skipped += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    error!(id = %message_ref.id, "Failed to process message: {}", e);
                }
            }
        }

        report
    }

    /// A rejected token is never reused; other failures may keep a valid cached one.
    async fn recover_mail(&mut self, credentials_rejected: bool) {
        let login = if credentials_rejected {
            self.mail_auth.reauthorize().await
        } else {
            self.mail_auth.authorize().await
        };
        match login {
            Ok(client) => {
                self.session.mail = client;
                info!("Logged in to Gmail again");
            }
            Err(e) => error!("Gmail login failed: {}", e),
        }
    }

    async fn recover_sync(&mut self) -> Result<(), AuthError> {
        let client = self.sync_auth.authorize().await?;
        self.session.sync = client;
        info!("Logged in to reMarkable again");
        Ok(())
    }

    async fn process_message(
        &mut self,
        id: &str,
        report: &mut CycleReport,
    ) -> Result<MessageOutcome, MailError> {
        if self.session.seen.contains(id) {
            return Ok(MessageOutcome::Skipped("already seen"));
        }

        let message = self.session.mail.get_message(id).await?;

        // Undated messages are treated as new.
        if let Some(date) = message.date() {
            if date < self.session.started_at {
                return Ok(MessageOutcome::Skipped("received before start"));
            }
        }
        if !message.is_multipart() {
            return Ok(MessageOutcome::Skipped("no parts"));
        }

        for attachment in message.attachments() {
            info!(filename = %attachment.filename, "Found attachment");
            match self.process_attachment(&message, &attachment).await? {
                AttachmentOutcome::Uploaded => report.uploads += 1,
                AttachmentOutcome::ConversionFailed => report.conversion_failures += 1,
                AttachmentOutcome::UploadFailed => report.upload_failures += 1,
            }
        }

        self.session.seen.mark(&message.id);
        Ok(MessageOutcome::Processed)
    }

    async fn process_attachment(
        &mut self,
        message: &Message,
        attachment: &AttachmentRef,
    ) -> Result<AttachmentOutcome, MailError> {
        let body = self
            .session
            .mail
            .get_attachment(&message.id, &attachment.attachment_id)
            .await?;
        let bytes = body.decode()?;

        debug!(filename = %attachment.filename, bytes = bytes.len(), "Converting attachment");
        let pdf = match self.converter.convert(&bytes).await {
            Ok(pdf) => pdf,
            Err(e) => {
                warn!(filename = %attachment.filename, "Conversion failed: {}", e);
                send_reply(self.session.mail.as_ref(), message, CONVERSION_FAILED).await;
                return Ok(AttachmentOutcome::ConversionFailed);
            }
        };

        let name = upload_name(&attachment.filename, Local::now());
        let outcome = if self.upload_with_retry(&name, &pdf.bytes).await {
            send_reply(self.session.mail.as_ref(), message, UPLOAD_SUCCESSFUL).await;
            AttachmentOutcome::Uploaded
        } else {
            send_reply(self.session.mail.as_ref(), message, UPLOAD_FAILED).await;
            AttachmentOutcome::UploadFailed
        };
        Ok(outcome)
    }

    /// One retry, after logging in to the sync service again.
    async fn upload_with_retry(&mut self, name: &str, pdf: &[u8]) -> bool {
        let first_error = match self.session.sync.upload_pdf(name, pdf).await {
            Ok(()) => return true,
            Err(e) => e,
        };

        warn!(
            "Error uploading PDF, logging in to reMarkable again: {}",
            first_error
        );
        if let Err(e) = self.recover_sync().await {
            error!("reMarkable login failed: {}", e);
            return false;
        }

        match self.session.sync.upload_pdf(name, pdf).await {
            Ok(()) => true,
            Err(e) => {
                error!("Upload failed after logging in again: {}", e);
                false
            }
        }
    }
}

/// `<filename> - <local date and time>`, e.g. `scan.png - 3/14/2024, 9:05:00 AM`.
pub fn upload_name(filename: &str, at: DateTime<Local>) -> String {
    format!("{} - {}", filename, at.format("%-m/%-d/%Y, %-I:%M:%S %p"))
}
