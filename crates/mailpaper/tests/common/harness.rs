//! Poller wired to in-memory services.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mailpaper::{Converter, InboxPoller};

use super::builders::run_start;
use super::fakes::{CountingMailAuth, CountingSyncAuth, FakeMailbox, FakeOffice, FlakySync};

const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

pub struct PollerHarness {
    pub mailbox: FakeMailbox,
    pub sync: FlakySync,
    pub mail_auth: Arc<CountingMailAuth>,
    pub sync_auth: Arc<CountingSyncAuth>,
    pub office: Arc<FakeOffice>,
    pub poller: InboxPoller,
}

impl PollerHarness {
    pub async fn new() -> Self {
        Self::with_office(FakeOffice::failing()).await
    }

    pub async fn with_office(office: FakeOffice) -> Self {
        let sync = FlakySync::new();
        let sync_auth = Arc::new(CountingSyncAuth::new(sync.clone()));
        Self::build(office, sync, sync_auth, DEFAULT_INTERVAL).await
    }

    pub async fn with_interval(interval: Duration) -> Self {
        let sync = FlakySync::new();
        let sync_auth = Arc::new(CountingSyncAuth::new(sync.clone()));
        Self::build(FakeOffice::failing(), sync, sync_auth, interval).await
    }

    /// Harness whose reMarkable login only succeeds at start-up.
    pub async fn refusing_sync_relogin() -> Self {
        let sync = FlakySync::new();
        let sync_auth = Arc::new(CountingSyncAuth::refusing_relogin(sync.clone()));
        Self::build(FakeOffice::failing(), sync, sync_auth, DEFAULT_INTERVAL).await
    }

    async fn build(
        office: FakeOffice,
        sync: FlakySync,
        sync_auth: Arc<CountingSyncAuth>,
        interval: Duration,
    ) -> Self {
        let mailbox = FakeMailbox::new();
        let mail_auth = Arc::new(CountingMailAuth::new(mailbox.clone()));
        let office = Arc::new(office);

        let poller = InboxPoller::start(
            mail_auth.clone(),
            sync_auth.clone(),
            Converter::new(office.clone()),
            interval,
        )
        .await
        .unwrap()
        .with_started_at(run_start());

        Self {
            mailbox,
            sync,
            mail_auth,
            sync_auth,
            office,
            poller,
        }
    }
}
