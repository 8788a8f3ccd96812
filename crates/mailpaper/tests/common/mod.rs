//! Shared test utilities for mailpaper integration tests.
//!
//! This module provides:
//! - In-memory fakes for the mail, sync and office services
//! - Builders for Gmail messages and attachment payloads
//! - `PollerHarness` wiring the fakes into an `InboxPoller`

pub mod builders;
pub mod fakes;
pub mod harness;

pub use builders::*;
pub use fakes::*;
pub use harness::PollerHarness;
