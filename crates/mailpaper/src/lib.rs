pub mod auth;
pub mod config;
pub mod convert;
pub mod error;
mod http;
pub mod logging;
pub mod mail;
pub mod poller;
pub mod sync;

pub use auth::{
    AuthError, GoogleAuthorizer, MailAuthorizer, OperatorPrompt, RemarkableAuthorizer,
    StdinPrompt, SyncAuthorizer,
};
pub use config::{load_config, resolve_config, Config};
pub use convert::{
    convert_file, default_output_path, ConvertedPdf, Converter, LibreOfficeConverter,
    OfficeConverter,
};
pub use error::{ConfigError, ConvertError, MailpaperError, Result};
pub use logging::init_logging;
pub use mail::{GmailClient, MailError, MailService};
pub use poller::{CycleReport, InboxPoller, SeenSet, Session};
pub use sync::{DocumentSync, RemarkableClient, SyncError};
