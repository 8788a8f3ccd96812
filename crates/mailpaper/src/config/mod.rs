pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, resolve_config, CONFIG_ENV_VAR};
pub use schema::{Config, GmailConfig, LogConfig, LogFormat, OfficeConfig, RemarkableConfig};
