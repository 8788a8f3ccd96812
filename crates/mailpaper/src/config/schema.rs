use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Google "installed app" client file, provisioned by the operator.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_google_token_path")]
    pub google_token_path: PathBuf,
    #[serde(default = "default_remarkable_token_path")]
    pub remarkable_token_path: PathBuf,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub gmail: GmailConfig,
    #[serde(default)]
    pub remarkable: RemarkableConfig,
    #[serde(default)]
    pub office: OfficeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_google_token_path() -> PathBuf {
    PathBuf::from("google-token.json")
}

fn default_remarkable_token_path() -> PathBuf {
    PathBuf::from(".remarkable-token")
}

fn default_poll_interval_secs() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            google_token_path: default_google_token_path(),
            remarkable_token_path: default_remarkable_token_path(),
            poll_interval_secs: default_poll_interval_secs(),
            gmail: GmailConfig::default(),
            remarkable: RemarkableConfig::default(),
            office: OfficeConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailConfig {
    #[serde(default = "default_gmail_api_url")]
    pub api_url: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Page size of a single listing call; only the first page is examined.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_gmail_api_url() -> String {
    "https://gmail.googleapis.com/gmail/v1".to_string()
}

fn default_user_id() -> String {
    "me".to_string()
}

fn default_max_results() -> u32 {
    100
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_url: default_gmail_api_url(),
            user_id: default_user_id(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemarkableConfig {
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    /// Page where the operator generates a one-time pairing code.
    #[serde(default = "default_pairing_url")]
    pub pairing_url: String,
    #[serde(default = "default_device_desc")]
    pub device_desc: String,
}

fn default_auth_url() -> String {
    "https://webapp-prod.cloud.remarkable.engineering".to_string()
}

fn default_upload_url() -> String {
    "https://internal.cloud.remarkable.com/doc/v2/files".to_string()
}

fn default_pairing_url() -> String {
    "https://my.remarkable.com/device/connect/desktop".to_string()
}

fn default_device_desc() -> String {
    "desktop-linux".to_string()
}

impl Default for RemarkableConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            upload_url: default_upload_url(),
            pairing_url: default_pairing_url(),
            device_desc: default_device_desc(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeConfig {
    #[serde(default = "default_office_program")]
    pub program: String,
    #[serde(default = "default_office_timeout_secs")]
    pub timeout_secs: u64,
    /// Parent of the per-job scratch directories. Defaults to the system temp dir.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

fn default_office_program() -> String {
    "soffice".to_string()
}

fn default_office_timeout_secs() -> u64 {
    120
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            program: default_office_program(),
            timeout_secs: default_office_timeout_secs(),
            scratch_dir: None,
        }
    }
}

impl OfficeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
