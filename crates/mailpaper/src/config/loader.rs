use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "MAILPAPER_CONFIG";

const LOCAL_CONFIG_FILE: &str = "mailpaper.json";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the explicit config file if one is given, otherwise the first of
/// `./mailpaper.json` and `<config dir>/mailpaper/config.json` that exists.
/// Falls back to defaults when neither exists.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    match default_locations().into_iter().find(|p| p.is_file()) {
        Some(path) => load_config(path),
        None => {
            let config = Config::default();
            validate_config(&config)?;
            Ok(config)
        }
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("mailpaper").join("config.json"));
    }
    locations
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.poll_interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "pollIntervalSecs must be greater than zero".to_string(),
        });
    }

    if !(1..=500).contains(&config.gmail.max_results) {
        return Err(ConfigError::Validation {
            message: format!(
                "gmail.maxResults must be between 1 and 500, got {}",
                config.gmail.max_results
            ),
        });
    }

    if config.office.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "office.timeoutSecs must be greater than zero".to_string(),
        });
    }

    for (name, path) in [
        ("credentialsPath", &config.credentials_path),
        ("googleTokenPath", &config.google_token_path),
        ("remarkableTokenPath", &config.remarkable_token_path),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("{} must not be empty", name),
            });
        }
    }

    for (name, url) in [
        ("gmail.apiUrl", &config.gmail.api_url),
        ("remarkable.authUrl", &config.remarkable.auth_url),
        ("remarkable.uploadUrl", &config.remarkable.upload_url),
        ("remarkable.pairingUrl", &config.remarkable.pairing_url),
    ] {
        if let Err(e) = Url::parse(url) {
            return Err(ConfigError::Validation {
                message: format!("{} is not a valid URL '{}': {}", name, url, e),
            });
        }
    }

    Ok(())
}
