//! On-disk credential caches.

use std::path::Path;

use log::debug;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{AuthError, Result};

pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| token_read_error(path, e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| token_read_error(path, e.to_string()))
}

pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string(value).map_err(|e| AuthError::TokenWrite {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    write_private(path, content.as_bytes()).await
}

/// Reads a raw token file, trimming surrounding whitespace.
pub async fn read_secret(path: &Path) -> Result<SecretString> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| token_read_error(path, e.to_string()))?;
    let token = content.trim();
    if token.is_empty() {
        return Err(token_read_error(path, "file is empty".to_string()));
    }
    Ok(SecretString::from(token.to_string()))
}

pub async fn write_secret(path: &Path, secret: &SecretString) -> Result<()> {
    write_private(path, secret.expose_secret().as_bytes()).await
}

async fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    let write_error = |source| AuthError::TokenWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(path, content).await.map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(write_error)?;
    }

    debug!("Stored credentials in {}", path.display());
    Ok(())
}

fn token_read_error(path: &Path, reason: String) -> AuthError {
    AuthError::TokenRead {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        value: String,
    }

    #[tokio::test]
    async fn test_json_round_trip_in_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");
        let sample = Sample {
            value: "abc".to_string(),
        };

        write_json(&path, &sample).await.unwrap();
        let loaded: Sample = read_json(&path).await.unwrap();
        assert_eq!(loaded, sample);
    }

    #[tokio::test]
    async fn test_secret_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".device-token");
        std::fs::write(&path, "  device-token\n").unwrap();

        let secret = read_secret(&path).await.unwrap();
        assert_eq!(secret.expose_secret(), "device-token");
    }

    #[tokio::test]
    async fn test_empty_secret_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".device-token");
        std::fs::write(&path, "\n").unwrap();

        assert!(matches!(
            read_secret(&path).await,
            Err(AuthError::TokenRead { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = read_secret(Path::new("/nonexistent/.device-token")).await;
        assert!(matches!(result, Err(AuthError::TokenRead { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_written_secret_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".device-token");
        write_secret(&path, &SecretString::from("t".to_string()))
            .await
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
