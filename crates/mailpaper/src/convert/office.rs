//! Office document conversion through an external LibreOffice process.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::process::Command;

use crate::config::OfficeConfig;
use crate::error::ConvertError;

/// An external service turning office documents into PDF bytes.
#[async_trait]
pub trait OfficeConverter: Send + Sync {
    /// `ext` is the sniffed extension of `input`, e.g. `docx`.
    async fn to_pdf(&self, input: &[u8], ext: &str) -> Result<Vec<u8>, ConvertError>;
}

/// Runs `soffice --headless --convert-to pdf` in a per-job scratch directory.
pub struct LibreOfficeConverter {
    program: String,
    timeout: Duration,
    scratch_root: PathBuf,
}

/// Maximum length of converter stderr kept in error messages.
const MAX_STDERR_LENGTH: usize = 500;

impl LibreOfficeConverter {
    pub fn new(program: impl Into<String>, timeout: Duration, scratch_root: PathBuf) -> Self {
        Self {
            program: program.into(),
            timeout,
            scratch_root,
        }
    }

    pub fn from_config(config: &OfficeConfig) -> Self {
        Self::new(config.program.clone(), config.timeout(), config.scratch_root())
    }

    async fn convert_in(
        &self,
        job_dir: &Path,
        input: &[u8],
        ext: &str,
    ) -> Result<Vec<u8>, ConvertError> {
        tokio::fs::create_dir_all(job_dir)
            .await
            .map_err(|e| io_error(job_dir, e))?;

        let input_path = job_dir.join(format!("input.{}", ext));
        tokio::fs::write(&input_path, input)
            .await
            .map_err(|e| io_error(&input_path, e))?;

        // A private profile lets several soffice instances run side by side.
        let profile = format!(
            "-env:UserInstallation=file://{}",
            job_dir.join("profile").display()
        );

        let mut command = Command::new(&self.program);
        command
            .arg(profile)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(job_dir)
            .arg(&input_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!("Running {} for {}", self.program, input_path.display());

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ConvertError::OfficeTimeout(self.timeout.as_secs()))?
            .map_err(|e| ConvertError::Office(format!("Failed to run '{}': {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.chars().take(MAX_STDERR_LENGTH).collect();
            return Err(ConvertError::Office(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let output_path = job_dir.join("input.pdf");
        tokio::fs::read(&output_path).await.map_err(|e| {
            ConvertError::Office(format!(
                "No PDF produced at '{}': {}",
                output_path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl OfficeConverter for LibreOfficeConverter {
    async fn to_pdf(&self, input: &[u8], ext: &str) -> Result<Vec<u8>, ConvertError> {
        let job_dir = self
            .scratch_root
            .join(format!("mailpaper-{}", uuid::Uuid::new_v4()));

        let result = self.convert_in(&job_dir, input, ext).await;

        if let Err(e) = tokio::fs::remove_dir_all(&job_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove scratch dir {}: {}", job_dir.display(), e);
            }
        }

        if let Ok(pdf) = &result {
            info!("Converted {} document ({} bytes of PDF)", ext, pdf.len());
        }
        result
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ConvertError {
    ConvertError::Io {
        path: path.to_path_buf(),
        source,
    }
}
