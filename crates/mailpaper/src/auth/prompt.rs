//! Operator interaction for authorization codes.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use super::error::{AuthError, Result};

/// Source of human-provided authorization codes.
///
/// The stdin implementation serves interactive runs; deployments without a
/// terminal can supply codes some other way.
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    /// Shows `instructions`, then asks `question` and returns the trimmed answer.
    async fn ask(&self, instructions: &str, question: &str) -> Result<String>;
}

pub struct StdinPrompt {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinPrompt {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for StdinPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperatorPrompt for StdinPrompt {
    async fn ask(&self, instructions: &str, question: &str) -> Result<String> {
        let mut lines = self.lines.lock().await;

        let mut stdout = tokio::io::stdout();
        let text = format!("{}\n{}", instructions, question);
        stdout
            .write_all(text.as_bytes())
            .await
            .map_err(|e| AuthError::Prompt(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| AuthError::Prompt(e.to_string()))?;

        let line = lines
            .next_line()
            .await
            .map_err(|e| AuthError::Prompt(e.to_string()))?
            .ok_or_else(|| AuthError::Prompt("stdin closed".to_string()))?;

        let answer = line.trim();
        if answer.is_empty() {
            return Err(AuthError::Prompt("no code entered".to_string()));
        }
        Ok(answer.to_string())
    }
}
