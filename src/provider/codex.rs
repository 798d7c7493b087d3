use super::{command_for, run_piped, ProviderOutput, Runner};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

pub struct CodexRunner {
    pub binary: PathBuf,
    pub model: String,
}

#[async_trait]
impl Runner for CodexRunner {
    fn name(&self) -> &'static str {
        "codex_cli"
    }

    async fn execute(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<ProviderOutput, ProviderError> {
        // Final assistant message lands in a temp file, JSON events go to stdout
        let out_file = NamedTempFile::new().map_err(ProviderError::Io)?;

        let mut cmd = command_for(&self.binary);
        cmd.arg("exec")
            .arg("--model")
            .arg(&self.model)
            .arg("--json")
            .arg("--output-last-message")
            .arg(out_file.path())
            // Read prompt from stdin
            .arg("-");

        let start = std::time::Instant::now();
        let output = run_piped(cmd, prompt, timeout).await?;

        let exit_code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(ProviderError::NonZeroExit {
                code: exit_code,
                stderr,
            });
        }

        let last_message = tokio::fs::read_to_string(out_file.path())
            .await
            .map_err(ProviderError::Io)?;

        Ok(ProviderOutput {
            stdout: last_message,
            stderr,
            duration: start.elapsed(),
            exit_code,
        })
    }
}
