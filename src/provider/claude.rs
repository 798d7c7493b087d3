use super::{command_for, run_piped, ProviderOutput, Runner};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

pub struct ClaudeRunner {
    pub binary: PathBuf,
    pub model: String,
}

#[async_trait]
impl Runner for ClaudeRunner {
    fn name(&self) -> &'static str {
        "claude_cli"
    }

    async fn execute(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<ProviderOutput, ProviderError> {
        let mut cmd = command_for(&self.binary);

        // `-p` without an argument reads the prompt from stdin; the document travels inside
        // the prompt, no tools needed
        cmd.arg("-p")
            .arg("--model")
            .arg(&self.model)
            .arg("--output-format")
            .arg("json");

        let start = std::time::Instant::now();
        let output = run_piped(cmd, prompt, timeout).await?;

        let result = ProviderOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start.elapsed(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        if !output.status.success() {
            return Err(ProviderError::NonZeroExit {
                code: result.exit_code,
                stderr: result.stderr.clone(),
            });
        }

        Ok(result)
    }
}
