mod chat;
mod claude;
mod codex;

pub use chat::ChatApiRunner;
pub use claude::ClaudeRunner;
pub use codex::CodexRunner;

use crate::config::{Config, Provider};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout as tokio_timeout;

#[derive(Debug)]
pub struct ProviderOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub exit_code: i32,
}

#[async_trait]
pub trait Runner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, prompt: &str, timeout: Duration)
        -> Result<ProviderOutput, ProviderError>;
}

/// Create a runner for the given provider
pub fn create_runner(config: &Config, provider: Provider) -> Arc<dyn Runner> {
    match provider {
        Provider::ClaudeCli => Arc::new(ClaudeRunner {
            binary: config.providers.claude_cli.binary.clone(),
            model: config.providers.claude_cli.model.clone(),
        }),
        Provider::CodexCli => Arc::new(CodexRunner {
            binary: config.providers.codex_cli.binary.clone(),
            model: config.providers.codex_cli.model.clone(),
        }),
        Provider::ChatApi => Arc::new(ChatApiRunner::new(config.providers.chat_api.clone())),
    }
}

/// Build a command, using PATH lookup for bare binary names
pub(crate) fn command_for(binary: &std::path::Path) -> Command {
    let binary_str = binary.to_string_lossy();
    if binary_str.contains('/') || binary_str.contains('\\') {
        Command::new(binary)
    } else {
        Command::new(binary_str.as_ref())
    }
}

/// Spawn `cmd`, feed `prompt` on stdin and collect its output, all under `timeout`
///
/// Stdin is written while stdout/stderr are drained, so large prompts cannot deadlock
/// against a chatty child. Prompts never go through argv, which caps a single argument at
/// 128 KiB on Linux.
pub(crate) async fn run_piped(
    mut cmd: Command,
    prompt: &str,
    timeout: Duration,
) -> Result<Output, ProviderError> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(ProviderError::Io)?;
    let stdin = child.stdin.take();

    let feed = async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(prompt.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        Ok::<(), std::io::Error>(())
    };

    let (fed, output) = tokio_timeout(timeout, async {
        tokio::join!(feed, child.wait_with_output())
    })
    .await
    .map_err(|_| ProviderError::Timeout(timeout))?;

    let output = output.map_err(ProviderError::Io)?;
    match fed {
        // Child closed stdin early; its exit status tells the story
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
        Err(e) => return Err(ProviderError::Io(e)),
        Ok(()) => {}
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_runner_names() {
        let config = Config::default();
        assert_eq!(create_runner(&config, Provider::ClaudeCli).name(), "claude_cli");
        assert_eq!(create_runner(&config, Provider::CodexCli).name(), "codex_cli");
        assert_eq!(create_runner(&config, Provider::ChatApi).name(), "chat_api");
    }

    /// Executable shell script standing in for a provider CLI
    #[cfg(unix)]
    fn stub_binary(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("stub-cli");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{}", body).unwrap();
        file.sync_all().unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_claude_prompt_larger_than_argv_limit() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = ClaudeRunner {
            binary: stub_binary(&dir, r#"n=$(wc -c | tr -d ' '); printf '%s|%s' "$n" "$*""#),
            model: "sonnet".to_string(),
        };

        let prompt = "a".repeat(200 * 1024);
        let output = runner.execute(&prompt, Duration::from_secs(10)).await.unwrap();
        assert_eq!(
            output.stdout.trim(),
            "204800|-p --model sonnet --output-format json"
        );
        assert_eq!(output.exit_code, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_codex_reads_last_message_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = CodexRunner {
            binary: stub_binary(&dir, r#"cat > /dev/null; printf 'final answer' > "$6""#),
            model: "gpt-4.1".to_string(),
        };

        let prompt = "b".repeat(300 * 1024);
        let output = runner.execute(&prompt, Duration::from_secs(10)).await.unwrap();
        assert_eq!(output.stdout, "final answer");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_codex_non_zero_exit() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = CodexRunner {
            binary: stub_binary(&dir, "cat > /dev/null; echo boom >&2; exit 3"),
            model: "gpt-4.1".to_string(),
        };

        match runner.execute("prompt", Duration::from_secs(10)).await {
            Err(ProviderError::NonZeroExit { code, stderr }) => {
                assert_eq!(code, 3);
                assert!(stderr.contains("boom"));
            }
            other => panic!("expected non-zero exit, got {:?}", other.map(|o| o.stdout)),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stalled_stdin_hits_timeout() {
        let dir = tempfile::TempDir::new().unwrap();
        // Never reads stdin, so a prompt bigger than the pipe buffer blocks the writer
        let runner = CodexRunner {
            binary: stub_binary(&dir, "sleep 5"),
            model: "gpt-4.1".to_string(),
        };

        let prompt = "c".repeat(1024 * 1024);
        let start = std::time::Instant::now();
        let result = runner.execute(&prompt, Duration::from_millis(200)).await;
        assert!(matches!(result, Err(ProviderError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let runner = ClaudeRunner {
            binary: "/nonexistent/polygrade-test-binary".into(),
            model: "sonnet".to_string(),
        };
        let result = runner.execute("hello", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ProviderError::Io(_))));
    }
}
