use crate::error::IngestError;
use crate::provider::command_for;
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout as tokio_timeout;

/// Extract text with `pdftotext <file> -`, one page after another
pub async fn extract_pdf_text(
    binary: &Path,
    path: &Path,
    timeout: Duration,
) -> Result<String, IngestError> {
    let mut cmd = command_for(binary);
    cmd.arg("-layout").arg(path).arg("-");
    cmd.kill_on_drop(true);

    let output = tokio_timeout(timeout, cmd.output())
        .await
        .map_err(|_| IngestError::Timeout(timeout))?
        .map_err(|e| IngestError::Pdf(format!("failed to run {}: {}", binary.display(), e)))?;

    if !output.status.success() {
        return Err(IngestError::Pdf(format!(
            "{} exited with code {}: {}",
            binary.display(),
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    // pdftotext separates pages with form feeds
    let text = String::from_utf8_lossy(&output.stdout).replace('\u{c}', "\n");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary() {
        let result = extract_pdf_text(
            Path::new("/nonexistent/pdftotext"),
            Path::new("essay.pdf"),
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(IngestError::Pdf(msg)) if msg.contains("failed to run")));
    }
}
