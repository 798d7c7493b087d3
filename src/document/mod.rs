//! Document ingestion: turns a file, stdin, or inline text into a [`Document`]

mod pdf;

use crate::error::IngestError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Immutable document text, cheap to clone across branches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: Arc<str>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Arc::from(text.into()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Short content hash used to name reports
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.text.as_bytes());
        format!("{:x}", hash)[..12].to_string()
    }
}

/// Where the raw document comes from
#[derive(Debug, Clone)]
pub enum DocumentSource {
    File(PathBuf),
    Text(String),
    Stdin,
}

#[async_trait]
pub trait TextCapability: Send + Sync {
    async fn extract(&self, source: &DocumentSource) -> Result<Document, IngestError>;
}

/// Reads plain-text files, stdin and inline text; PDFs go through `pdftotext`
pub struct LocalText {
    pub pdftotext: PathBuf,
    pub max_bytes: usize,
    pub timeout: Duration,
}

#[async_trait]
impl TextCapability for LocalText {
    async fn extract(&self, source: &DocumentSource) -> Result<Document, IngestError> {
        let text = match source {
            DocumentSource::Text(text) => {
                self.check_size(text.len())?;
                text.clone()
            }
            DocumentSource::Stdin => {
                let mut buf = Vec::new();
                tokio::io::stdin()
                    .take(self.max_bytes as u64 + 1)
                    .read_to_end(&mut buf)
                    .await
                    .map_err(IngestError::Stdin)?;
                self.check_size(buf.len())?;
                String::from_utf8(buf).map_err(|_| IngestError::NotUtf8)?
            }
            DocumentSource::File(path) => self.read_file(path).await?,
        };

        if text.trim().is_empty() {
            return Err(IngestError::Empty);
        }

        debug!("Extracted document: {} bytes", text.len());
        Ok(Document::new(text))
    }
}

impl LocalText {
    fn check_size(&self, size: usize) -> Result<(), IngestError> {
        if size > self.max_bytes {
            return Err(IngestError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<String, IngestError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| IngestError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;
        self.check_size(metadata.len() as usize)?;

        if is_pdf(path) {
            return pdf::extract_pdf_text(&self.pdftotext, path, self.timeout).await;
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| IngestError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        String::from_utf8(bytes).map_err(|_| IngestError::NotUtf8)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
