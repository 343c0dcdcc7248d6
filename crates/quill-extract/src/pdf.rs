//! PDF text extraction using `pdftotext` (poppler-utils).

use std::io::Write;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use quill_core::defaults::EXTRACTION_CMD_TIMEOUT_SECS;
use quill_core::{Error, PdfExtractor, Result};

/// Run a command with a timeout, returning stdout as a string.
async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<String> {
    let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Extraction(format!("External command timed out after {}s", timeout_secs))
        })?
        .map_err(|e| Error::Extraction(format!("Failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Extraction(format!(
            "Command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extracts text from PDF bytes by shelling out to `pdftotext`.
///
/// Every `pdftotext` invocation is guarded by a per-command timeout. The
/// adapter validates the `%PDF` magic bytes up front so garbage uploads
/// fail with a useful message instead of a subprocess error.
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Check that the `pdftotext` binary is available on this host.
    pub async fn health_check() -> bool {
        match Command::new("pdftotext").arg("-v").output().await {
            // pdftotext -v prints version to stderr and exits with 0 or 99
            // depending on the version. Both indicate the binary exists.
            Ok(output) => output.status.success() || output.status.code() == Some(99),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl PdfExtractor for PdfTextExtractor {
    async fn extract_text(&self, data: &[u8]) -> Result<String> {
        if data.is_empty() {
            return Err(Error::Extraction(
                "Cannot extract text from empty PDF data".to_string(),
            ));
        }

        // Validate PDF magic bytes (%PDF)
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::Extraction(
                "Attachment is not a valid PDF (missing %PDF header)".to_string(),
            ));
        }

        // Write data to a temporary file (pdftotext reads from a file path)
        let mut tmpfile = NamedTempFile::new()
            .map_err(|e| Error::Extraction(format!("Failed to create temp file: {}", e)))?;
        tmpfile
            .write_all(data)
            .map_err(|e| Error::Extraction(format!("Failed to write temp file: {}", e)))?;
        let tmp_path = tmpfile.path().to_string_lossy().to_string();

        debug!(
            subsystem = "extract",
            component = "pdf_text",
            size = data.len(),
            "Extracting PDF text"
        );

        run_cmd_with_timeout(
            Command::new("pdftotext").arg(&tmp_path).arg("-"),
            EXTRACTION_CMD_TIMEOUT_SECS,
        )
        .await
    }
}
