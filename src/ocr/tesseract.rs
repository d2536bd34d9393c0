//! Tesseract OCR engine (command-line).

use super::OcrEngine;
use crate::process;
use tokio::process::Command;
use tracing::{debug, warn};

pub struct TesseractEngine {
    command: String,
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait::async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn version(&self) -> Option<String> {
        let output = match Command::new(&self.command).arg("--version").output().await {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("TesseractEngine: '{}' not found", self.command);
                return None;
            }
            Err(e) => {
                warn!("TesseractEngine: failed to run '{}': {}", self.command, e);
                return None;
            }
        };

        if !output.status.success() {
            return None;
        }

        // Tesseract 3.x prints its banner on stderr, 4.x+ on stdout.
        parse_version(&output.stdout).or_else(|| parse_version(&output.stderr))
    }

    async fn recognize(&self, png: &[u8]) -> anyhow::Result<String> {
        debug!("TesseractEngine: recognizing {} byte image", png.len());
        let stdout = process::pipe_through(&self.command, &["stdin", "stdout"], png).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// Pull the version number out of a `tesseract --version` banner.
fn parse_version(banner: &[u8]) -> Option<String> {
    let banner = String::from_utf8_lossy(banner);
    let first = banner.lines().find(|l| !l.trim().is_empty())?.trim();
    let version = first.strip_prefix("tesseract").unwrap_or(first).trim();
    let version = version.strip_prefix('v').unwrap_or(version);

    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_modern_banner() {
        let banner = b"tesseract 5.3.0\n leptonica-1.82.0\n  libgif 5.2.1\n";
        assert_eq!(parse_version(banner).as_deref(), Some("5.3.0"));
    }

    #[test]
    fn test_parse_version_with_v_prefix() {
        assert_eq!(
            parse_version(b"tesseract v4.0.0.20181030\n").as_deref(),
            Some("4.0.0.20181030")
        );
    }

    #[test]
    fn test_parse_version_empty() {
        assert_eq!(parse_version(b""), None);
        assert_eq!(parse_version(b"tesseract\n"), None);
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let engine = TesseractEngine::new("definitely-not-tesseract");
        assert_eq!(engine.version().await, None);
        assert!(!engine.is_available().await);
    }

    #[tokio::test]
    async fn test_recognize_with_missing_binary_fails() {
        let engine = TesseractEngine::new("definitely-not-tesseract");
        let err = engine.recognize(b"\x89PNG").await.unwrap_err();
        assert!(err.to_string().contains("definitely-not-tesseract"));
    }
}
