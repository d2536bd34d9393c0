//! OCR engine abstraction.
//!
//! Defines the [`OcrEngine`] trait consumed by the extraction pipeline so the
//! concrete backend (Tesseract CLI today) can be swapped or faked in tests.

pub mod tesseract;

pub use tesseract::TesseractEngine;

/// Async trait implemented by each OCR backend.
///
/// Engines are treated as stateless, re-entrant capabilities: concurrent
/// requests may call `recognize` on the same instance.
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Engine version, or `None` when the engine cannot be found.
    async fn version(&self) -> Option<String>;

    async fn is_available(&self) -> bool {
        self.version().await.is_some()
    }

    /// Recognize text in a PNG image, returning the engine's raw output.
    async fn recognize(&self, png: &[u8]) -> anyhow::Result<String>;
}
