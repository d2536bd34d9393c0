//! PDF parsing abstraction.
//!
//! [`PdfBackend`] opens raw bytes into a paged [`PdfDocument`]; the pipeline
//! only ever holds one through an [`OpenDocument`], which guarantees the
//! document is closed exactly once however the request ends.

pub mod lopdf_backend;

pub use lopdf_backend::LopdfBackend;

/// Opens raw bytes as a paged document.
pub trait PdfBackend: Send + Sync {
    fn open(&self, data: &[u8]) -> anyhow::Result<Box<dyn PdfDocument>>;
}

/// A decoded, paged document. Pages are addressed by zero-based index.
#[async_trait::async_trait]
pub trait PdfDocument: Send + Sync {
    fn page_count(&self) -> usize;

    /// Text layer of a page, without any rendering.
    fn page_text(&self, index: usize) -> anyhow::Result<String>;

    /// Rasterize a page at its default resolution, returned as PNG bytes.
    async fn render_page(&self, index: usize) -> anyhow::Result<Vec<u8>>;

    /// Release the document's resources.
    fn close(&mut self);
}

/// Owning handle around an open document.
pub struct OpenDocument {
    inner: Option<Box<dyn PdfDocument>>,
}

impl OpenDocument {
    pub fn new(doc: Box<dyn PdfDocument>) -> Self {
        Self { inner: Some(doc) }
    }

    pub fn page_count(&self) -> usize {
        self.inner.as_ref().map(|d| d.page_count()).unwrap_or(0)
    }

    pub fn document(&self) -> anyhow::Result<&dyn PdfDocument> {
        self.inner
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("document is already closed"))
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut doc) = self.inner.take() {
            doc.close();
            tracing::debug!("Document closed");
        }
    }
}

impl Drop for OpenDocument {
    fn drop(&mut self) {
        self.release();
    }
}
