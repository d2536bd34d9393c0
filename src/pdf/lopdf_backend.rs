//! lopdf-backed documents, rasterized through `pdftoppm`.

use super::{PdfBackend, PdfDocument};
use crate::process;
use anyhow::{Context, Result};
use image::{ImageFormat, ImageOutputFormat};
use lopdf::encryption::DecryptionError;
use lopdf::Document;
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Opens documents with lopdf and renders pages with poppler's `pdftoppm`.
pub struct LopdfBackend {
    pdftoppm: String,
}

impl LopdfBackend {
    pub fn new(pdftoppm: impl Into<String>) -> Self {
        Self {
            pdftoppm: pdftoppm.into(),
        }
    }
}

impl Default for LopdfBackend {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl PdfBackend for LopdfBackend {
    fn open(&self, data: &[u8]) -> Result<Box<dyn PdfDocument>> {
        let mut doc = Document::load_mem(data)
            .map_err(|e| anyhow::anyhow!("Failed to load PDF: {}", e))?;

        if doc.is_encrypted() {
            // Most "encrypted" PDFs only restrict permissions and open with an empty user password.
            doc.decrypt("")
                .map_err(|e| anyhow::anyhow!(decrypt_error_message(&e)))?;
        }

        let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        page_numbers.sort_unstable();

        debug!("LopdfBackend: opened document with {} pages", page_numbers.len());

        Ok(Box::new(LopdfDocument {
            doc: Some(doc),
            page_numbers,
            source: Arc::from(data),
            pdftoppm: self.pdftoppm.clone(),
        }))
    }
}

struct LopdfDocument {
    doc: Option<Document>,
    /// 1-based lopdf page numbers in reading order.
    page_numbers: Vec<u32>,
    /// Original bytes, handed to the rasterizer.
    source: Arc<[u8]>,
    pdftoppm: String,
}

impl LopdfDocument {
    fn page_number(&self, index: usize) -> Result<u32> {
        self.page_numbers
            .get(index)
            .copied()
            .with_context(|| format!("page index {} out of range", index))
    }
}

#[async_trait::async_trait]
impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        let doc = self.doc.as_ref().context("document is closed")?;
        let page_num = self.page_number(index)?;
        doc.extract_text(&[page_num])
            .with_context(|| format!("Failed to extract text from page {}", page_num))
    }

    async fn render_page(&self, index: usize) -> Result<Vec<u8>> {
        let page = self.page_number(index)?.to_string();

        // No output root: pdftoppm writes the single rendered page to stdout as PPM.
        let args = ["-f", page.as_str(), "-l", page.as_str(), "-"];
        let ppm = process::pipe_through(&self.pdftoppm, &args, &self.source)
            .await
            .with_context(|| format!("Failed to rasterize page {}", page))?;

        let png = ppm_to_png(&ppm)?;
        debug!("LopdfBackend: page {} rasterized ({} byte PNG)", page, png.len());
        Ok(png)
    }

    fn close(&mut self) {
        self.doc = None;
    }
}

/// Only a wrong password means the document is locked to us; lopdf's
/// unsupported schemes (AES among them) get their own wording.
fn decrypt_error_message(e: &lopdf::Error) -> String {
    match e {
        lopdf::Error::Decryption(DecryptionError::UnsupportedEncryption) => {
            format!("PDF uses an unsupported encryption scheme: {}", e)
        }
        _ => format!("PDF is encrypted and requires a password: {}", e),
    }
}

/// Re-encode a PPM raster as PNG.
fn ppm_to_png(ppm: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory_with_format(ppm, ImageFormat::Pnm)
        .context("Rasterizer produced an unreadable image")?;
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .context("Failed to encode page image as PNG")?;
    Ok(png)
}
