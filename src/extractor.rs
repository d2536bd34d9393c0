//! Document text-extraction pipeline with per-page OCR fallback.
//!
//! Loader → (per page) Resolver → Aggregator. Failures from the loader are
//! already classified; anything else that escapes goes through
//! [`error::classify`] exactly once.

use crate::error::{self, ClassifiedError};
use crate::ocr::OcrEngine;
use crate::pdf::{OpenDocument, PdfBackend, PdfDocument};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Soft-success explanation returned when no page yielded any text.
pub const NO_TEXT_WARNING: &str = "No text was extracted from the PDF. The document may be empty, \
protected, or contain only images that could not be processed by OCR.";

/// Joins the text of consecutive pages.
const PAGE_SEPARATOR: &str = " ";

/// Document-level result.
///
/// `warning` is set exactly when `extracted_text` is empty and the document
/// has at least one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub extracted_text: String,
    pub page_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// How a single page's text was (or was not) obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    TextLayerFound(String),
    OcrRecovered(String),
    /// OCR raised an error; recovered locally so other pages still count.
    OcrFailed,
    /// Empty text layer and nothing rasterized to hand to OCR.
    BothEmpty,
}

impl PageOutcome {
    fn text(&self) -> Option<&str> {
        match self {
            Self::TextLayerFound(text) | Self::OcrRecovered(text) => Some(text),
            Self::OcrFailed | Self::BothEmpty => None,
        }
    }
}

/// Extraction pipeline orchestrator.
pub struct Extractor {
    pdf: Arc<dyn PdfBackend>,
    ocr: Arc<dyn OcrEngine>,
}

impl Extractor {
    pub fn new(pdf: Arc<dyn PdfBackend>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { pdf, ocr }
    }

    pub fn ocr(&self) -> &dyn OcrEngine {
        self.ocr.as_ref()
    }

    /// Extract the text of a PDF, falling back to OCR for pages without a text layer.
    pub async fn extract(&self, data: &[u8]) -> Result<ExtractionResult, ClassifiedError> {
        let doc = self.load(data).await?;
        let page_count = doc.page_count();
        info!("Extracting text from {} page(s)", page_count);

        let resolved = self.resolve_pages(&doc).await;
        doc.close();

        let outcomes = resolved.map_err(|e| {
            let classified = error::classify(&e);
            warn!("Extraction failed ({}): {:#}", classified.code, e);
            classified
        })?;

        let result = aggregate(&outcomes, page_count);
        info!(
            "Extraction complete: {} chars from {} page(s){}",
            result.extracted_text.len(),
            result.page_count,
            if result.warning.is_some() { " (no text found)" } else { "" }
        );
        Ok(result)
    }

    /// Check the OCR engine, then open the bytes as a non-empty paged document.
    async fn load(&self, data: &[u8]) -> Result<OpenDocument, ClassifiedError> {
        // OCR may be needed for any page, so a missing engine fails before any parsing work.
        if !self.ocr.is_available().await {
            warn!("OCR engine '{}' is not available", self.ocr.name());
            return Err(ClassifiedError::tesseract_not_found());
        }

        let doc = match self.pdf.open(data) {
            Ok(doc) => OpenDocument::new(doc),
            Err(e) => {
                let message = format!("{:#}", e);
                debug!("Failed to open document: {}", message);
                return Err(if error::is_password_error(&message) {
                    error::classify(&e)
                } else {
                    ClassifiedError::invalid_pdf(message)
                });
            }
        };

        if doc.page_count() == 0 {
            return Err(ClassifiedError::empty_pdf());
        }

        Ok(doc)
    }

    /// Resolve every page strictly in index order.
    async fn resolve_pages(&self, doc: &OpenDocument) -> Result<Vec<PageOutcome>> {
        let document = doc.document()?;
        let mut outcomes = Vec::with_capacity(doc.page_count());
        for index in 0..doc.page_count() {
            outcomes.push(self.resolve(document, index).await?);
        }
        Ok(outcomes)
    }

    /// Text layer first; rasterize and OCR only when the layer is empty.
    ///
    /// Rasterization and OCR failures are page-local and never abort the document.
    async fn resolve(&self, doc: &dyn PdfDocument, index: usize) -> Result<PageOutcome> {
        let text = doc.page_text(index)?;
        if !text.trim().is_empty() {
            debug!("Page {}: text layer ({} chars)", index + 1, text.len());
            return Ok(PageOutcome::TextLayerFound(text));
        }

        debug!("Page {}: empty text layer, falling back to OCR", index + 1);
        let ocr_text = match doc.render_page(index).await {
            Ok(png) if png.is_empty() => {
                debug!("Page {}: rasterizer produced no image", index + 1);
                return Ok(PageOutcome::BothEmpty);
            }
            Ok(png) => self.ocr.recognize(&png).await,
            Err(e) => Err(e),
        };

        // An empty recognition is still a successful OCR pass; aggregation drops it.
        Ok(match ocr_text {
            Ok(text) => {
                debug!("Page {}: OCR recovered {} chars", index + 1, text.len());
                PageOutcome::OcrRecovered(text)
            }
            Err(e) => {
                warn!("Page {}: OCR failed, skipping page: {:#}", index + 1, e);
                PageOutcome::OcrFailed
            }
        })
    }
}

/// Combine page outcomes, in page order, into the document result.
pub fn aggregate(outcomes: &[PageOutcome], page_count: usize) -> ExtractionResult {
    let extracted_text = outcomes
        .iter()
        .filter_map(PageOutcome::text)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR);

    let warning = if extracted_text.is_empty() && page_count > 0 {
        Some(NO_TEXT_WARNING.to_string())
    } else {
        None
    };

    ExtractionResult {
        extracted_text,
        page_count,
        warning,
    }
}
