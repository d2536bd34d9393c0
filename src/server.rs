//! HTTP transport: routing, input validation and base64 decoding.
//!
//! Handlers only validate and decode input; the extraction itself runs on its
//! own task through [`Extractor`].

use crate::config::ServerConfig;
use crate::error::{ClassifiedError, ErrorCode};
use crate::extractor::{ExtractionResult, Extractor};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, State,
    },
    response::{Json, Redirect},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Filename reported for base64 submissions that do not name their file.
const DEFAULT_FILENAME: &str = "document.pdf";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<Extractor>,
}

pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/extract-text", post(extract_text))
        .route("/extract-text/base64", post(extract_text_base64));

    if config.static_dir.is_dir() {
        router = router.nest_service("/static", ServeDir::new(&config.static_dir));
    } else {
        warn!(
            "Static directory {:?} not found, web UI disabled",
            config.static_dir
        );
    }

    router
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    #[serde(flatten)]
    pub result: ExtractionResult,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct Base64Request {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub api_version: &'static str,
    pub ocr_engine: String,
    pub ocr_available: bool,
    pub ocr_version: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn index() -> Redirect {
    Redirect::temporary("/static/index.html")
}

/// Health check, including OCR engine availability.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ocr = state.extractor.ocr();
    let ocr_version = ocr.version().await;

    Json(HealthResponse {
        status: "healthy",
        api_version: env!("CARGO_PKG_VERSION"),
        ocr_engine: ocr.name().to_string(),
        ocr_available: ocr_version.is_some(),
        ocr_version,
    })
}

/// Upload a PDF as multipart form data (field `file`) and extract its text.
async fn extract_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractResponse>, ClassifiedError> {
    let mut multipart = multipart.map_err(|e| {
        ClassifiedError::file_not_provided().with_detail("original_error", e.body_text())
    })?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_read_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !is_pdf_filename(&filename) {
            return Err(invalid_file_type(&filename, field.content_type()));
        }

        let data = field.bytes().await.map_err(multipart_read_error)?;
        if data.is_empty() {
            return Err(ClassifiedError::empty_file());
        }

        info!("Received file: {} ({} bytes)", filename, data.len());
        return run_extraction(&state, data.to_vec(), filename).await;
    }

    Err(ClassifiedError::file_not_provided())
}

/// Submit a PDF as a base64 string (optionally a `data:` URI) and extract its text.
async fn extract_text_base64(
    State(state): State<AppState>,
    payload: Result<Json<Base64Request>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ClassifiedError> {
    let Json(request) = payload.map_err(|e| match e {
        JsonRejection::BytesRejection(_) => file_read_error(e.body_text()),
        _ => ClassifiedError::file_not_provided().with_detail("original_error", e.body_text()),
    })?;

    let encoded = request
        .data
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(ClassifiedError::file_not_provided)?;

    let filename = request
        .filename
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    if !is_pdf_filename(&filename) {
        return Err(invalid_file_type(&filename, None));
    }

    let data = decode_base64_payload(&encoded).map_err(|e| {
        ClassifiedError::new(ErrorCode::InvalidBase64, "The base64 payload could not be decoded")
            .with_detail("original_error", e.to_string())
    })?;
    if data.is_empty() {
        return Err(ClassifiedError::empty_file());
    }

    info!("Received base64 file: {} ({} bytes)", filename, data.len());
    run_extraction(&state, data, filename).await
}

// ============================================================================
// Helper functions
// ============================================================================

/// Run the pipeline on its own task so a panic surfaces as `UNEXPECTED_ERROR`.
async fn run_extraction(
    state: &AppState,
    data: Vec<u8>,
    filename: String,
) -> Result<Json<ExtractResponse>, ClassifiedError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("extract", %request_id, filename = %filename);
    let extractor = state.extractor.clone();

    let result = tokio::spawn(async move { extractor.extract(&data).await }.instrument(span))
        .await
        .map_err(|e| {
            error!("Extraction task {} failed: {}", request_id, e);
            ClassifiedError::unexpected(e)
        })??;

    Ok(Json(ExtractResponse { result, filename }))
}

/// Decode a base64 payload, stripping a leading `data:` URI prefix up to the first comma.
pub fn decode_base64_payload(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let trimmed = input.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(_) => trimmed.split_once(',').map_or(trimmed, |(_, data)| data),
        None => trimmed,
    };

    let cleaned: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    BASE64.decode(cleaned)
}

fn is_pdf_filename(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

fn invalid_file_type(filename: &str, content_type: Option<&str>) -> ClassifiedError {
    ClassifiedError::new(ErrorCode::InvalidFileType, "The file must be a PDF")
        .with_detail("provided_file", filename)
        .with_detail("content_type", content_type.map(str::to_string))
}

fn multipart_read_error(e: MultipartError) -> ClassifiedError {
    file_read_error(e.body_text())
}

fn file_read_error(original_error: String) -> ClassifiedError {
    ClassifiedError::new(ErrorCode::FileReadError, "Failed to read the uploaded file")
        .with_detail("original_error", original_error)
}
