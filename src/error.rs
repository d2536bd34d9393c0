//! Error taxonomy and classification.
//!
//! Every failure that reaches the transport boundary is a [`ClassifiedError`]
//! carrying a stable machine-readable code, a human-readable message and a
//! free-form diagnostic `details` map.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Substrings (lowercase) that mark a failure as a password-protection problem.
const PASSWORD_MARKERS: &[&str] = &["password", "encrypt"];

/// Stable error codes exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TesseractNotFound,
    InvalidPdf,
    EmptyPdf,
    EmptyFile,
    InvalidFileType,
    FileNotProvided,
    InvalidBase64,
    PdfProtected,
    PdfProcessingError,
    UnexpectedError,
    FileReadError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TesseractNotFound => "TESSERACT_NOT_FOUND",
            Self::InvalidPdf => "INVALID_PDF",
            Self::EmptyPdf => "EMPTY_PDF",
            Self::EmptyFile => "EMPTY_FILE",
            Self::InvalidFileType => "INVALID_FILE_TYPE",
            Self::FileNotProvided => "FILE_NOT_PROVIDED",
            Self::InvalidBase64 => "INVALID_BASE64",
            Self::PdfProtected => "PDF_PROTECTED",
            Self::PdfProcessingError => "PDF_PROCESSING_ERROR",
            Self::UnexpectedError => "UNEXPECTED_ERROR",
            Self::FileReadError => "FILE_READ_ERROR",
        }
    }

    /// HTTP status this code is reported with.
    pub fn status(self) -> StatusCode {
        match self {
            Self::TesseractNotFound | Self::PdfProcessingError | Self::UnexpectedError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::InvalidPdf
            | Self::EmptyPdf
            | Self::EmptyFile
            | Self::InvalidFileType
            | Self::FileNotProvided
            | Self::InvalidBase64
            | Self::PdfProtected
            | Self::FileReadError => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal, fully classified failure for the current request.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ClassifiedError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Map<String, Value>,
}

impl ClassifiedError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Map::new(),
        }
    }

    /// Attach a diagnostic value under `key`.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.status()
    }

    pub fn tesseract_not_found() -> Self {
        Self::new(
            ErrorCode::TesseractNotFound,
            "Tesseract OCR is not installed or not on the PATH",
        )
        .with_detail(
            "solution",
            "Install Tesseract OCR and make sure the binary is on the PATH (or set TESSERACT_CMD).",
        )
    }

    pub fn invalid_pdf(original_error: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InvalidPdf, "The provided file is not a valid PDF")
            .with_detail("original_error", original_error.to_string())
    }

    pub fn empty_pdf() -> Self {
        Self::new(ErrorCode::EmptyPdf, "The PDF contains no pages")
    }

    pub fn empty_file() -> Self {
        Self::new(ErrorCode::EmptyFile, "The file is empty")
    }

    pub fn file_not_provided() -> Self {
        Self::new(ErrorCode::FileNotProvided, "No file was provided")
    }

    pub fn unexpected(err: impl fmt::Display + fmt::Debug) -> Self {
        Self::new(
            ErrorCode::UnexpectedError,
            format!("Unexpected error: {}", err),
        )
        .with_detail("traceback", format!("{:?}", err))
    }
}

/// Wire body for every error response.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: bool,
    error_code: ErrorCode,
    message: &'a str,
    details: &'a Map<String, Value>,
}

impl IntoResponse for ClassifiedError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: true,
            error_code: self.code,
            message: &self.message,
            details: &self.details,
        };
        (self.http_status(), Json(body)).into_response()
    }
}

/// Whether an error message indicates a password-protected document.
pub fn is_password_error(message: &str) -> bool {
    let message = message.to_lowercase();
    PASSWORD_MARKERS.iter().any(|m| message.contains(m))
}

/// Map a failure that escaped the loader and resolver into the taxonomy.
///
/// The whole `anyhow` context chain is inspected, so a password hint buried in
/// a lower-level cause still classifies as `PDF_PROTECTED`.
pub fn classify(err: &anyhow::Error) -> ClassifiedError {
    let chain = format!("{:#}", err);

    if is_password_error(&chain) {
        return ClassifiedError::new(ErrorCode::PdfProtected, "The PDF is password protected")
            .with_detail("original_error", chain);
    }

    ClassifiedError::new(
        ErrorCode::PdfProcessingError,
        format!("Failed to process the PDF: {}", chain),
    )
    .with_detail("traceback", format!("{:?}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::TesseractNotFound.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::PdfProcessingError.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::UnexpectedError.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::InvalidPdf.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::EmptyPdf.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::EmptyFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::PdfProtected.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::FileReadError.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_code_serializes_like_as_str() {
        for code in [
            ErrorCode::TesseractNotFound,
            ErrorCode::InvalidBase64,
            ErrorCode::PdfProcessingError,
            ErrorCode::FileNotProvided,
        ] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, Value::String(code.as_str().to_string()));
        }
    }

    #[test]
    fn test_classify_password_case_insensitive() {
        let err = anyhow!("Document requires a PASSWORD to open");
        let classified = classify(&err);
        assert_eq!(classified.code, ErrorCode::PdfProtected);
        assert_eq!(classified.http_status(), StatusCode::BAD_REQUEST);
        assert!(classified.details.contains_key("original_error"));
    }

    #[test]
    fn test_classify_password_in_cause_chain() {
        let err: anyhow::Error = Err::<(), _>(anyhow!("wrong password"))
            .context("failed to read page 3")
            .unwrap_err();
        assert_eq!(classify(&err).code, ErrorCode::PdfProtected);
    }

    #[test]
    fn test_classify_other_failure_keeps_traceback() {
        let err = anyhow!("content stream is truncated");
        let classified = classify(&err);
        assert_eq!(classified.code, ErrorCode::PdfProcessingError);
        assert_eq!(classified.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(classified.message.contains("content stream is truncated"));
        assert!(classified.details["traceback"]
            .as_str()
            .unwrap()
            .contains("content stream is truncated"));
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = ClassifiedError::invalid_pdf("bad xref").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], true);
        assert_eq!(json["error_code"], "INVALID_PDF");
        assert_eq!(json["details"]["original_error"], "bad xref");
        assert!(json["message"].is_string());
    }
}
