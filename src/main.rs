//! PDF Text Extractor - text-layer extraction with per-page OCR fallback, served over HTTP.

mod config;
mod error;
mod extractor;
mod ocr;
mod pdf;
mod process;
mod server;

use config::ServerConfig;
use extractor::Extractor;
use ocr::{OcrEngine, TesseractEngine};
use pdf::LopdfBackend;
use server::AppState;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "pdf_text_extractor=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    info!("Configuration loaded: {:?}", config);

    let ocr = Arc::new(TesseractEngine::new(config.tesseract_cmd.clone()));
    match ocr.version().await {
        Some(version) => info!("OCR engine: tesseract {}", version),
        None => warn!(
            "Tesseract not found ('{}'); extraction requests will fail until it is installed",
            config.tesseract_cmd
        ),
    }

    let pdf = Arc::new(LopdfBackend::new(config.pdftoppm_cmd.clone()));
    let state = AppState {
        extractor: Arc::new(Extractor::new(pdf, ocr)),
    };

    let app = server::create_router(state, &config);

    // Run server
    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
