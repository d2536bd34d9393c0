//! Server configuration.
//!
//! Values come from the process environment (a `.env` file is loaded first by
//! `main`). Every setting has a default, so an empty environment is valid.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_UPLOAD_MB: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tesseract binary used for OCR.
    pub tesseract_cmd: String,
    /// pdftoppm binary used to rasterize pages.
    pub pdftoppm_cmd: String,
    /// Directory served under `/static` when it exists.
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tesseract_cmd: "tesseract".to_string(),
            pdftoppm_cmd: "pdftoppm".to_string(),
            static_dir: PathBuf::from("static"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("Invalid PORT: {:?}", v))?,
            None => defaults.port,
        };

        let max_upload_bytes = match get("MAX_UPLOAD_MB") {
            Some(v) => v
                .parse::<usize>()
                .ok()
                .and_then(|mb| mb.checked_mul(1024 * 1024))
                .with_context(|| format!("Invalid MAX_UPLOAD_MB: {:?}", v))?,
            None => defaults.max_upload_bytes,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            tesseract_cmd: get("TESSERACT_CMD").unwrap_or(defaults.tesseract_cmd),
            pdftoppm_cmd: get("PDFTOPPM_CMD").unwrap_or(defaults.pdftoppm_cmd),
            static_dir: get("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
            max_upload_bytes,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}
