//! Image acquisition: URLs, local files and in-memory bytes.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::AcquisitionError;
use crate::models::config::BillscanConfig;

/// Where a receipt image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Remote image fetched over HTTP(S).
    Url(String),
    /// Local file.
    Path(PathBuf),
    /// Encoded image already in memory.
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Interpret a user-supplied reference. `http://` and `https://`
    /// references are URLs, anything else is a file path.
    pub fn parse(reference: &str) -> Self {
        let trimmed = reference.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ImageSource::Url(trimmed.to_string())
        } else {
            ImageSource::Path(PathBuf::from(trimmed))
        }
    }

    /// Short label used in logs and batch reports.
    pub fn label(&self) -> String {
        match self {
            ImageSource::Url(url) => url.clone(),
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

/// Fetches and decodes receipt images.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    http: reqwest::Client,
}

impl ImageLoader {
    /// Create a loader with the given download timeout.
    pub fn new(timeout: Duration) -> Result<Self, AcquisitionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AcquisitionError::Http(e.to_string()))?;
        Ok(Self { http })
    }

    pub fn from_config(config: &BillscanConfig) -> Result<Self, AcquisitionError> {
        Self::new(Duration::from_secs(config.download_timeout_secs))
    }

    /// Load the image referenced by `source`.
    pub async fn load(&self, source: &ImageSource) -> Result<DynamicImage, AcquisitionError> {
        let bytes = match source {
            ImageSource::Url(url) => self.download(url).await?,
            ImageSource::Path(path) => std::fs::read(path)?,
            ImageSource::Bytes(bytes) => return decode(bytes),
        };
        decode(&bytes)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AcquisitionError> {
        info!("Downloading receipt image from {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AcquisitionError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AcquisitionError::Http(e.to_string()))?;

        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, AcquisitionError> {
    let image =
        image::load_from_memory(bytes).map_err(|e| AcquisitionError::Decode(e.to_string()))?;
    debug!("Decoded image {}x{}", image.width(), image.height());
    Ok(image)
}
