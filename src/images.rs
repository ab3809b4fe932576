use crate::api::{resolve_against, StoryApi};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("Invalid URL: {0}")] Url(String),
    #[error("Invalid data URL")] DataUrl,
    #[error("Base64 decode error: {0}")] Base64(String),
    #[error("Image decode error: {0}")] Decode(String),
}

/// Where exported scene images come from.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, ImageError>;
}

/// Fetches `http(s)` image URLs and unpacks base64 `data:` URLs in process.
/// Relative paths are resolved against the backend base URL.
pub struct HttpImageSource {
    client: Client,
    base_url: String,
}

impl HttpImageSource {
    pub fn new(api: &StoryApi) -> Self {
        Self { client: api.client().clone(), base_url: api.base_url().to_string() }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> Result<Bytes, ImageError> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }
        let url = resolve_against(&self.base_url, url).map_err(|e| ImageError::Url(e.to_string()))?;
        info!("🖼️ Fetching image {}", preview(&url));
        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| ImageError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Http(format!("status={}", status)));
        }
        response.bytes().await.map_err(|e| ImageError::Http(e.to_string()))
    }
}

pub fn decode_data_url(url: &str) -> Result<Bytes, ImageError> {
    let rest = url.strip_prefix("data:").ok_or(ImageError::DataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(ImageError::DataUrl)?;
    if !meta.ends_with(";base64") {
        return Err(ImageError::DataUrl);
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map(Bytes::from)
        .map_err(|e| ImageError::Base64(e.to_string()))
}

/// Decoded 8-bit RGB pixels, ready to be placed in a PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl EmbeddedImage {
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        let rgb = decoded.to_rgb8();
        Ok(Self { width: rgb.width(), height: rgb.height(), rgb: rgb.into_raw() })
    }
}

/// Shortens long values (data URLs mostly) for log lines.
pub(crate) fn preview(s: &str) -> String {
    const MAX: usize = 80;
    if s.chars().count() <= MAX {
        s.to_string()
    } else {
        let head: String = s.chars().take(MAX).collect();
        format!("{}...[{} chars total]", head, s.len())
    }
}
