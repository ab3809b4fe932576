use crate::models::{
    EditSceneRequest, ImageGenerationRequest, ImageGenerationResponse, NarrationRequest,
    NarrationResponse, RegenerateImageRequest, RegenerateImageResponse, RegenerateSceneRequest,
    SceneContentResponse, Story, StoryGenerationRequest, UpscaleImageRequest, UpscaleImageResponse,
};
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{error, info};

pub const DEFAULT_VOICE: &str = "default";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API Error: {0}")] Status(String),
    #[error("HTTP error: {0}")] Http(String),
    #[error("Invalid URL: {0}")] Url(String),
    #[error("Decode error: {0}")] Decode(String),
}

/// Client for the story generation backend.
///
/// Every call is a single attempt: no retries, no timeout, no caching.
/// Any non-2xx answer becomes [`ApiError::Status`] carrying the status text.
#[derive(Debug, Clone)]
pub struct StoryApi {
    client: Client,
    base_url: String,
}

impl StoryApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Resolves an asset URL returned by the backend. Absolute URLs (including
    /// `data:` URLs) pass through; paths like `/static/x.png` are joined onto
    /// the backend origin.
    pub fn resolve_url(&self, url: &str) -> Result<String, ApiError> {
        resolve_against(&self.base_url, url)
    }

    fn endpoint(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        info!("🔗 Calling backend: {}", endpoint);
        let response = request
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!("❌ Request to {} failed: {}", endpoint, e);
                ApiError::Http(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or(status.as_str()).to_string();
            error!("❌ {} answered {}", endpoint, status);
            return Err(ApiError::Status(status_text));
        }

        response.json::<T>().await.map_err(|e| {
            error!("❌ Could not parse response of {}: {}", endpoint, e);
            ApiError::Decode(e.to_string())
        })
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.endpoint(endpoint)).json(body);
        self.send(request, endpoint).await
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let request = self.client.get(self.endpoint(endpoint));
        self.send(request, endpoint).await
    }

    pub async fn generate_story(&self, request: &StoryGenerationRequest) -> Result<Story, ApiError> {
        self.post("/generate-story", request).await
    }

    pub async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, ApiError> {
        self.post("/generate-image", request).await
    }

    pub async fn regenerate_scene(
        &self,
        request: &RegenerateSceneRequest,
    ) -> Result<SceneContentResponse, ApiError> {
        self.post("/regenerate-scene", request).await
    }

    pub async fn edit_scene(
        &self,
        request: &EditSceneRequest,
    ) -> Result<SceneContentResponse, ApiError> {
        self.post("/edit-scene", request).await
    }

    pub async fn regenerate_image(
        &self,
        request: &RegenerateImageRequest,
    ) -> Result<RegenerateImageResponse, ApiError> {
        self.post("/regenerate-image", request).await
    }

    pub async fn save_story(&self, story: &Story) -> Result<Story, ApiError> {
        self.post("/stories", story).await
    }

    pub async fn get_story(&self, id: &str) -> Result<Story, ApiError> {
        self.get(&format!("/stories/{id}")).await
    }

    pub async fn get_public_stories(&self) -> Result<Vec<Story>, ApiError> {
        self.get("/stories/public").await
    }

    pub async fn upscale_image(&self, image_url: &str) -> Result<UpscaleImageResponse, ApiError> {
        self.post("/upscale-image", &UpscaleImageRequest { image_url: image_url.to_string() }).await
    }

    pub async fn generate_narration(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<NarrationResponse, ApiError> {
        let body = NarrationRequest { text: text.to_string(), voice: voice.to_string() };
        self.post("/generate-narration", &body).await
    }
}

pub fn resolve_against(base_url: &str, url: &str) -> Result<String, ApiError> {
    if let Ok(absolute) = Url::parse(url) {
        return Ok(absolute.to_string());
    }
    let base = Url::parse(base_url).map_err(|e| ApiError::Url(format!("{base_url}: {e}")))?;
    base.join(url)
        .map(|u| u.to_string())
        .map_err(|e| ApiError::Url(format!("{url}: {e}")))
}
