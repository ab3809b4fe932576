use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    api::{ApiError, StoryApi, DEFAULT_VOICE},
    app::{generate_story, App, View},
    config::Config,
    creator::{
        option_label, CharacterDraft, CreatorUpdate, FormError, StoryCreator, ART_STYLES, AUDIENCES,
        GENRES, TONES,
    },
    gallery::{Gallery, GalleryQuery},
    images::ImageSource,
    models::{Character, Scene, Story},
    pdf::ExportError,
    viewer::{MemoryClipboard, ShareData, ShareOutcome, ViewerError, NO_CONTENT},
};

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<RwLock<App>>,
    pub api: Arc<StoryApi>,
    pub images: Arc<dyn ImageSource>,
    pub clipboard: Arc<MemoryClipboard>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, api: StoryApi, images: Arc<dyn ImageSource>) -> Self {
        Self {
            app: Arc::default(),
            api: Arc::new(api),
            images,
            clipboard: Arc::default(),
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")] NotFound(String),
    #[error("{0}")] BadRequest(String),
    #[error("{0}")] Conflict(String),
    #[error("{0}")] Backend(String),
    #[error("{0}")] Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        AppError::Backend(e.to_string())
    }
}

impl From<FormError> for AppError {
    fn from(e: FormError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<ViewerError> for AppError {
    fn from(e: ViewerError) -> Self {
        match e {
            ViewerError::SceneNotFound(_) => AppError::NotFound(e.to_string()),
            ViewerError::NoImage(_) | ViewerError::Export(ExportError::EmptyTitle) => {
                AppError::BadRequest(e.to_string())
            }
            ViewerError::StoryChanged => AppError::Conflict(e.to_string()),
            ViewerError::Api(api) => api.into(),
            ViewerError::Export(_) | ViewerError::Share(_) => AppError::Internal(e.to_string()),
        }
    }
}

fn no_viewer() -> AppError {
    AppError::NotFound("no story is open".into())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/view", post(set_view))
        .route("/api/creator", get(get_creator).post(update_creator))
        .route("/api/creator/options", get(creator_options))
        .route("/api/creator/character-form", post(open_character_form).delete(cancel_character_form))
        .route("/api/creator/characters", post(add_character))
        .route("/api/creator/characters/:id", delete(remove_character))
        .route("/api/creator/submit", post(submit_creator))
        .route("/api/viewer", get(get_viewer))
        .route("/api/viewer/next", post(next_scene))
        .route("/api/viewer/previous", post(previous_scene))
        .route("/api/viewer/scenes/:scene_id/edit", post(edit_scene))
        .route("/api/viewer/scenes/:scene_id/regenerate", post(regenerate_scene))
        .route("/api/viewer/scenes/:scene_id/regenerate-image", post(regenerate_image))
        .route("/api/viewer/scenes/:scene_id/upscale", post(upscale_image))
        .route("/api/viewer/scenes/:scene_id/narration", post(narrate_scene))
        .route("/api/viewer/share", get(share_story))
        .route("/api/viewer/export", get(export_pdf))
        .route("/api/viewer/publish", post(publish_story))
        .route("/api/gallery", get(list_gallery))
        .route("/api/gallery/load", post(load_gallery))
        .route("/api/gallery/:id/open", post(open_gallery_story))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

/// What the viewer currently shows, or the fallback message.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SceneView {
    pub story_title: Option<String>,
    pub index: usize,
    pub total: usize,
    pub is_first: bool,
    pub is_last: bool,
    pub scene: Option<Scene>,
    pub message: Option<String>,
}

fn scene_view(app: &App) -> SceneView {
    match app.viewer() {
        Some(viewer) => {
            let scene = viewer.current_scene().cloned();
            SceneView {
                story_title: Some(viewer.story().title.clone()),
                index: viewer.index(),
                total: viewer.scene_count(),
                is_first: viewer.is_first(),
                is_last: viewer.is_last(),
                message: scene.is_none().then(|| NO_CONTENT.to_string()),
                scene,
            }
        }
        None => SceneView {
            story_title: None,
            index: 0,
            total: 0,
            is_first: true,
            is_last: true,
            scene: None,
            message: Some(NO_CONTENT.to_string()),
        },
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    pub view: View,
    pub is_generating: bool,
    pub viewer: SceneView,
}

pub async fn get_state(State(state): State<AppState>) -> Json<StateSummary> {
    let app = state.app.read();
    Json(StateSummary { view: app.view, is_generating: app.is_generating(), viewer: scene_view(&app) })
}

#[derive(Debug, Deserialize)]
pub struct ViewChange {
    pub view: View,
}

pub async fn set_view(State(state): State<AppState>, Json(body): Json<ViewChange>) -> StatusCode {
    state.app.write().navigate(body.view);
    StatusCode::NO_CONTENT
}

pub async fn get_creator(State(state): State<AppState>) -> Json<StoryCreator> {
    Json(state.app.read().creator.clone())
}

pub async fn update_creator(
    State(state): State<AppState>,
    Json(body): Json<CreatorUpdate>,
) -> Result<Json<StoryCreator>, AppError> {
    let mut app = state.app.write();
    app.creator.apply(&body)?;
    Ok(Json(app.creator.clone()))
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct OptionEntry {
    pub value: String,
    pub label: String,
}

/// The choices offered by each select of the creation form.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatorOptions {
    pub genres: Vec<OptionEntry>,
    pub tones: Vec<OptionEntry>,
    pub target_audiences: Vec<OptionEntry>,
    pub art_styles: Vec<OptionEntry>,
}

fn entries(values: &[&str]) -> Vec<OptionEntry> {
    values
        .iter()
        .map(|v| OptionEntry { value: v.to_string(), label: option_label(v) })
        .collect()
}

pub async fn creator_options() -> Json<CreatorOptions> {
    Json(CreatorOptions {
        genres: entries(GENRES),
        tones: entries(TONES),
        target_audiences: entries(AUDIENCES),
        art_styles: entries(ART_STYLES),
    })
}

pub async fn open_character_form(State(state): State<AppState>) -> Json<StoryCreator> {
    let mut app = state.app.write();
    app.creator.open_character_form();
    Json(app.creator.clone())
}

pub async fn cancel_character_form(State(state): State<AppState>) -> Json<StoryCreator> {
    let mut app = state.app.write();
    app.creator.cancel_character_form();
    Json(app.creator.clone())
}

pub async fn add_character(
    State(state): State<AppState>,
    Json(draft): Json<CharacterDraft>,
) -> Result<Json<Character>, AppError> {
    let mut app = state.app.write();
    app.creator.open_character_form();
    app.creator.set_draft(draft);
    app.creator
        .add_character()
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::BadRequest("character name is required".into()))
}

pub async fn remove_character(Path(id): Path<String>, State(state): State<AppState>) -> StatusCode {
    if state.app.write().creator.remove_character(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Holds the generating flag for one submit. If the handler is dropped before
/// the backend answers, the flag is released instead of staying set forever.
struct Generation {
    app: Arc<RwLock<App>>,
    finished: bool,
}

impl Generation {
    fn finish(mut self, result: Result<Story, ApiError>) -> Result<Story, AppError> {
        self.finished = true;
        let mut app = self.app.write();
        app.finish_generation(result)?;
        app.viewer().map(|v| v.story().clone()).ok_or_else(no_viewer)
    }
}

impl Drop for Generation {
    fn drop(&mut self) {
        if !self.finished {
            self.app.write().abandon_generation();
        }
    }
}

pub async fn submit_creator(State(state): State<AppState>) -> Result<Json<Story>, AppError> {
    let (request, generation) = {
        let mut app = state.app.write();
        let request = app
            .creator
            .submit()
            .ok_or_else(|| AppError::BadRequest("a story prompt is required".into()))?;
        if !app.begin_generation() {
            return Err(AppError::Conflict("a story is already being generated".into()));
        }
        (request, Generation { app: state.app.clone(), finished: false })
    };

    // Generate outside the lock
    let result = generate_story(&state.api, &request).await;
    generation.finish(result).map(Json)
}

pub async fn get_viewer(State(state): State<AppState>) -> Json<SceneView> {
    Json(scene_view(&state.app.read()))
}

pub async fn next_scene(State(state): State<AppState>) -> Json<SceneView> {
    let mut app = state.app.write();
    if let Some(viewer) = app.viewer_mut() {
        viewer.next();
    }
    Json(scene_view(&app))
}

pub async fn previous_scene(State(state): State<AppState>) -> Json<SceneView> {
    let mut app = state.app.write();
    if let Some(viewer) = app.viewer_mut() {
        viewer.previous();
    }
    Json(scene_view(&app))
}

#[derive(Debug, Deserialize)]
pub struct EditBody {
    pub content: String,
}

pub async fn edit_scene(
    Path(scene_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<EditBody>,
) -> Result<Json<SceneView>, AppError> {
    let (session, request) = {
        let app = state.app.read();
        let viewer = app.viewer().ok_or_else(no_viewer)?;
        (viewer.session(), viewer.edit_request(&scene_id, &body.content)?)
    };
    let Some(request) = request else {
        return Ok(Json(scene_view(&state.app.read())));
    };

    let response = state.api.edit_scene(&request).await?;

    let mut app = state.app.write();
    app.viewer_mut().ok_or_else(no_viewer)?.apply_content(session, &scene_id, response.content)?;
    Ok(Json(scene_view(&app)))
}

pub async fn regenerate_scene(
    Path(scene_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SceneView>, AppError> {
    let (session, request) = {
        let app = state.app.read();
        let viewer = app.viewer().ok_or_else(no_viewer)?;
        (viewer.session(), viewer.regenerate_request(&scene_id)?)
    };

    let response = state.api.regenerate_scene(&request).await?;

    let mut app = state.app.write();
    app.viewer_mut().ok_or_else(no_viewer)?.apply_content(session, &scene_id, response.content)?;
    Ok(Json(scene_view(&app)))
}

pub async fn regenerate_image(
    Path(scene_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SceneView>, AppError> {
    let (session, request) = {
        let app = state.app.read();
        let viewer = app.viewer().ok_or_else(no_viewer)?;
        (viewer.session(), viewer.regenerate_image_request(&scene_id)?)
    };

    let response = state.api.regenerate_image(&request).await?;
    let image_url = state.api.resolve_url(&response.image_url)?;

    let mut app = state.app.write();
    app.viewer_mut().ok_or_else(no_viewer)?.apply_image_url(session, &scene_id, image_url)?;
    Ok(Json(scene_view(&app)))
}

pub async fn upscale_image(
    Path(scene_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SceneView>, AppError> {
    let (session, current) = {
        let app = state.app.read();
        let viewer = app.viewer().ok_or_else(no_viewer)?;
        (viewer.session(), viewer.scene_image_url(&scene_id)?)
    };

    let response = state.api.upscale_image(&current).await?;
    let image_url = state.api.resolve_url(&response.upscaled_image_url)?;

    let mut app = state.app.write();
    app.viewer_mut().ok_or_else(no_viewer)?.apply_image_url(session, &scene_id, image_url)?;
    Ok(Json(scene_view(&app)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NarrationBody {
    pub voice: Option<String>,
}

pub async fn narrate_scene(
    Path(scene_id): Path<String>,
    State(state): State<AppState>,
    body: Option<Json<NarrationBody>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let viewer = state.app.read().viewer().cloned().ok_or_else(no_viewer)?;
    let voice = body.and_then(|Json(b)| b.voice).unwrap_or_else(|| DEFAULT_VOICE.to_string());
    let audio_url = viewer.narrate_scene(&state.api, &scene_id, &voice).await?;
    Ok(Json(json!({ "audioUrl": audio_url })))
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ShareResponse {
    pub outcome: ShareOutcome,
    pub data: ShareData,
}

/// There is no native share sheet on a server, so this always copies the link.
pub async fn share_story(State(state): State<AppState>) -> Result<Json<ShareResponse>, AppError> {
    let viewer = state.app.read().viewer().cloned().ok_or_else(no_viewer)?;
    let link = state.config.share_link(&viewer.story().id);
    let outcome = viewer.share(None, state.clipboard.as_ref(), &link).await?;
    Ok(Json(ShareResponse { outcome, data: viewer.share_data(&link) }))
}

pub async fn export_pdf(State(state): State<AppState>) -> Result<Response, AppError> {
    let viewer = state.app.read().viewer().cloned().ok_or_else(no_viewer)?;
    let exported = viewer.export(state.images.as_ref()).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    let disposition = format!("attachment; filename=\"{}\"", exported.filename.replace('"', "'"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|e| AppError::Internal(e.to_string()))?,
    );
    Ok((StatusCode::OK, headers, exported.bytes).into_response())
}

pub async fn publish_story(State(state): State<AppState>) -> Result<Json<Story>, AppError> {
    let viewer = state.app.read().viewer().cloned().ok_or_else(no_viewer)?;
    Ok(Json(viewer.publish(&state.api).await?))
}

pub async fn load_gallery(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let mut gallery = Gallery::default();
    let count = gallery.load(&state.api).await?;
    let mut app = state.app.write();
    app.gallery = gallery;
    app.navigate(View::Gallery);
    Ok(Json(json!({ "count": count })))
}

pub async fn list_gallery(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> Json<Vec<Story>> {
    let app = state.app.read();
    Json(app.gallery.query(&query).into_iter().cloned().collect())
}

pub async fn open_gallery_story(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SceneView>, AppError> {
    let mut app = state.app.write();
    if !app.open_from_gallery(&id) {
        return Err(AppError::NotFound(format!("story '{id}' is not in the gallery")));
    }
    Ok(Json(scene_view(&app)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn status(e: impl Into<AppError>) -> StatusCode {
        e.into().into_response().status()
    }

    #[test]
    fn viewer_errors_map_to_client_or_gateway_statuses() {
        assert_eq!(status(ViewerError::SceneNotFound("s9".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(ViewerError::NoImage("s1".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(ViewerError::Export(ExportError::EmptyTitle)), StatusCode::BAD_REQUEST);
        assert_eq!(status(ViewerError::StoryChanged), StatusCode::CONFLICT);
        let backend = ViewerError::Api(ApiError::Status("Bad Gateway".into()));
        assert_eq!(status(backend), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(ViewerError::Export(ExportError::Pdf("broken".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn option_labels_are_readable() {
        assert_eq!(
            entries(&["science-fiction", "all-ages"]),
            vec![
                OptionEntry { value: "science-fiction".into(), label: "Science fiction".into() },
                OptionEntry { value: "all-ages".into(), label: "All ages".into() },
            ]
        );
    }
}
