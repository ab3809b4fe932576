use crate::api::{ApiError, StoryApi};
use crate::export::{export_story, ExportedStory};
use crate::images::ImageSource;
use crate::models::{EditSceneRequest, RegenerateImageRequest, RegenerateSceneRequest, Scene, Story};
use crate::pdf::ExportError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Shown instead of a scene when the story has none.
pub const NO_CONTENT: &str = "No story or scenes available.";

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("scene '{0}' not found")] SceneNotFound(String),
    #[error("scene '{0}' has no image")] NoImage(String),
    #[error("share failed: {0}")] Share(String),
    #[error("another story was opened while the request was running")] StoryChanged,
    #[error(transparent)] Api(#[from] ApiError),
    #[error(transparent)] Export(#[from] ExportError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShareData {
    pub title: String,
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method", content = "url", rename_all = "snake_case")]
pub enum ShareOutcome {
    Shared,
    Copied(String),
}

/// A platform share sheet.
#[async_trait]
pub trait ShareTarget: Send + Sync {
    async fn share(&self, data: &ShareData) -> Result<(), String>;
}

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), String>;
}

/// Clipboard that just remembers the last copied text.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    last: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn last(&self) -> Option<String> {
        self.last.lock().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), String> {
        *self.last.lock() = Some(text.to_string());
        Ok(())
    }
}

/// Reads a story one scene at a time.
///
/// The scene index is always within `0..scene_count` (or 0 for an empty
/// story) and `Story::current_scene_id` follows it. Backend actions that change
/// a scene come in two halves, `*_request` and `apply_*`, so the HTTP call can
/// run while nothing is locked. The apply half only lands in the viewer whose
/// [`session`](Self::session) issued the request.
#[derive(Debug, Clone)]
pub struct StoryViewer {
    story: Story,
    index: usize,
    session: Uuid,
}

impl StoryViewer {
    pub fn new(story: Story) -> Self {
        if let Err(e) = story.validate() {
            warn!("⚠️ '{}': {}, starting at the first scene", story.title, e);
        }
        let index = story.scene_index(&story.current_scene_id).unwrap_or(0);
        let mut viewer = Self { story, index, session: Uuid::new_v4() };
        viewer.sync_current_scene();
        viewer
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    /// Identifies this opening of the story; every `new` gets a fresh one.
    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn scene_count(&self) -> usize {
        self.story.scenes.len()
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.story.scenes.get(self.index)
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.scene_count()
    }

    /// Returns whether the displayed scene changed.
    pub fn next(&mut self) -> bool {
        self.go_to(self.index.saturating_add(1))
    }

    pub fn previous(&mut self) -> bool {
        self.go_to(self.index.saturating_sub(1))
    }

    /// Moves to `index`, clamped to the available scenes.
    pub fn go_to(&mut self, index: usize) -> bool {
        let clamped = index.min(self.scene_count().saturating_sub(1));
        let moved = clamped != self.index;
        self.index = clamped;
        self.sync_current_scene();
        moved
    }

    fn sync_current_scene(&mut self) {
        if let Some(id) = self.story.scenes.get(self.index).map(|s| s.id.clone()) {
            self.story.current_scene_id = id;
        }
    }

    fn scene(&self, scene_id: &str) -> Result<&Scene, ViewerError> {
        self.story.scene(scene_id).ok_or_else(|| ViewerError::SceneNotFound(scene_id.to_string()))
    }

    fn scene_for(&mut self, session: Uuid, scene_id: &str) -> Result<&mut Scene, ViewerError> {
        if session != self.session {
            return Err(ViewerError::StoryChanged);
        }
        self.story.scene_mut(scene_id).ok_or_else(|| ViewerError::SceneNotFound(scene_id.to_string()))
    }

    /// `None` when the replacement text is empty: nothing is sent.
    pub fn edit_request(
        &self,
        scene_id: &str,
        new_content: &str,
    ) -> Result<Option<EditSceneRequest>, ViewerError> {
        self.scene(scene_id)?;
        if new_content.is_empty() {
            return Ok(None);
        }
        Ok(Some(EditSceneRequest { scene_id: scene_id.to_string(), content: new_content.to_string() }))
    }

    pub fn regenerate_request(&self, scene_id: &str) -> Result<RegenerateSceneRequest, ViewerError> {
        let scene = self.scene(scene_id)?;
        Ok(RegenerateSceneRequest {
            scene_id: scene.id.clone(),
            content: scene.content.clone(),
            genre: self.story.genre.clone(),
            tone: self.story.tone.clone(),
            target_audience: self.story.target_audience.clone(),
            characters: self.story.characters.clone(),
            art_style: self.story.art_style.clone(),
        })
    }

    /// The image prompt falls back to the scene text when the scene has none.
    pub fn regenerate_image_request(
        &self,
        scene_id: &str,
    ) -> Result<RegenerateImageRequest, ViewerError> {
        let scene = self.scene(scene_id)?;
        let prompt = if scene.image_prompt.trim().is_empty() {
            &scene.content
        } else {
            &scene.image_prompt
        };
        Ok(RegenerateImageRequest {
            scene_id: scene.id.clone(),
            prompt: prompt.clone(),
            content: scene.content.clone(),
            genre: self.story.genre.clone(),
            tone: self.story.tone.clone(),
            target_audience: self.story.target_audience.clone(),
            characters: self.story.characters.clone(),
            art_style: self.story.art_style.clone(),
        })
    }

    pub fn scene_image_url(&self, scene_id: &str) -> Result<String, ViewerError> {
        self.scene(scene_id)?
            .image_url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ViewerError::NoImage(scene_id.to_string()))
    }

    pub fn scene_text(&self, scene_id: &str) -> Result<String, ViewerError> {
        Ok(self.scene(scene_id)?.content.clone())
    }

    pub fn apply_content(
        &mut self,
        session: Uuid,
        scene_id: &str,
        content: String,
    ) -> Result<(), ViewerError> {
        self.scene_for(session, scene_id)?.content = content;
        Ok(())
    }

    pub fn apply_image_url(
        &mut self,
        session: Uuid,
        scene_id: &str,
        image_url: String,
    ) -> Result<(), ViewerError> {
        self.scene_for(session, scene_id)?.image_url = Some(image_url);
        Ok(())
    }

    /// Audio URL narrating the scene text.
    pub async fn narrate_scene(
        &self,
        api: &StoryApi,
        scene_id: &str,
        voice: &str,
    ) -> Result<String, ViewerError> {
        let text = self.scene_text(scene_id)?;
        let response = api.generate_narration(&text, voice).await?;
        Ok(api.resolve_url(&response.audio_url)?)
    }

    /// Saves the story as it is now; the backend's copy is returned.
    pub async fn publish(&self, api: &StoryApi) -> Result<Story, ViewerError> {
        let saved = api.save_story(&self.story).await?;
        info!("📤 Published '{}'", saved.title);
        Ok(saved)
    }

    pub async fn export(&self, images: &dyn ImageSource) -> Result<ExportedStory, ViewerError> {
        Ok(export_story(&self.story, images).await?)
    }

    pub fn share_data(&self, link: &str) -> ShareData {
        ShareData {
            title: self.story.title.clone(),
            text: format!("Check out this story: {}", self.story.title),
            url: link.to_string(),
        }
    }

    /// Uses the native share sheet when there is one, otherwise copies `link`.
    pub async fn share(
        &self,
        native: Option<&dyn ShareTarget>,
        clipboard: &dyn Clipboard,
        link: &str,
    ) -> Result<ShareOutcome, ViewerError> {
        if let Some(target) = native {
            target.share(&self.share_data(link)).await.map_err(|e| {
                warn!("Share of '{}' failed: {}", self.story.title, e);
                ViewerError::Share(e)
            })?;
            return Ok(ShareOutcome::Shared);
        }
        clipboard.write_text(link).map_err(ViewerError::Share)?;
        Ok(ShareOutcome::Copied(link.to_string()))
    }
}
