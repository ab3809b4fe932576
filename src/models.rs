use serde::{Serialize, Deserialize};
use serde_with::{serde_as, skip_serializing_none, DefaultOnNull};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StoryError {
    #[error("current scene '{0}' is not part of the story")] UnknownCurrentScene(String),
}

/// Narrative role of a scene. Closed set: unknown values fail to decode.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SceneType {
    #[default]
    Introduction,
    RisingAction,
    Climax,
    Resolution,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub description: String,
    pub appearance: String,
    pub traits: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SceneChoice {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub next_scene_id: String,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Scene {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image_prompt: String,
    pub image_url: Option<String>,
    pub choices: Option<Vec<SceneChoice>>,
    pub scene_type: SceneType,
}

/// A complete story. The generation backend only returns part of these
/// fields; anything missing or `null` decodes to its default.
#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Story {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    pub genre: String,
    #[serde_as(as = "DefaultOnNull")]
    pub tone: String,
    #[serde_as(as = "DefaultOnNull")]
    pub target_audience: String,
    #[serde_as(as = "DefaultOnNull")]
    pub initial_prompt: String,
    #[serde_as(as = "DefaultOnNull")]
    pub characters: Vec<Character>,
    #[serde_as(as = "DefaultOnNull")]
    pub scenes: Vec<Scene>,
    #[serde_as(as = "DefaultOnNull")]
    pub current_scene_id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub art_style: String,
    pub created_at: DateTime<Utc>,
    #[serde_as(as = "DefaultOnNull")]
    pub author: String,
}

impl Default for Story {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            genre: String::new(),
            tone: String::new(),
            target_audience: String::new(),
            initial_prompt: String::new(),
            characters: Vec::new(),
            scenes: Vec::new(),
            current_scene_id: String::new(),
            art_style: String::new(),
            created_at: Utc::now(),
            author: String::new(),
        }
    }
}

impl Story {
    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn scene_mut(&mut self, id: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.id == id)
    }

    pub fn scene_index(&self, id: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.id == id)
    }

    /// `current_scene_id` is either empty or names one of `scenes`.
    pub fn validate(&self) -> Result<(), StoryError> {
        if self.current_scene_id.is_empty() || self.scene(&self.current_scene_id).is_some() {
            Ok(())
        } else {
            Err(StoryError::UnknownCurrentScene(self.current_scene_id.clone()))
        }
    }

    /// Branching choices whose target is not a scene of this story.
    /// An empty target marks the end of the story and is not reported.
    pub fn unresolved_choices(&self) -> Vec<&SceneChoice> {
        self.scenes
            .iter()
            .flat_map(|s| s.choices.iter().flatten())
            .filter(|c| !c.next_scene_id.is_empty() && self.scene(&c.next_scene_id).is_none())
            .collect()
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StoryGenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub characters: Option<Vec<Character>>,
    #[serde(default)]
    pub art_style: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub style: String,
    #[serde(default)]
    pub characters: Option<Vec<Character>>,
    #[serde(default)]
    pub previous_images: Option<Vec<String>>,
}

/// `/generate-image` answers in snake_case.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageGenerationResponse {
    pub image_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateSceneRequest {
    pub scene_id: String,
    pub content: String,
    pub genre: String,
    pub tone: String,
    pub target_audience: String,
    pub characters: Vec<Character>,
    pub art_style: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditSceneRequest {
    pub scene_id: String,
    pub content: String,
}

/// Response of both `/regenerate-scene` and `/edit-scene`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SceneContentResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateImageRequest {
    pub scene_id: String,
    pub prompt: String,
    pub content: String,
    pub genre: String,
    pub tone: String,
    pub target_audience: String,
    pub characters: Vec<Character>,
    pub art_style: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateImageResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub image_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpscaleImageRequest {
    pub image_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpscaleImageResponse {
    pub upscaled_image_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NarrationRequest {
    pub text: String,
    pub voice: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NarrationResponse {
    pub audio_url: String,
}
