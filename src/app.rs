use crate::api::{ApiError, StoryApi};
use crate::creator::StoryCreator;
use crate::gallery::Gallery;
use crate::models::{ImageGenerationRequest, Story, StoryGenerationRequest};
use crate::viewer::StoryViewer;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Home,
    Creator,
    Viewer,
    Gallery,
}

/// Single owner of everything the user is looking at. Child views are reached
/// through it; nothing is global.
#[derive(Debug, Default)]
pub struct App {
    pub view: View,
    pub creator: StoryCreator,
    pub gallery: Gallery,
    viewer: Option<StoryViewer>,
    generating: bool,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn navigate(&mut self, view: View) {
        self.view = view;
    }

    pub fn viewer(&self) -> Option<&StoryViewer> {
        self.viewer.as_ref()
    }

    pub fn viewer_mut(&mut self) -> Option<&mut StoryViewer> {
        self.viewer.as_mut()
    }

    pub fn open_story(&mut self, story: Story) {
        info!("📖 Opening '{}' ({} scenes)", story.title, story.scenes.len());
        self.viewer = Some(StoryViewer::new(story));
        self.view = View::Viewer;
    }

    /// Opens a gallery story by id; `false` if the gallery has no such story.
    pub fn open_from_gallery(&mut self, id: &str) -> bool {
        match self.gallery.open(id) {
            Some(viewer) => {
                self.viewer = Some(viewer);
                self.view = View::Viewer;
                true
            }
            None => false,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Marks a generation as running. Returns `false` if one already is.
    pub fn begin_generation(&mut self) -> bool {
        if self.generating {
            return false;
        }
        self.generating = true;
        true
    }

    /// Ends a generation. A generated story is opened; a failure leaves the
    /// current view alone.
    pub fn finish_generation(&mut self, result: Result<Story, ApiError>) -> Result<(), ApiError> {
        self.generating = false;
        match result {
            Ok(story) => {
                self.open_story(story);
                Ok(())
            }
            Err(e) => {
                error!("❌ Error generating story: {}", e);
                Err(e)
            }
        }
    }

    /// Drops a generation that will never finish, e.g. because its caller went away.
    pub fn abandon_generation(&mut self) {
        if self.generating {
            warn!("⚠️ Story generation abandoned before it finished");
            self.generating = false;
        }
    }
}

/// Runs the whole generation flow: the story text first, then one image per
/// scene, one request at a time. Any failure fails the whole flow.
pub async fn generate_story(
    api: &StoryApi,
    request: &StoryGenerationRequest,
) -> Result<Story, ApiError> {
    info!("🚀 Generating story for prompt: {}", request.prompt);
    let mut story = api.generate_story(request).await?;
    fill_from_request(&mut story, request);

    for scene in &mut story.scenes {
        let prompt = if scene.image_prompt.trim().is_empty() {
            scene.content.clone()
        } else {
            scene.image_prompt.clone()
        };
        let image = api
            .generate_image(&ImageGenerationRequest {
                prompt,
                style: story.art_style.clone(),
                characters: Some(story.characters.clone()),
                previous_images: None,
            })
            .await?;
        scene.image_url = Some(api.resolve_url(&image.image_url)?);
    }

    info!("✅ Story '{}' generated with {} scenes", story.title, story.scenes.len());
    Ok(story)
}

/// The backend only echoes part of the request; fill the rest from it.
fn fill_from_request(story: &mut Story, request: &StoryGenerationRequest) {
    fn fill(field: &mut String, value: Option<&String>) {
        if field.is_empty() {
            if let Some(v) = value {
                *field = v.clone();
            }
        }
    }

    if story.id.is_empty() {
        story.id = Uuid::new_v4().to_string();
    }
    fill(&mut story.initial_prompt, Some(&request.prompt));
    fill(&mut story.genre, request.genre.as_ref());
    fill(&mut story.tone, request.tone.as_ref());
    fill(&mut story.target_audience, request.target_audience.as_ref());
    fill(&mut story.art_style, request.art_style.as_ref());
    if story.characters.is_empty() {
        story.characters = request.characters.clone().unwrap_or_default();
    }
    if story.current_scene_id.is_empty() {
        if let Some(first) = story.scenes.first() {
            story.current_scene_id = first.id.clone();
        }
    }
}
