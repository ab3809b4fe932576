use crate::models::{Character, StoryGenerationRequest};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

pub const GENRES: &[&str] = &[
    "fantasy-art",
    "adventure",
    "mystery",
    "science-fiction",
    "romance",
    "horror",
    "comedy",
    "drama",
];
pub const TONES: &[&str] = &[
    "adventurous",
    "mysterious",
    "lighthearted",
    "dramatic",
    "suspenseful",
    "romantic",
    "humorous",
];
pub const AUDIENCES: &[&str] = &["children", "young-adult", "adult", "all-ages"];
pub const ART_STYLES: &[&str] = &[
    "fantasy-art",
    "photographic",
    "comic-book",
    "anime",
    "watercolor",
    "digital-art",
    "pixel-art",
];

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("unknown {field}: {value}")] UnknownOption { field: &'static str, value: String },
}

/// Display label for an option value: `science-fiction` -> `Science fiction`.
pub fn option_label(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('-', " "),
        None => String::new(),
    }
}

/// Splits `"brave, curious, kind"` into trimmed, non-empty traits.
pub fn parse_traits(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty()).map(String::from).collect()
}

/// The "add character" sub-form, traits still as typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CharacterDraft {
    pub name: String,
    pub description: String,
    pub appearance: String,
    pub traits: String,
}

/// Partial update of the form's scalar fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatorUpdate {
    pub prompt: Option<String>,
    pub genre: Option<String>,
    pub tone: Option<String>,
    pub target_audience: Option<String>,
    pub art_style: Option<String>,
}

/// State of the story creation wizard.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoryCreator {
    pub prompt: String,
    pub genre: String,
    pub tone: String,
    pub target_audience: String,
    pub art_style: String,
    pub characters: Vec<Character>,
    pub draft: CharacterDraft,
    pub show_character_form: bool,
}

impl Default for StoryCreator {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            genre: "fantasy-art".into(),
            tone: "adventurous".into(),
            target_audience: "children".into(),
            art_style: "fantasy-art".into(),
            characters: Vec::new(),
            draft: CharacterDraft::default(),
            show_character_form: false,
        }
    }
}

fn pick(field: &'static str, options: &[&str], value: &str) -> Result<String, FormError> {
    if options.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(FormError::UnknownOption { field, value: value.to_string() })
    }
}

impl StoryCreator {
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn select_genre(&mut self, genre: &str) -> Result<(), FormError> {
        self.genre = pick("genre", GENRES, genre)?;
        Ok(())
    }

    pub fn select_tone(&mut self, tone: &str) -> Result<(), FormError> {
        self.tone = pick("tone", TONES, tone)?;
        Ok(())
    }

    pub fn select_audience(&mut self, audience: &str) -> Result<(), FormError> {
        self.target_audience = pick("audience", AUDIENCES, audience)?;
        Ok(())
    }

    pub fn select_art_style(&mut self, style: &str) -> Result<(), FormError> {
        self.art_style = pick("art style", ART_STYLES, style)?;
        Ok(())
    }

    /// Applies every field of `update` or none of them.
    pub fn apply(&mut self, update: &CreatorUpdate) -> Result<(), FormError> {
        let mut next = self.clone();
        if let Some(prompt) = &update.prompt {
            next.set_prompt(prompt.as_str());
        }
        if let Some(genre) = &update.genre {
            next.select_genre(genre)?;
        }
        if let Some(tone) = &update.tone {
            next.select_tone(tone)?;
        }
        if let Some(audience) = &update.target_audience {
            next.select_audience(audience)?;
        }
        if let Some(style) = &update.art_style {
            next.select_art_style(style)?;
        }
        *self = next;
        Ok(())
    }

    pub fn open_character_form(&mut self) {
        self.show_character_form = true;
    }

    pub fn cancel_character_form(&mut self) {
        self.show_character_form = false;
    }

    pub fn set_draft(&mut self, draft: CharacterDraft) {
        self.draft = draft;
    }

    /// Turns the draft into a character. Nothing happens while the draft has
    /// no name; otherwise the draft is cleared and the sub-form closed.
    pub fn add_character(&mut self) -> Option<&Character> {
        if self.draft.name.trim().is_empty() {
            return None;
        }
        let draft = std::mem::take(&mut self.draft);
        let character = Character {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            description: draft.description,
            appearance: draft.appearance,
            traits: parse_traits(&draft.traits),
        };
        info!("Added character '{}' ({} traits)", character.name, character.traits.len());
        self.characters.push(character);
        self.show_character_form = false;
        self.characters.last()
    }

    pub fn remove_character(&mut self, id: &str) -> bool {
        let before = self.characters.len();
        self.characters.retain(|c| c.id != id);
        before != self.characters.len()
    }

    /// The request to send, or `None` while the prompt is blank.
    pub fn submit(&self) -> Option<StoryGenerationRequest> {
        debug!(
            prompt = %self.prompt,
            genre = %self.genre,
            tone = %self.tone,
            audience = %self.target_audience,
            art_style = %self.art_style,
            characters = self.characters.len(),
            "Creation form submitted"
        );
        if self.prompt.trim().is_empty() {
            return None;
        }
        Some(StoryGenerationRequest {
            prompt: self.prompt.clone(),
            genre: Some(self.genre.clone()),
            tone: Some(self.tone.clone()),
            target_audience: Some(self.target_audience.clone()),
            characters: Some(self.characters.clone()),
            art_style: Some(self.art_style.clone()),
        })
    }
}
