use crate::api::{ApiError, StoryApi};
use crate::models::Story;
use crate::viewer::StoryViewer;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Genre selection; "all" disables the genre filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenreFilter {
    #[default]
    All,
    Only(String),
}

impl GenreFilter {
    pub fn parse(value: &str) -> Self {
        match value {
            "" | "all" => GenreFilter::All,
            genre => GenreFilter::Only(genre.to_string()),
        }
    }

    fn matches(&self, story: &Story) -> bool {
        match self {
            GenreFilter::All => true,
            GenreFilter::Only(genre) => story.genre == *genre,
        }
    }
}

/// Query string form of a gallery filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GalleryQuery {
    pub search: String,
    pub genre: String,
}

#[derive(Debug, Clone, Default)]
pub struct Gallery {
    stories: Vec<Story>,
}

impl Gallery {
    pub fn new(stories: Vec<Story>) -> Self {
        Self { stories }
    }

    /// Replaces the collection with the backend's public stories.
    pub async fn load(&mut self, api: &StoryApi) -> Result<usize, ApiError> {
        self.stories = api.get_public_stories().await?;
        info!("📚 Loaded {} public stories", self.stories.len());
        Ok(self.stories.len())
    }

    pub fn stories(&self) -> &[Story] {
        &self.stories
    }

    /// Stories whose title or author contains `search` (case-insensitive)
    /// and whose genre passes `genre`, in collection order.
    pub fn filter(&self, search: &str, genre: &GenreFilter) -> Vec<&Story> {
        let needle = search.to_lowercase();
        self.stories
            .iter()
            .filter(|s| {
                s.title.to_lowercase().contains(&needle) || s.author.to_lowercase().contains(&needle)
            })
            .filter(|s| genre.matches(s))
            .collect()
    }

    pub fn query(&self, query: &GalleryQuery) -> Vec<&Story> {
        self.filter(&query.search, &GenreFilter::parse(&query.genre))
    }

    pub fn open(&self, id: &str) -> Option<StoryViewer> {
        self.stories.iter().find(|s| s.id == id).cloned().map(StoryViewer::new)
    }
}
