pub const DEFAULT_API_BASE_URL: &str = "https://text-to-image-story-backened.onrender.com/api";
pub const DEFAULT_PORT: u16 = 8080;

/// Runtime settings, read from the environment (and `.env` via dotenv in `main`).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Every backend call goes to this one base URL.
    pub api_base_url: String,
    pub port: u16,
    /// Origin used to build share links.
    pub share_base_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_base_url = lookup("STORY_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let port = lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_PORT);
        let share_base_url = lookup("SHARE_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        Self { api_base_url, port, share_base_url }
    }

    pub fn share_link(&self, story_id: &str) -> String {
        format!("{}/stories/{}", self.share_base_url.trim_end_matches('/'), story_id)
    }
}
