use crate::registry;

/// Base URL the generation service listens on when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11500";

const GENERATE_PATH: &str = "/api/generate";

/// Runtime configuration. Static defaults match the stock local setup;
/// `OLLAMA_BASE_URL` and `CHAT_DEFAULT_MODEL` override them (loaded from
/// `.env` by the binary before this is read).
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub default_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: registry::DEFAULT_MODEL.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let base_url = std::env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let default_model = std::env::var("CHAT_DEFAULT_MODEL")
            .unwrap_or_else(|_| registry::DEFAULT_MODEL.to_string());
        Self { base_url, default_model }
    }

    /// Full URL of the generation endpoint.
    pub fn generate_url(&self) -> String {
        format!("{}{GENERATE_PATH}", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_the_local_service() {
        let config = Config::default();
        assert_eq!(config.generate_url(), "http://localhost:11500/api/generate");
        assert_eq!(config.default_model, "mistral");
    }

    #[test]
    fn generate_url_tolerates_a_trailing_slash() {
        let config = Config { base_url: "http://10.0.0.5:11434/".to_string(), ..Config::default() };
        assert_eq!(config.generate_url(), "http://10.0.0.5:11434/api/generate");
    }
}
