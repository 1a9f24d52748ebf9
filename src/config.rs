use crate::error::ConfigError;

pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_key: String,
    pub api_base: String,
    pub text_model: String,
    pub image_model: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: DEMO_KEY.into(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".into(),
            text_model: "gemini-2.5-flash".into(),
            image_model: "gemini-2.5-flash-image".into(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Reads the process environment (after `.env` has been loaded by the caller).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let port = match get("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name: "PORT", value: raw })?,
            None => defaults.port,
        };
        Ok(Self {
            api_key: get("GEMINI_API_KEY").unwrap_or(defaults.api_key),
            api_base: get("GEMINI_API_BASE").map(|b| b.trim_end_matches('/').to_string()).unwrap_or(defaults.api_base),
            text_model: get("GEMINI_TEXT_MODEL").unwrap_or(defaults.text_model),
            image_model: get("GEMINI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            port,
        })
    }

    pub fn demo_mode(&self) -> bool { self.api_key == DEMO_KEY }

    /// Key prefix safe for logs.
    pub fn redacted_key(&self) -> String {
        format!("{}...", self.api_key.chars().take(4).collect::<String>())
    }
}
