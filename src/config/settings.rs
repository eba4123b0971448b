//! Optional settings loaded from a TOML file
//!
//! Every section is optional; a missing file means defaults throughout.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::prompts::{PromptOverrides, QuickTemplate};

/// Root settings document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Generation parameters
    #[serde(default)]
    pub model: ModelSettings,

    /// Preamble overrides per conversation type
    #[serde(default)]
    pub prompts: PromptOverrides,

    /// Extra quick templates, offered after the built-in ones
    #[serde(default)]
    pub templates: Vec<QuickTemplate>,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load settings from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.model.temperature) {
            return Err(ConfigError::Validation(format!(
                "model.temperature must be between 0 and 1, got {}",
                self.model.temperature
            )));
        }
        if self.model.max_output_tokens == 0 {
            return Err(ConfigError::Validation(
                "model.max_output_tokens must be positive".into(),
            ));
        }
        if let Some(t) = self.templates.iter().find(|t| t.name.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "template with text '{}' has no name",
                t.text
            )));
        }
        Ok(())
    }
}

/// Generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Temperature for chat replies
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Temperature for follow-up suggestions
    #[serde(default = "default_followup_temperature")]
    pub followup_temperature: f32,

    /// Output cap for text generation
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// HTTP timeout for generation calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_followup_temperature() -> f32 {
    0.8
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            followup_temperature: default_followup_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SETTINGS: &str = r#"
[model]
temperature = 0.4
max_output_tokens = 2048
timeout_secs = 30

[prompts]
casual = "You are a laid-back buddy."

[[templates]]
name = "Summarize"
text = "Summarize the following in three bullet points:"
"#;

    #[test]
    fn test_parse_settings() {
        let settings = Settings::from_str(SAMPLE_SETTINGS).unwrap();

        assert_eq!(settings.model.temperature, 0.4);
        assert_eq!(settings.model.followup_temperature, 0.8);
        assert_eq!(settings.model.max_output_tokens, 2048);
        assert_eq!(settings.model.timeout_secs, 30);
        assert_eq!(
            settings.prompts.by_type.get("casual").map(String::as_str),
            Some("You are a laid-back buddy.")
        );
        assert_eq!(settings.templates.len(), 1);
        assert_eq!(settings.templates[0].name, "Summarize");
    }

    #[test]
    fn test_empty_settings() {
        let settings = Settings::from_str("").unwrap();
        assert_eq!(settings.model.temperature, 0.7);
        assert_eq!(settings.model.max_output_tokens, 1024);
        assert!(settings.prompts.by_type.is_empty());
        assert!(settings.templates.is_empty());
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let err = Settings::from_str("[model]\ntemperature = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::from_file(Path::new("/nonexistent/aiconverse.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
