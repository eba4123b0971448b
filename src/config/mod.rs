//! Application configuration

pub mod prompts;
pub mod settings;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::providers::gemini;

pub use prompts::{builtin as prompts_builtin, PromptBook, QuickTemplate};
pub use settings::{ConfigError, Settings};

/// Value shipped in the sample `.env`; treated the same as no key at all
const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub data_dir: PathBuf,
    pub settings_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            google_api_key: normalize_api_key(env::var("GOOGLE_API_KEY").ok()),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| gemini::DEFAULT_MODEL.into()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| gemini::DEFAULT_BASE_URL.into()),
            data_dir: env::var("AICONVERSE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            settings_path: env::var("AICONVERSE_SETTINGS").ok().map(PathBuf::from),
        })
    }

    /// Load the settings file if one is configured
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        match self.settings_path {
            Some(ref path) => Settings::from_file(path),
            None => Ok(Settings::default()),
        }
    }
}

fn normalize_api_key(raw: Option<String>) -> Option<String> {
    raw.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && k != PLACEHOLDER_API_KEY)
}
