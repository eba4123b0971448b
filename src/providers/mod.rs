//! Generation service integration
//!
//! [`TextGenerator`] is the transport seam: it sends one prompt (optionally
//! with an image) and returns the raw reply text. [`ModelClient`] sits on top
//! and owns prompt shaping and reply parsing.

pub(crate) mod client;
pub mod gemini;

use async_trait::async_trait;
use base64::Engine;
use thiserror::Error;

pub use client::ModelClient;
pub use gemini::{GeminiBackend, GeminiConfig};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),
}

impl GenerationError {
    /// Human-readable reply text for a failed text generation
    pub fn as_reply(&self) -> String {
        format!("Error: {}", self)
    }

    /// Human-readable reply text for a failed image analysis
    pub fn as_image_reply(&self) -> String {
        format!("Error analyzing image: {}", self)
    }
}

/// An uploaded image ready to be sent inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

impl ImageInput {
    /// Detect the format from the bytes; only PNG and JPEG are accepted
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, GenerationError> {
        let format = image::guess_format(&data)
            .map_err(|e| GenerationError::UnsupportedImage(e.to_string()))?;

        let mime_type = match format {
            image::ImageFormat::Png => "image/png",
            image::ImageFormat::Jpeg => "image/jpeg",
            other => {
                return Err(GenerationError::UnsupportedImage(format!(
                    "{:?} images are not accepted, use PNG or JPEG",
                    other
                )))
            }
        };

        Ok(Self { mime_type, data })
    }

    /// Decode a base64 upload (as sent in JSON request bodies)
    pub fn from_base64(encoded: &str) -> Result<Self, GenerationError> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| GenerationError::UnsupportedImage(format!("invalid base64: {}", e)))?;
        Self::from_bytes(data)
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// A single generation call
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub prompt: String,
    pub image: Option<ImageInput>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// Remote text/vision generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier used for requests
    fn model(&self) -> &str;

    /// Send one request and return the reply text
    async fn generate(&self, request: GenerateRequest) -> Result<String, GenerationError>;
}
