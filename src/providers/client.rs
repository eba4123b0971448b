//! Prompt templating and reply shaping on top of a [`TextGenerator`]

use std::sync::Arc;

use crate::config::settings::ModelSettings;
use crate::config::{prompts_builtin, PromptBook};
use crate::conversation::ConversationType;

use super::{GenerateRequest, GenerationError, ImageInput, TextGenerator};

/// Suggestions offered when the model can't produce any
pub const FALLBACK_FOLLOWUPS: [&str; 3] = [
    "Tell me more about that",
    "Can you explain further?",
    "What's your opinion on this?",
];

/// Number of trailing history characters sent for follow-up suggestions
const FOLLOWUP_HISTORY_CHARS: usize = 200;

/// Suggestion lines this short are numbering or noise
const MIN_SUGGESTION_CHARS: usize = 10;

const SUGGESTION_COUNT: usize = 3;

pub struct ModelClient {
    backend: Arc<dyn TextGenerator>,
    prompts: PromptBook,
    settings: ModelSettings,
}

impl ModelClient {
    pub fn new(backend: Arc<dyn TextGenerator>) -> Self {
        Self {
            backend,
            prompts: PromptBook::new(),
            settings: ModelSettings::default(),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptBook) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Generate a reply for a raw prompt
    ///
    /// Temperature is clamped to `[0, 1]`; output length is capped by
    /// `max_output_tokens`.
    pub async fn generate_text(&self, prompt: &str, temperature: f32) -> Result<String, GenerationError> {
        let request = GenerateRequest::text(prompt)
            .with_temperature(temperature.clamp(0.0, 1.0))
            .with_max_output_tokens(self.settings.max_output_tokens);

        self.backend.generate(request).await.map_err(|e| {
            tracing::warn!("Text generation failed: {}", e);
            e
        })
    }

    /// Describe or answer a question about an image
    pub async fn analyze_image(
        &self,
        image: ImageInput,
        prompt: Option<&str>,
    ) -> Result<String, GenerationError> {
        let prompt = prompt
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(prompts_builtin::IMAGE_PROMPT);

        self.backend
            .generate(GenerateRequest::text(prompt).with_image(image))
            .await
            .map_err(|e| {
                tracing::warn!("Image analysis failed: {}", e);
                e
            })
    }

    /// Reply in the tone of the given conversation type
    pub async fn get_smart_response(
        &self,
        message: &str,
        context: &str,
        conversation_type: ConversationType,
    ) -> Result<String, GenerationError> {
        let prompt = smart_prompt(self.prompts.preamble(conversation_type), context, message);
        self.generate_text(&prompt, self.settings.temperature).await
    }

    /// Ask the model for follow-up questions
    ///
    /// May return fewer than three suggestions when the reply is sparse.
    pub async fn try_suggest_followup(&self, history: &str) -> Result<Vec<String>, GenerationError> {
        let prompt = followup_prompt(history);
        let reply = self
            .generate_text(&prompt, self.settings.followup_temperature)
            .await?;
        Ok(parse_suggestions(&reply))
    }

    /// Exactly three follow-up questions, falling back to generic ones
    pub async fn suggest_followup(&self, history: &str) -> Vec<String> {
        let parsed = match self.try_suggest_followup(history).await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Using fallback follow-ups: {}", e);
                Vec::new()
            }
        };
        complete_with_fallbacks(parsed)
    }
}

fn smart_prompt(preamble: &str, context: &str, message: &str) -> String {
    format!(
        "{}\n\nContext: {}\n\nUser: {}\n\nAssistant:",
        preamble, context, message
    )
}

fn followup_prompt(history: &str) -> String {
    format!(
        "Based on this conversation, suggest 3 relevant follow-up questions:\n\n{}\n\n\
         Provide exactly 3 short, engaging questions that would naturally continue this conversation.",
        tail_chars(history, FOLLOWUP_HISTORY_CHARS)
    )
}

fn tail_chars(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    match text.char_indices().nth(count - n) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

fn parse_suggestions(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_SUGGESTION_CHARS)
        .take(SUGGESTION_COUNT)
        .map(String::from)
        .collect()
}

fn complete_with_fallbacks(mut suggestions: Vec<String>) -> Vec<String> {
    suggestions.truncate(SUGGESTION_COUNT);
    for fallback in FALLBACK_FOLLOWUPS {
        if suggestions.len() >= SUGGESTION_COUNT {
            break;
        }
        if !suggestions.iter().any(|s| s == fallback) {
            suggestions.push(fallback.to_string());
        }
    }
    suggestions
}
