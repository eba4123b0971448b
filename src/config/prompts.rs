//! Conversation-style preambles and quick templates
//!
//! Every request to the model is prefixed with a preamble chosen by the
//! conversation type. Preambles can be overridden from the settings file:
//!
//! ```toml
//! [prompts]
//! technical = "You are a senior Rust engineer. Answer with code where useful."
//!
//! [[templates]]
//! name = "Summarize"
//! text = "Summarize the following in three bullet points:"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::conversation::ConversationType;

/// Built-in prompts that don't require files
pub mod builtin {
    /// Used for `general` and anything without a dedicated preamble
    pub const DEFAULT: &str = "You are a helpful AI assistant.";

    pub const CREATIVE: &str =
        "You are a creative writing assistant. Be imaginative and artistic in your responses.";

    pub const TECHNICAL: &str =
        "You are a technical expert. Provide detailed, accurate technical information.";

    pub const CASUAL: &str =
        "You are a friendly conversational partner. Keep responses natural and engaging.";

    pub const EDUCATIONAL: &str =
        "You are an educational tutor. Explain concepts clearly with examples.";

    pub const IMAGE_PROMPT: &str = "Describe this image in detail";
}

/// A reusable message prefix offered in the input box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickTemplate {
    pub name: String,
    pub text: String,
}

impl QuickTemplate {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

pub fn builtin_templates() -> Vec<QuickTemplate> {
    vec![
        QuickTemplate::new(
            "Explain like I'm 5",
            "Explain this concept in simple terms that a 5-year-old would understand:",
        ),
        QuickTemplate::new("Code Review", "Please review this code and suggest improvements:"),
        QuickTemplate::new("Creative Story", "Write a creative story about:"),
        QuickTemplate::new("Research Help", "Help me research information about:"),
        QuickTemplate::new("Problem Solving", "Help me solve this problem step by step:"),
    ]
}

/// Preamble overrides keyed by conversation type name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptOverrides {
    #[serde(flatten)]
    pub by_type: HashMap<String, String>,
}

/// Resolves the preamble for each conversation type
#[derive(Debug, Clone, Default)]
pub struct PromptBook {
    overrides: HashMap<ConversationType, String>,
}

impl PromptBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply overrides; unknown type names are logged and ignored
    pub fn with_overrides(mut self, overrides: &PromptOverrides) -> Self {
        for (name, text) in &overrides.by_type {
            match name.parse::<ConversationType>() {
                Ok(kind) => {
                    self.overrides.insert(kind, text.clone());
                }
                Err(e) => tracing::warn!("Ignoring prompt override: {}", e),
            }
        }
        self
    }

    pub fn preamble(&self, kind: ConversationType) -> &str {
        if let Some(text) = self.overrides.get(&kind) {
            return text;
        }

        match kind {
            ConversationType::Creative => builtin::CREATIVE,
            ConversationType::Technical => builtin::TECHNICAL,
            ConversationType::Casual => builtin::CASUAL,
            ConversationType::Educational => builtin::EDUCATIONAL,
            ConversationType::General => builtin::DEFAULT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_preambles() {
        let book = PromptBook::new();
        assert_eq!(book.preamble(ConversationType::General), builtin::DEFAULT);
        assert!(book.preamble(ConversationType::Technical).contains("technical expert"));
        assert!(book.preamble(ConversationType::Educational).contains("tutor"));
    }

    #[test]
    fn test_overrides() {
        let toml_content = r#"
technical = "You are a Rust expert."
poetry = "ignored"
"#;
        let overrides: PromptOverrides = toml::from_str(toml_content).unwrap();
        let book = PromptBook::new().with_overrides(&overrides);

        assert_eq!(book.preamble(ConversationType::Technical), "You are a Rust expert.");
        assert_eq!(book.preamble(ConversationType::Casual), builtin::CASUAL);
    }

    #[test]
    fn test_builtin_templates() {
        let templates = builtin_templates();
        assert_eq!(templates.len(), 5);
        assert_eq!(templates[1].name, "Code Review");
    }
}
