//! Chat turn orchestration
//!
//! The ChatEngine runs one user turn against an explicit [`ChatSession`]:
//! 1. Appends the user message
//! 2. Builds context from the tail of the session
//! 3. Asks the model for a reply (vision path when an image is attached)
//! 4. Appends the reply and gathers follow-up suggestions
//!
//! It never touches the conversation store; saving is a separate step.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::conversation::ChatSession;
use crate::providers::{GenerationError, ImageInput, ModelClient};

/// Suggestions are offered once a session has at least this many messages
const MIN_MESSAGES_FOR_SUGGESTIONS: usize = 2;

/// Request to the chat engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message
    pub message: String,

    /// Session state carried by the caller
    #[serde(default)]
    pub session: ChatSession,

    /// Optional base64-encoded PNG or JPEG
    #[serde(default)]
    pub image: Option<String>,

    /// Whether to compute follow-up suggestions
    #[serde(default = "default_true")]
    pub suggest: bool,
}

fn default_true() -> bool {
    true
}

/// Response from the chat engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The assistant's reply, or a description of what went wrong
    pub reply: String,

    /// Set when generation failed; `reply` then holds the error text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Updated session to send back with the next turn
    pub session: ChatSession,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ChatResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Errors from the chat engine
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Empty message")]
    EmptyMessage,

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// The core chat engine
pub struct ChatEngine {
    client: Arc<ModelClient>,
}

impl ChatEngine {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ModelClient {
        &self.client
    }

    /// Process a chat request and return the updated session
    ///
    /// Remote failures do not fail the turn: they come back as an error
    /// reply that is not added to the session history.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        // Decode before touching the session so a bad upload changes nothing
        let image = request
            .image
            .as_deref()
            .map(ImageInput::from_base64)
            .transpose()?;

        let mut session = request.session;
        session.add_user(message);

        let result = match image {
            Some(image) => self
                .client
                .analyze_image(image, Some(message))
                .await
                .map_err(|e| e.as_image_reply()),
            None => self
                .client
                .get_smart_response(message, &session.context(), session.conversation_type)
                .await
                .map_err(|e| e.as_reply()),
        };

        let (reply, error) = match result {
            Ok(reply) => {
                session.add_assistant(&reply);
                (reply, None)
            }
            Err(text) => (text.clone(), Some(text)),
        };

        let suggestions = if request.suggest && session.messages.len() >= MIN_MESSAGES_FOR_SUGGESTIONS {
            self.client.suggest_followup(&session.followup_history()).await
        } else {
            Vec::new()
        };

        tracing::debug!(
            "Chat turn complete ({} messages, success: {})",
            session.messages.len(),
            error.is_none()
        );

        Ok(ChatResponse {
            reply,
            error,
            session,
            suggestions,
        })
    }

    /// Follow-up suggestions for an existing session
    pub async fn suggestions(&self, session: &ChatSession) -> Vec<String> {
        self.client.suggest_followup(&session.followup_history()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::prompts_builtin;
    use crate::conversation::{ConversationType, Role};
    use crate::providers::client::tests::ScriptedBackend;
    use crate::providers::client::FALLBACK_FOLLOWUPS;

    fn engine(backend: Arc<ScriptedBackend>) -> ChatEngine {
        ChatEngine::new(Arc::new(ModelClient::new(backend)))
    }

    fn request(message: &str, session: ChatSession) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            session,
            image: None,
            suggest: true,
        }
    }

    #[tokio::test]
    async fn test_chat_turn_updates_session() {
        let backend = ScriptedBackend::new(vec![
            Ok("Ownership moves values.".into()),
            Ok("What about borrowing rules?\nHow do lifetimes relate?\nWhen should I clone?".into()),
        ]);
        let engine = engine(backend.clone());

        let response = engine
            .chat(request("Explain ownership", ChatSession::new(ConversationType::Educational)))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.reply, "Ownership moves values.");
        assert_eq!(response.session.messages.len(), 2);
        assert_eq!(response.session.messages[1].role, Role::Assistant);
        assert_eq!(response.suggestions.len(), 3);
        assert_eq!(response.suggestions[0], "What about borrowing rules?");

        let prompts = backend.prompts();
        assert!(prompts[0].starts_with(prompts_builtin::EDUCATIONAL));
        assert!(prompts[0].contains("Context: user: Explain ownership"));
    }

    #[tokio::test]
    async fn test_failed_reply_is_flagged_not_recorded() {
        let engine = engine(ScriptedBackend::failing());

        let response = engine
            .chat(request("Hello?", ChatSession::default()))
            .await
            .unwrap();

        assert!(!response.is_success());
        assert!(response.reply.starts_with("Error: "));
        assert_eq!(response.session.messages.len(), 1);
        assert!(response.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_suggestions_fall_back_when_remote_fails() {
        let backend = ScriptedBackend::new(vec![Ok("Hi!".into())]);
        let engine = engine(backend);

        let response = engine
            .chat(request("Hey", ChatSession::default()))
            .await
            .unwrap();
        assert_eq!(response.suggestions, FALLBACK_FOLLOWUPS.to_vec());
    }

    #[tokio::test]
    async fn test_image_turn_uses_vision_path() {
        let backend = ScriptedBackend::new(vec![Ok("A diagram".into())]);
        let engine = engine(backend.clone());
        let png = ImageInput {
            mime_type: "image/png",
            data: vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
        };

        let mut req = request("What does this show?", ChatSession::default());
        req.image = Some(png.to_base64());
        req.suggest = false;

        let response = engine.chat(req).await.unwrap();
        assert_eq!(response.reply, "A diagram");
        assert_eq!(backend.prompts()[0], "What does this show?");
    }

    #[tokio::test]
    async fn test_rejects_empty_message_and_bad_image() {
        let engine = engine(ScriptedBackend::failing());
        assert!(matches!(
            engine.chat(request("   ", ChatSession::default())).await,
            Err(ChatError::EmptyMessage)
        ));

        let mut req = request("look", ChatSession::default());
        req.image = Some("not an image".into());
        assert!(matches!(
            engine.chat(req).await,
            Err(ChatError::Generation(GenerationError::UnsupportedImage(_)))
        ));
    }
}
