//! Conversation types and session state

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Number of trailing messages included as context for a reply
pub const CONTEXT_WINDOW: usize = 5;

/// Number of trailing messages used to suggest follow-ups
pub const FOLLOWUP_WINDOW: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Unknown roles read from disk are treated as user turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

/// Tone/persona tag attached to a conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    #[default]
    General,
    Creative,
    Technical,
    Educational,
    Casual,
}

impl ConversationType {
    pub const ALL: [ConversationType; 5] = [
        ConversationType::General,
        ConversationType::Creative,
        ConversationType::Technical,
        ConversationType::Educational,
        ConversationType::Casual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::General => "general",
            ConversationType::Creative => "creative",
            ConversationType::Technical => "technical",
            ConversationType::Educational => "educational",
            ConversationType::Casual => "casual",
        }
    }

    /// Display label used by conversation style selectors
    pub fn label(&self) -> &'static str {
        match self {
            ConversationType::General => "General Chat",
            ConversationType::Creative => "Creative Writing",
            ConversationType::Technical => "Technical Help",
            ConversationType::Educational => "Learning Mode",
            ConversationType::Casual => "Casual Talk",
        }
    }

    /// Parse a type tag, falling back to `General` for anything unrecognized
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for ConversationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(ConversationType::General),
            "creative" => Ok(ConversationType::Creative),
            "technical" => Ok(ConversationType::Technical),
            "educational" => Ok(ConversationType::Educational),
            "casual" => Ok(ConversationType::Casual),
            other => Err(format!("unknown conversation type: {}", other)),
        }
    }
}

impl fmt::Display for ConversationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConversationType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value
            .as_deref()
            .map(ConversationType::parse_lenient)
            .unwrap_or_default())
    }
}

/// A persisted chat session
///
/// `message_count` is the snapshot taken at save time and is never
/// recomputed from `messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(rename = "type", default)]
    pub conversation_type: ConversationType,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub message_count: usize,
}

impl Conversation {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        messages: Vec<Message>,
        conversation_type: ConversationType,
        created_at: DateTime<Utc>,
    ) -> Self {
        let message_count = messages.len();
        Self {
            id,
            title: title.into(),
            messages,
            conversation_type,
            created_at,
            message_count,
        }
    }

    /// Case-insensitive match against the title or any message body
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self
                .messages
                .iter()
                .any(|m| m.content.to_lowercase().contains(&needle))
    }
}

/// Accepts RFC 3339 as well as offset-less ISO-8601 timestamps (local time).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("nonexistent local time '{}'", raw))
}

/// Explicit per-request chat state
///
/// Carries what would otherwise be ambient UI state: the running message
/// list and the selected conversation style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    #[serde(default)]
    pub messages: Vec<Message>,

    #[serde(default)]
    pub conversation_type: ConversationType,
}

impl ChatSession {
    pub fn new(conversation_type: ConversationType) -> Self {
        Self {
            conversation_type,
            ..Self::default()
        }
    }

    /// Resume a stored conversation
    pub fn from_conversation(conversation: &Conversation) -> Self {
        Self {
            messages: conversation.messages.clone(),
            ..Self::new(conversation.conversation_type)
        }
    }

    pub fn add_user(&mut self, content: &str) {
        self.messages.push(Message::user(content));
    }

    pub fn add_assistant(&mut self, content: &str) {
        self.messages.push(Message::assistant(content));
    }

    /// Context block for the next reply
    pub fn context(&self) -> String {
        render_tail(&self.messages, CONTEXT_WINDOW)
    }

    /// History block used for follow-up suggestions
    pub fn followup_history(&self) -> String {
        render_tail(&self.messages, FOLLOWUP_WINDOW)
    }
}

fn render_tail(messages: &[Message], window: usize) -> String {
    let start = messages.len().saturating_sub(window);
    messages[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
