//! Portable renderings of a conversation
//!
//! Both formatters are pure: they only read the conversation.

mod markdown;
mod pdf;

use chrono::{DateTime, Local, Utc};

use crate::conversation::{Conversation, ConversationType, Message, Role};

pub use markdown::to_markdown;
pub use pdf::to_pdf;

/// Title used when exporting a chat that was never saved
pub fn default_title(now: DateTime<Utc>) -> String {
    format!(
        "Chat - {}",
        now.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    )
}

/// Wrap an unsaved session so it can go through the formatters
pub fn draft(title: Option<String>, messages: Vec<Message>, now: DateTime<Utc>) -> Conversation {
    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| default_title(now));
    Conversation::new(0, title, messages, ConversationType::General, now)
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "AI Assistant",
    }
}
