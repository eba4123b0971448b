//! Core components
//!
//! The conversation store, the analytics computed over it, and the chat
//! engine. The store and the engine never call each other.

pub mod analytics;
mod chat;
mod store;

pub use analytics::{AnalyticsReport, Dashboard, Statistics};
pub use chat::{ChatEngine, ChatError, ChatRequest, ChatResponse};
pub use store::{sort_newest_first, ConversationStore, StorageError};
