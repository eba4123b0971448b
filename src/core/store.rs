//! Conversation history storage using a JSON file
//!
//! The whole collection lives in one pretty-printed JSON array that is read
//! in full and rewritten in full on every mutation. There is no locking: a
//! single process must own the data directory at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::conversation::{Conversation, ConversationType, Message};

use super::analytics::Statistics;

const CONVERSATIONS_FILE: &str = "conversations.json";
const SEQUENCE_FILE: &str = "conversations.seq.json";

/// Errors from conversation storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage corrupt: {0}")]
    Corrupt(String),

    #[error("Invalid conversation: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persisted id counter, kept apart from the collection so ids survive deletes
#[derive(Debug, Default, Serialize, Deserialize)]
struct Sequence {
    next_id: u64,
}

/// JSON-file store for saved conversations
#[derive(Debug, Clone)]
pub struct ConversationStore {
    data_dir: PathBuf,
}

impl ConversationStore {
    /// Create a store rooted at the given data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Create the data directory and an empty collection if none exists
    pub async fn initialize(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir).await?;

        let path = self.conversations_path();
        if !fs::try_exists(&path).await? {
            fs::write(&path, "[]").await?;
            tracing::info!("Created conversation store at {}", path.display());
        }

        Ok(())
    }

    pub fn conversations_path(&self) -> PathBuf {
        self.data_dir.join(CONVERSATIONS_FILE)
    }

    fn sequence_path(&self) -> PathBuf {
        self.data_dir.join(SEQUENCE_FILE)
    }

    /// Read the full collection, distinguishing missing and corrupt storage
    pub async fn load(&self) -> Result<Vec<Conversation>, StorageError> {
        let path = self.conversations_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::Unavailable(format!(
                    "{} does not exist",
                    path.display()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(StorageError::Corrupt(format!("{}: {}", path.display(), e)));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        let conversations: Vec<Conversation> = serde_json::from_str(&content)
            .map_err(|e| StorageError::Corrupt(format!("{}: {}", path.display(), e)))?;

        tracing::debug!("Loaded {} conversation(s)", conversations.len());
        Ok(conversations)
    }

    /// Every stored conversation in storage order
    ///
    /// Never fails: unreadable storage is logged and reported as empty.
    /// Use [`ConversationStore::load`] to tell the two apart.
    pub async fn list_all(&self) -> Vec<Conversation> {
        match self.load().await {
            Ok(conversations) => conversations,
            Err(e) => {
                tracing::warn!("Treating conversation store as empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Up to `limit` conversations, newest first
    pub async fn recent(&self, limit: usize) -> Vec<Conversation> {
        let mut conversations = self.list_all().await;
        sort_newest_first(&mut conversations);
        conversations.truncate(limit);
        conversations
    }

    /// Look up one conversation by id
    pub async fn get(&self, id: u64) -> Option<Conversation> {
        self.list_all().await.into_iter().find(|c| c.id == id)
    }

    /// Append a new conversation and return its id
    pub async fn save(
        &self,
        title: &str,
        messages: Vec<Message>,
        conversation_type: ConversationType,
    ) -> Result<u64, StorageError> {
        self.save_at(title, messages, conversation_type, Utc::now())
            .await
    }

    /// Append a new conversation with an explicit creation time
    pub async fn save_at(
        &self,
        title: &str,
        messages: Vec<Message>,
        conversation_type: ConversationType,
        created_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        if title.trim().is_empty() {
            return Err(StorageError::Invalid("title must not be empty".into()));
        }

        let mut conversations = self.load_for_write().await?;

        let id = self.next_id(&conversations).await;
        // Reserve the id before the collection references it
        self.write_sequence(id + 1).await?;
        conversations.push(Conversation::new(
            id,
            title,
            messages,
            conversation_type,
            created_at,
        ));

        self.persist(&conversations).await?;

        tracing::info!("Saved conversation #{} ({})", id, conversation_type);
        Ok(id)
    }

    /// Conversations whose title or any message contains `query`
    pub async fn search(&self, query: &str) -> Vec<Conversation> {
        self.list_all()
            .await
            .into_iter()
            .filter(|c| c.matches(query))
            .collect()
    }

    /// Remove a conversation; absent ids are a no-op
    pub async fn delete(&self, id: u64) -> Result<(), StorageError> {
        let mut conversations = self.load_for_write().await?;

        let before = conversations.len();
        conversations.retain(|c| c.id != id);

        if conversations.len() == before {
            tracing::debug!("Conversation #{} not found, nothing to delete", id);
        }

        self.persist(&conversations).await
    }

    /// Aggregate statistics over the whole collection
    pub async fn stats(&self) -> Statistics {
        Statistics::compute(&self.list_all().await, Utc::now())
    }

    /// Only a missing file counts as empty; anything unreadable is never overwritten.
    async fn load_for_write(&self) -> Result<Vec<Conversation>, StorageError> {
        match self.load().await {
            Ok(conversations) => Ok(conversations),
            Err(StorageError::Unavailable(reason)) => {
                tracing::debug!("Starting a fresh collection: {}", reason);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn persist(&self, conversations: &[Conversation]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir).await?;
        let json = serde_json::to_string_pretty(conversations)?;
        fs::write(self.conversations_path(), json).await?;
        Ok(())
    }

    async fn next_id(&self, conversations: &[Conversation]) -> u64 {
        let after_existing = conversations.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let stored = self.read_sequence().await.unwrap_or(0);
        stored.max(after_existing)
    }

    async fn read_sequence(&self) -> Option<u64> {
        let content = fs::read_to_string(self.sequence_path()).await.ok()?;
        serde_json::from_str::<Sequence>(&content)
            .map(|s| s.next_id)
            .ok()
    }

    async fn write_sequence(&self, next_id: u64) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir).await?;
        let json = serde_json::to_string(&Sequence { next_id })?;
        fs::write(self.sequence_path(), json).await?;
        Ok(())
    }
}

/// Sort by `created_at`, most recent first
pub fn sort_newest_first(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
