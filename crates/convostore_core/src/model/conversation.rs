//! Conversation domain model and document mapping.
//!
//! # Responsibility
//! - Define `Conversation` and the embedded `MessagePair`.
//! - Map records to and from the stored document shape
//!   (`conversation_id`, `messages`, `created_at`, `updated_at`).
//! - Validate records on read instead of trusting persisted state.
//!
//! # Invariants
//! - `conversation_id` is caller-supplied and never blank.
//! - `updated_at` is never earlier than `created_at`.
//! - Message order is insertion order; pairs carry no id or timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque identifier assigned by the store when a conversation is inserted.
///
/// Returned by `create` only; every later lookup goes through
/// `conversation_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageHandle(String);

impl StorageHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for StorageHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One human message and the automated response that answered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePair {
    /// Human-originated message.
    pub nurse: String,
    /// Automated response.
    pub bot: String,
}

impl MessagePair {
    pub fn new(nurse: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            nurse: nurse.into(),
            bot: bot.into(),
        }
    }
}

/// Full conversation record as returned by `get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    /// Store-assigned handle of the backing document.
    pub handle: StorageHandle,
    /// Caller-supplied identifier used for every lookup.
    pub conversation_id: String,
    /// Message pairs in insertion order.
    pub messages: Vec<MessagePair>,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful append.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Builds a record from a stored document and its handle, validating the
    /// result.
    pub fn from_document(
        handle: StorageHandle,
        document: ConversationDocument,
    ) -> Result<Self, ConversationValidationError> {
        let conversation = Self {
            handle,
            conversation_id: document.conversation_id,
            messages: document.messages,
            created_at: document.created_at,
            updated_at: document.updated_at,
        };
        conversation.validate()?;
        Ok(conversation)
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), ConversationValidationError> {
        validate_conversation_id(&self.conversation_id)?;
        if self.updated_at < self.created_at {
            return Err(ConversationValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// Stored document shape. Field names are the wire contract with the store.
///
/// Timestamps are epoch milliseconds, the resolution document stores keep
/// for datetime values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDocument {
    pub conversation_id: String,
    pub messages: Vec<MessagePair>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl ConversationDocument {
    /// Creates an empty conversation document stamped with `now` for both
    /// timestamps.
    pub fn new_empty(conversation_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validation errors for conversation inputs and persisted records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationValidationError {
    BlankConversationId,
    UpdatedBeforeCreated {
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    },
}

impl Display for ConversationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankConversationId => write!(f, "conversation_id cannot be blank"),
            Self::UpdatedBeforeCreated {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at ({updated_at}) is earlier than created_at ({created_at})"
            ),
        }
    }
}

impl Error for ConversationValidationError {}

/// Rejects conversation ids that are empty after trimming.
pub fn validate_conversation_id(conversation_id: &str) -> Result<(), ConversationValidationError> {
    if conversation_id.trim().is_empty() {
        return Err(ConversationValidationError::BlankConversationId);
    }
    Ok(())
}

/// Current time truncated to the millisecond resolution of stored documents.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
