//! Conversation store contract and its error type.
//!
//! # Responsibility
//! - Declare the lifecycle operations every backend provides.
//! - Provide semantic errors (`NotFound`, `Validation`) next to untranslated
//!   transport errors.
//!
//! # Invariants
//! - `get` returns `Ok(None)` for a missing conversation, never an error.
//! - `list_messages` returns an empty list for a missing conversation.
//! - `append_message`/`delete` return `NotFound` for a missing conversation.

use crate::model::conversation::{
    Conversation, ConversationValidationError, MessagePair, StorageHandle,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for conversation store operations.
#[derive(Debug)]
pub enum StoreError {
    /// No document matches the conversation id of a mutating call.
    NotFound(String),
    Validation(ConversationValidationError),
    InvalidConfig(String),
    /// A persisted document failed to decode or validate.
    InvalidData(String),
    MissingCollection(&'static str),
    /// The database was written by a newer collection layout.
    UnsupportedLayout {
        found: u32,
        supported: u32,
    },
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    Serialization(serde_json::Error),
    #[cfg(feature = "mongodb")]
    Mongo(mongodb::error::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "conversation not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidConfig(message) => write!(f, "invalid store configuration: {message}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted conversation data: {message}")
            }
            Self::MissingCollection(name) => {
                write!(f, "required collection `{name}` is missing")
            }
            Self::UnsupportedLayout { found, supported } => write!(
                f,
                "collection layout version {found} is newer than supported {supported}"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "{err}"),
            #[cfg(feature = "mongodb")]
            Self::Mongo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Serialization(err) => Some(err),
            #[cfg(feature = "mongodb")]
            Self::Mongo(err) => Some(err),
            Self::NotFound(_)
            | Self::InvalidConfig(_)
            | Self::InvalidData(_)
            | Self::MissingCollection(_)
            | Self::UnsupportedLayout { .. } => None,
        }
    }
}

impl From<ConversationValidationError> for StoreError {
    fn from(value: ConversationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for StoreError {
    fn from(value: mongodb::error::Error) -> Self {
        Self::Mongo(value)
    }
}

/// Lifecycle operations over one collection of conversation documents.
///
/// Every call is a single blocking request against the backing store.
/// Implementations own their connection; `close` (or drop) releases it.
pub trait ConversationStore {
    /// Inserts an empty conversation and returns the store-assigned handle.
    ///
    /// Uniqueness of `conversation_id` is not checked.
    fn create(&self, conversation_id: &str) -> StoreResult<StorageHandle>;

    /// Returns the first conversation whose id matches, or `None`.
    fn get(&self, conversation_id: &str) -> StoreResult<Option<Conversation>>;

    /// Appends one message pair and refreshes `updated_at` in one update.
    ///
    /// Returns whether the store reported a modified document.
    ///
    /// # Errors
    /// - `StoreError::NotFound` when no conversation matches.
    fn append_message(
        &self,
        conversation_id: &str,
        nurse_message: &str,
        bot_message: &str,
    ) -> StoreResult<bool>;

    /// Removes the matching conversation. Returns `true` when exactly one
    /// document was removed.
    ///
    /// # Errors
    /// - `StoreError::NotFound` when no conversation matches.
    fn delete(&self, conversation_id: &str) -> StoreResult<bool>;

    /// Releases the underlying connection.
    fn close(self) -> StoreResult<()>
    where
        Self: Sized;

    /// Returns stored message pairs in insertion order.
    ///
    /// A missing conversation and an empty one both yield an empty list; use
    /// `list_messages_strict` to tell them apart.
    fn list_messages(&self, conversation_id: &str) -> StoreResult<Vec<MessagePair>> {
        Ok(self
            .get(conversation_id)?
            .map(|conversation| conversation.messages)
            .unwrap_or_default())
    }

    /// Like `list_messages`, but a missing conversation is `NotFound`.
    fn list_messages_strict(&self, conversation_id: &str) -> StoreResult<Vec<MessagePair>> {
        match self.get(conversation_id)? {
            Some(conversation) => Ok(conversation.messages),
            None => Err(StoreError::NotFound(conversation_id.to_string())),
        }
    }

    fn exists(&self, conversation_id: &str) -> StoreResult<bool> {
        Ok(self.get(conversation_id)?.is_some())
    }
}
