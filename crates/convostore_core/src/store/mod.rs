//! Conversation store contract and backend implementations.
//!
//! # Responsibility
//! - Define the conversation lifecycle contract (`ConversationStore`).
//! - Translate caller-supplied conversation ids into document lookups and
//!   single-document mutations.
//! - Select a backend from `StoreConfig`.
//!
//! # Invariants
//! - Mutating operations on a missing conversation fail with `NotFound`.
//! - Read operations degrade to absent/empty instead of failing.
//! - Underlying store errors propagate untranslated; no retries.

mod configured;
pub mod conversation_store;
#[cfg(feature = "mongodb")]
pub mod mongo_store;
pub mod sqlite_store;

pub use configured::{open_store, ConfiguredStore};
pub use conversation_store::{ConversationStore, StoreError, StoreResult};
#[cfg(feature = "mongodb")]
pub use mongo_store::MongoConversationStore;
pub use sqlite_store::SqliteConversationStore;
