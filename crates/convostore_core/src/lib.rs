//! Conversation persistence for chat front-ends.
//!
//! Stores one document per conversation (caller-supplied id, ordered
//! nurse/bot message pairs, created/updated timestamps) and exposes the
//! create/append/get/list/delete lifecycle over it.

pub mod collection;
pub mod config;
pub mod logging;
pub mod model;
pub mod store;

pub use config::{Backend, SqliteTarget, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::conversation::{
    Conversation, ConversationDocument, ConversationValidationError, MessagePair, StorageHandle,
};
#[cfg(feature = "mongodb")]
pub use store::MongoConversationStore;
pub use store::{
    open_store, ConfiguredStore, ConversationStore, SqliteConversationStore, StoreError,
    StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
