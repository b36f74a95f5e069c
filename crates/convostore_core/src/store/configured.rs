//! Backend selection from a `StoreConfig`.

use crate::config::{Backend, StoreConfig};
use crate::model::conversation::{Conversation, StorageHandle};
#[cfg(feature = "mongodb")]
use crate::store::mongo_store::MongoConversationStore;
use crate::store::conversation_store::{ConversationStore, StoreError, StoreResult};
use crate::store::sqlite_store::SqliteConversationStore;

/// A conversation store whose backend was chosen by configuration.
pub enum ConfiguredStore {
    Sqlite(SqliteConversationStore),
    #[cfg(feature = "mongodb")]
    MongoDb(MongoConversationStore),
}

/// Opens the store addressed by `config`.
///
/// # Errors
/// - `InvalidConfig` for invalid settings, or a MongoDB connection string
///   when the crate was built without the `mongodb` feature.
/// - Backend connection errors, untranslated.
pub fn open_store(config: &StoreConfig) -> StoreResult<ConfiguredStore> {
    match config.backend().map_err(StoreError::InvalidConfig)? {
        Backend::Sqlite(_) => Ok(ConfiguredStore::Sqlite(SqliteConversationStore::open(
            config,
        )?)),
        #[cfg(feature = "mongodb")]
        Backend::MongoDb => Ok(ConfiguredStore::MongoDb(MongoConversationStore::open(
            config,
        )?)),
        #[cfg(not(feature = "mongodb"))]
        Backend::MongoDb => Err(StoreError::InvalidConfig(
            "MongoDB connection strings require the `mongodb` feature".to_string(),
        )),
    }
}

impl ConfiguredStore {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            #[cfg(feature = "mongodb")]
            Self::MongoDb(_) => "mongodb",
        }
    }
}

impl ConversationStore for ConfiguredStore {
    fn create(&self, conversation_id: &str) -> StoreResult<StorageHandle> {
        match self {
            Self::Sqlite(store) => store.create(conversation_id),
            #[cfg(feature = "mongodb")]
            Self::MongoDb(store) => store.create(conversation_id),
        }
    }

    fn get(&self, conversation_id: &str) -> StoreResult<Option<Conversation>> {
        match self {
            Self::Sqlite(store) => store.get(conversation_id),
            #[cfg(feature = "mongodb")]
            Self::MongoDb(store) => store.get(conversation_id),
        }
    }

    fn append_message(
        &self,
        conversation_id: &str,
        nurse_message: &str,
        bot_message: &str,
    ) -> StoreResult<bool> {
        match self {
            Self::Sqlite(store) => store.append_message(conversation_id, nurse_message, bot_message),
            #[cfg(feature = "mongodb")]
            Self::MongoDb(store) => {
                store.append_message(conversation_id, nurse_message, bot_message)
            }
        }
    }

    fn delete(&self, conversation_id: &str) -> StoreResult<bool> {
        match self {
            Self::Sqlite(store) => store.delete(conversation_id),
            #[cfg(feature = "mongodb")]
            Self::MongoDb(store) => store.delete(conversation_id),
        }
    }

    fn close(self) -> StoreResult<()> {
        match self {
            Self::Sqlite(store) => store.close(),
            #[cfg(feature = "mongodb")]
            Self::MongoDb(store) => store.close(),
        }
    }
}
