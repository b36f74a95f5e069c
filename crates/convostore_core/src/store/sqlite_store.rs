//! SQLite-backed conversation store.
//!
//! Each conversation is one JSON document in the `conversations` collection
//! table, keyed by a generated storage handle.
//!
//! # Invariants
//! - Lookups by `conversation_id` return the earliest inserted match.
//! - Append and delete run their existence check and mutation inside one
//!   `IMMEDIATE` transaction, so concurrent writers serialize on the
//!   database lock instead of losing updates.
//! - `updated_at` strictly increases on every append.

use crate::config::{Backend, StoreConfig};
use crate::collection::{open_collection, COLLECTION};
use crate::model::conversation::{
    now_millis, validate_conversation_id, Conversation, ConversationDocument, MessagePair,
    StorageHandle,
};
use crate::store::conversation_store::{ConversationStore, StoreError, StoreResult};
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const FIND_BY_CONVERSATION_ID_SQL: &str = "SELECT _id, document
FROM conversations
WHERE json_extract(document, '$.conversation_id') = ?1
ORDER BY rowid ASC
LIMIT 1;";

/// Pushes one pair onto `messages` and bumps `updated_at` to
/// `max(now, previous + 1ms)` in a single statement.
const APPEND_MESSAGE_SQL: &str = "UPDATE conversations
SET document = json_set(
    json_insert(document, '$.messages[#]', json(?2)),
    '$.updated_at',
    max(?3, json_extract(document, '$.updated_at') + 1)
)
WHERE _id = ?1;";

/// Conversation store over an exclusively owned SQLite connection.
pub struct SqliteConversationStore {
    conn: Connection,
}

impl SqliteConversationStore {
    /// Opens the SQLite database addressed by `config` and prepares the
    /// collection.
    ///
    /// # Errors
    /// - `InvalidConfig` when the configuration is invalid or addresses a
    ///   non-SQLite backend.
    /// - `Sqlite`/`Io`/`UnsupportedLayout` when the database cannot be
    ///   opened or prepared.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let conn = match config.backend().map_err(StoreError::InvalidConfig)? {
            Backend::Sqlite(target) => open_collection(&target)?,
            Backend::MongoDb => {
                return Err(StoreError::InvalidConfig(format!(
                    "`{}` is not a SQLite connection string",
                    config.connection_string
                )))
            }
        };
        Ok(Self { conn })
    }

    /// Wraps a connection already prepared by `open_collection`.
    ///
    /// # Errors
    /// - `MissingCollection` when the `conversations` table does not exist.
    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        if !collection_exists(&conn)? {
            return Err(StoreError::MissingCollection(COLLECTION));
        }
        Ok(Self { conn })
    }

    /// Number of stored documents, duplicates included.
    pub fn document_count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM conversations;", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

impl ConversationStore for SqliteConversationStore {
    fn create(&self, conversation_id: &str) -> StoreResult<StorageHandle> {
        validate_conversation_id(conversation_id)?;

        let handle = StorageHandle::new(Uuid::new_v4().simple().to_string());
        let document = ConversationDocument::new_empty(conversation_id, now_millis());
        let body = serde_json::to_string(&document)?;

        self.conn.execute(
            "INSERT INTO conversations (_id, document) VALUES (?1, ?2);",
            params![handle.as_str(), body],
        )?;

        debug!(
            "event=conversation_create module=store status=ok backend=sqlite conversation_id={} handle={}",
            conversation_id, handle
        );
        Ok(handle)
    }

    fn get(&self, conversation_id: &str) -> StoreResult<Option<Conversation>> {
        find_conversation(&self.conn, conversation_id)
    }

    fn append_message(
        &self,
        conversation_id: &str,
        nurse_message: &str,
        bot_message: &str,
    ) -> StoreResult<bool> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let Some(conversation) = find_conversation(&tx, conversation_id)? else {
            warn!(
                "event=conversation_append module=store status=error backend=sqlite error_code=not_found conversation_id={}",
                conversation_id
            );
            return Err(StoreError::NotFound(conversation_id.to_string()));
        };

        let pair = serde_json::to_string(&MessagePair::new(nurse_message, bot_message))?;
        let changed = tx.execute(
            APPEND_MESSAGE_SQL,
            params![
                conversation.handle.as_str(),
                pair,
                now_millis().timestamp_millis()
            ],
        )?;
        tx.commit()?;

        debug!(
            "event=conversation_append module=store status=ok backend=sqlite conversation_id={} changed={}",
            conversation_id, changed
        );
        Ok(changed > 0)
    }

    fn delete(&self, conversation_id: &str) -> StoreResult<bool> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let Some(conversation) = find_conversation(&tx, conversation_id)? else {
            warn!(
                "event=conversation_delete module=store status=error backend=sqlite error_code=not_found conversation_id={}",
                conversation_id
            );
            return Err(StoreError::NotFound(conversation_id.to_string()));
        };

        let deleted = tx.execute(
            "DELETE FROM conversations WHERE _id = ?1;",
            [conversation.handle.as_str()],
        )?;
        tx.commit()?;

        debug!(
            "event=conversation_delete module=store status=ok backend=sqlite conversation_id={} deleted={}",
            conversation_id, deleted
        );
        Ok(deleted == 1)
    }

    fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, err)| StoreError::from(err))?;
        info!("event=store_close module=store status=ok backend=sqlite");
        Ok(())
    }
}

fn find_conversation(conn: &Connection, conversation_id: &str) -> StoreResult<Option<Conversation>> {
    if validate_conversation_id(conversation_id).is_err() {
        return Ok(None);
    }

    let mut stmt = conn.prepare_cached(FIND_BY_CONVERSATION_ID_SQL)?;
    let raw = stmt
        .query_row([conversation_id], read_raw_document)
        .optional()?;

    raw.map(|(handle, body)| parse_conversation(handle, &body))
        .transpose()
}

fn read_raw_document(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get("_id")?, row.get("document")?))
}

fn parse_conversation(handle: String, body: &str) -> StoreResult<Conversation> {
    let document: ConversationDocument = serde_json::from_str(body).map_err(|err| {
        StoreError::InvalidData(format!("document `{handle}` does not decode: {err}"))
    })?;

    Conversation::from_document(StorageHandle::new(handle.clone()), document).map_err(|err| {
        StoreError::InvalidData(format!("document `{handle}` is invalid: {err}"))
    })
}

fn collection_exists(conn: &Connection) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [COLLECTION],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
