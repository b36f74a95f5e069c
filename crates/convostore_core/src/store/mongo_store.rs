//! MongoDB-backed conversation store (cargo feature `mongodb`).
//!
//! Uses the blocking `mongodb::sync` client against the `conversations`
//! collection of the configured database. Documents have the same shape as
//! the SQLite backend, with BSON datetimes for the timestamps and the
//! inserted `ObjectId` as storage handle.

use crate::config::{Backend, StoreConfig};
use crate::model::conversation::{
    validate_conversation_id, Conversation, ConversationDocument, MessagePair, StorageHandle,
};
use crate::store::conversation_store::{ConversationStore, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use mongodb::sync::{Client, Collection};
use serde::{Deserialize, Serialize};

const COLLECTION: &str = "conversations";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoConversation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    conversation_id: String,
    messages: Vec<MessagePair>,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

/// Conversation store over an exclusively owned MongoDB client.
pub struct MongoConversationStore {
    client: Client,
    conversations: Collection<MongoConversation>,
}

impl MongoConversationStore {
    /// Connects to the MongoDB deployment addressed by `config`.
    ///
    /// # Errors
    /// - `InvalidConfig` when the configuration does not address MongoDB.
    /// - `Mongo` when the connection string cannot be parsed or resolved.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        if config.backend().map_err(StoreError::InvalidConfig)? != Backend::MongoDb {
            return Err(StoreError::InvalidConfig(format!(
                "`{}` is not a MongoDB connection string",
                config.connection_string
            )));
        }

        let client = Client::with_uri_str(config.connection_string.trim())?;
        let conversations = client
            .database(&config.database_name)
            .collection::<MongoConversation>(COLLECTION);

        info!(
            "event=store_open module=store status=ok backend=mongodb database={}",
            config.database_name
        );
        Ok(Self {
            client,
            conversations,
        })
    }

    fn find(&self, conversation_id: &str) -> StoreResult<Option<MongoConversation>> {
        if validate_conversation_id(conversation_id).is_err() {
            return Ok(None);
        }
        Ok(self
            .conversations
            .find_one(doc! { "conversation_id": conversation_id }, None)?)
    }
}

impl ConversationStore for MongoConversationStore {
    fn create(&self, conversation_id: &str) -> StoreResult<StorageHandle> {
        validate_conversation_id(conversation_id)?;

        let now = BsonDateTime::now();
        let record = MongoConversation {
            id: None,
            conversation_id: conversation_id.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let result = self.conversations.insert_one(&record, None)?;
        let handle = match result.inserted_id.as_object_id() {
            Some(oid) => StorageHandle::new(oid.to_hex()),
            None => StorageHandle::new(result.inserted_id.to_string()),
        };

        debug!(
            "event=conversation_create module=store status=ok backend=mongodb conversation_id={} handle={}",
            conversation_id, handle
        );
        Ok(handle)
    }

    fn get(&self, conversation_id: &str) -> StoreResult<Option<Conversation>> {
        self.find(conversation_id)?.map(into_conversation).transpose()
    }

    fn append_message(
        &self,
        conversation_id: &str,
        nurse_message: &str,
        bot_message: &str,
    ) -> StoreResult<bool> {
        let Some(record) = self.find(conversation_id)? else {
            warn!(
                "event=conversation_append module=store status=error backend=mongodb error_code=not_found conversation_id={}",
                conversation_id
            );
            return Err(StoreError::NotFound(conversation_id.to_string()));
        };

        let result = self.conversations.update_one(
            doc! { "_id": record.id },
            append_pipeline(nurse_message, bot_message),
            None,
        )?;

        debug!(
            "event=conversation_append module=store status=ok backend=mongodb conversation_id={} changed={}",
            conversation_id, result.modified_count
        );
        Ok(result.modified_count > 0)
    }

    fn delete(&self, conversation_id: &str) -> StoreResult<bool> {
        let Some(record) = self.find(conversation_id)? else {
            warn!(
                "event=conversation_delete module=store status=error backend=mongodb error_code=not_found conversation_id={}",
                conversation_id
            );
            return Err(StoreError::NotFound(conversation_id.to_string()));
        };

        let result = self
            .conversations
            .delete_one(doc! { "_id": record.id }, None)?;

        debug!(
            "event=conversation_delete module=store status=ok backend=mongodb conversation_id={} deleted={}",
            conversation_id, result.deleted_count
        );
        Ok(result.deleted_count == 1)
    }

    fn close(self) -> StoreResult<()> {
        drop(self.conversations);
        drop(self.client);
        info!("event=store_close module=store status=ok backend=mongodb");
        Ok(())
    }
}

/// Update pipeline that pushes one pair and sets `updated_at` to
/// `max($$NOW, updated_at + 1ms)`, evaluated server-side in one
/// single-document update.
///
/// The pair goes through `$literal` so message text starting with `$` is
/// stored as text instead of being read as a field path.
fn append_pipeline(nurse_message: &str, bot_message: &str) -> Vec<Document> {
    vec![doc! {
        "$set": {
            "messages": {
                "$concatArrays": [
                    "$messages",
                    [{ "$literal": { "nurse": nurse_message, "bot": bot_message } }],
                ],
            },
            "updated_at": {
                "$max": ["$$NOW", { "$add": ["$updated_at", 1] }],
            },
        },
    }]
}

fn into_conversation(record: MongoConversation) -> StoreResult<Conversation> {
    let handle = record
        .id
        .map(|oid| oid.to_hex())
        .ok_or_else(|| StoreError::InvalidData("document without `_id`".to_string()))?;

    let document = ConversationDocument {
        conversation_id: record.conversation_id,
        messages: record.messages,
        created_at: to_chrono(record.created_at, &handle)?,
        updated_at: to_chrono(record.updated_at, &handle)?,
    };

    Conversation::from_document(StorageHandle::new(handle.clone()), document).map_err(|err| {
        StoreError::InvalidData(format!("document `{handle}` is invalid: {err}"))
    })
}

fn to_chrono(value: BsonDateTime, handle: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value.timestamp_millis()).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "document `{handle}` has an out-of-range datetime"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::append_pipeline;
    use mongodb::bson::{doc, Bson};

    #[test]
    fn append_pipeline_keeps_message_text_literal() {
        let pipeline = append_pipeline("$where", "{\"$gt\": 1}");
        assert_eq!(pipeline.len(), 1);

        let set = pipeline[0].get_document("$set").unwrap();
        let concat = set
            .get_document("messages")
            .unwrap()
            .get_array("$concatArrays")
            .unwrap();
        assert_eq!(concat[0], Bson::String("$messages".to_string()));
        assert_eq!(
            concat[1],
            Bson::Array(vec![Bson::Document(doc! {
                "$literal": { "nurse": "$where", "bot": "{\"$gt\": 1}" }
            })])
        );
    }

    #[test]
    fn append_pipeline_never_moves_updated_at_backwards() {
        let pipeline = append_pipeline("hi", "hello");
        let set = pipeline[0].get_document("$set").unwrap();

        assert_eq!(
            set.get_document("updated_at").unwrap(),
            &doc! { "$max": ["$$NOW", { "$add": ["$updated_at", 1] }] }
        );
    }
}
