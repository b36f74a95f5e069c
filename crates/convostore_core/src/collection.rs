//! SQLite layout of the `conversations` document collection.
//!
//! One table holds one JSON document per row, keyed by the storage handle.
//! An expression index on `$.conversation_id` serves every lookup. The
//! layout version is stamped in `PRAGMA user_version`, so a binary refuses a
//! file written by a newer layout instead of misreading it.
//!
//! # Invariants
//! - A returned connection has the collection and its index in place.
//! - Layout creation runs in one `IMMEDIATE` transaction, so concurrent
//!   openers of a fresh file do not race.
//! - `conversation_id` is indexed, never constrained unique.

use crate::config::SqliteTarget;
use crate::store::conversation_store::{StoreError, StoreResult};
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::time::{Duration, Instant};

pub const COLLECTION: &str = "conversations";
pub const CONVERSATION_ID_INDEX: &str = "idx_conversations_conversation_id";
pub const LAYOUT_VERSION: u32 = 1;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_COLLECTION_SQL: &str = "CREATE TABLE IF NOT EXISTS conversations (
    _id TEXT PRIMARY KEY NOT NULL,
    document TEXT NOT NULL CHECK (json_valid(document))
);
CREATE INDEX IF NOT EXISTS idx_conversations_conversation_id
    ON conversations (json_extract(document, '$.conversation_id'));";

/// Opens the SQLite database behind `target` and makes sure the collection
/// exists.
///
/// File targets get their parent directory created first.
///
/// # Side effects
/// - Emits `collection_open` events with mode, duration and status.
pub fn open_collection(target: &SqliteTarget) -> StoreResult<Connection> {
    let started_at = Instant::now();
    let mode = match target {
        SqliteTarget::Memory => "memory",
        SqliteTarget::File(_) => "file",
    };
    info!("event=collection_open module=collection status=start mode={mode}");

    let opened = connect(target).and_then(|mut conn| {
        prepare_collection(&mut conn)?;
        Ok(conn)
    });

    match &opened {
        Ok(_) => info!(
            "event=collection_open module=collection status=ok mode={} duration_ms={}",
            mode,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=collection_open module=collection status=error mode={} duration_ms={} error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    opened
}

/// Layout version stamped on the database, `0` for a fresh file.
pub fn layout_version(conn: &Connection) -> StoreResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

fn connect(target: &SqliteTarget) -> StoreResult<Connection> {
    match target {
        SqliteTarget::Memory => Ok(Connection::open_in_memory()?),
        SqliteTarget::File(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Connection::open(path)?)
        }
    }
}

fn prepare_collection(conn: &mut Connection) -> StoreResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;

    let found = layout_version(conn)?;
    if found > LAYOUT_VERSION {
        return Err(StoreError::UnsupportedLayout {
            found,
            supported: LAYOUT_VERSION,
        });
    }
    if found == LAYOUT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(CREATE_COLLECTION_SQL)?;
    tx.pragma_update(None, "user_version", LAYOUT_VERSION)?;
    tx.commit()?;

    info!(
        "event=collection_layout module=collection status=ok from_version={} to_version={}",
        found, LAYOUT_VERSION
    );
    Ok(())
}
