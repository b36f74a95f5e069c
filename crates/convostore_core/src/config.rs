//! Store connection configuration.
//!
//! # Responsibility
//! - Carry the connection string and database name supplied at construction.
//! - Resolve which storage backend a connection string addresses.
//!
//! # Invariants
//! - Configuration is never read from the environment.
//! - Database names are restricted to `[A-Za-z0-9_-]` so they are safe as
//!   file names and MongoDB database names.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

const MEMORY_CONNECTION_STRINGS: &[&str] = &[":memory:", "sqlite::memory:"];
const SQLITE_SCHEME: &str = "sqlite://";
const MONGODB_SCHEMES: &[&str] = &["mongodb://", "mongodb+srv://"];
const SQLITE_FILE_EXTENSION: &str = "sqlite3";

static DATABASE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid database name regex"));

/// Connection settings for a conversation store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub connection_string: String,
    pub database_name: String,
}

/// Storage backend addressed by a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Sqlite(SqliteTarget),
    MongoDb,
}

/// Where a SQLite-backed store keeps its documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    File(PathBuf),
}

impl StoreConfig {
    pub fn new(connection_string: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            database_name: database_name.into(),
        }
    }

    /// Configuration for a private in-memory SQLite store.
    pub fn in_memory(database_name: impl Into<String>) -> Self {
        Self::new(MEMORY_CONNECTION_STRINGS[0], database_name)
    }

    /// Checks that both settings are usable.
    ///
    /// # Errors
    /// - Returns an error when the connection string is blank.
    /// - Returns an error when the database name is outside `[A-Za-z0-9_-]{1,64}`.
    pub fn validate(&self) -> Result<(), String> {
        if self.connection_string.trim().is_empty() {
            return Err("connection string cannot be empty".to_string());
        }
        if !DATABASE_NAME_RE.is_match(&self.database_name) {
            return Err(format!(
                "invalid database name `{}`; expected 1-64 characters of [A-Za-z0-9_-]",
                self.database_name
            ));
        }
        Ok(())
    }

    /// Resolves the backend for this configuration.
    ///
    /// - `:memory:` / `sqlite::memory:` -> in-memory SQLite.
    /// - `mongodb://...` / `mongodb+srv://...` -> MongoDB.
    /// - anything else (optionally `sqlite://`-prefixed) is a directory that
    ///   holds `<database_name>.sqlite3`.
    pub fn backend(&self) -> Result<Backend, String> {
        self.validate()?;
        let connection = self.connection_string.trim();

        if MEMORY_CONNECTION_STRINGS.contains(&connection) {
            return Ok(Backend::Sqlite(SqliteTarget::Memory));
        }
        if MONGODB_SCHEMES
            .iter()
            .any(|scheme| connection.starts_with(scheme))
        {
            return Ok(Backend::MongoDb);
        }

        let dir = connection.strip_prefix(SQLITE_SCHEME).unwrap_or(connection);
        if dir.is_empty() {
            return Err(format!(
                "connection string `{connection}` does not name a directory"
            ));
        }
        let file = PathBuf::from(dir).join(format!(
            "{}.{SQLITE_FILE_EXTENSION}",
            self.database_name
        ));
        Ok(Backend::Sqlite(SqliteTarget::File(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::{Backend, SqliteTarget, StoreConfig};
    use std::path::PathBuf;

    #[test]
    fn memory_connection_strings_resolve_to_memory() {
        for connection in [":memory:", "sqlite::memory:", "  :memory: "] {
            let config = StoreConfig::new(connection, "chat");
            assert_eq!(
                config.backend().unwrap(),
                Backend::Sqlite(SqliteTarget::Memory)
            );
        }
    }

    #[test]
    fn directory_connection_string_maps_database_to_file() {
        let config = StoreConfig::new("sqlite:///var/lib/convostore", "nursing");
        assert_eq!(
            config.backend().unwrap(),
            Backend::Sqlite(SqliteTarget::File(PathBuf::from(
                "/var/lib/convostore/nursing.sqlite3"
            )))
        );

        let bare = StoreConfig::new("data", "nursing");
        assert_eq!(
            bare.backend().unwrap(),
            Backend::Sqlite(SqliteTarget::File(PathBuf::from("data/nursing.sqlite3")))
        );
    }

    #[test]
    fn mongodb_schemes_are_recognized() {
        let plain = StoreConfig::new("mongodb://localhost:27017", "chat");
        let srv = StoreConfig::new("mongodb+srv://cluster.example.net", "chat");
        assert_eq!(plain.backend().unwrap(), Backend::MongoDb);
        assert_eq!(srv.backend().unwrap(), Backend::MongoDb);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(StoreConfig::new("", "chat").validate().is_err());
        assert!(StoreConfig::new(":memory:", "").validate().is_err());
        assert!(StoreConfig::new(":memory:", "../escape").validate().is_err());
        assert!(StoreConfig::new("sqlite://", "chat").backend().is_err());
        assert!(StoreConfig::in_memory("chat_v2-test").validate().is_ok());
    }
}
