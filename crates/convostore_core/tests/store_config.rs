use convostore_core::{
    open_store, ConfiguredStore, ConversationStore, MessagePair, SqliteConversationStore,
    StoreConfig, StoreError,
};

#[test]
fn open_store_selects_sqlite_for_memory_connection() {
    let store = open_store(&StoreConfig::in_memory("chat")).unwrap();
    assert_eq!(store.backend_name(), "sqlite");
    assert!(matches!(store, ConfiguredStore::Sqlite(_)));

    store.create("c1").unwrap();
    assert!(store.append_message("c1", "hi", "hello").unwrap());
    assert_eq!(
        store.list_messages("c1").unwrap(),
        vec![MessagePair::new("hi", "hello")]
    );
    store.close().unwrap();
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let connection = format!("sqlite://{}", dir.path().display());
    let config = StoreConfig::new(connection, "ward_7");

    let store = open_store(&config).unwrap();
    let handle = store.create("c1").unwrap();
    store.append_message("c1", "hi", "hello").unwrap();
    store.close().unwrap();

    assert!(dir.path().join("ward_7.sqlite3").exists());

    let reopened = open_store(&config).unwrap();
    let conversation = reopened.get("c1").unwrap().unwrap();
    assert_eq!(conversation.handle, handle);
    assert_eq!(conversation.messages, vec![MessagePair::new("hi", "hello")]);
}

#[test]
fn database_names_are_isolated_from_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let connection = dir.path().to_str().unwrap().to_string();

    let first = open_store(&StoreConfig::new(connection.clone(), "first")).unwrap();
    let second = open_store(&StoreConfig::new(connection, "second")).unwrap();
    first.create("c1").unwrap();

    assert!(first.get("c1").unwrap().is_some());
    assert!(second.get("c1").unwrap().is_none());
}

#[test]
fn dropping_a_store_releases_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().to_str().unwrap(), "scoped");

    {
        let store = open_store(&config).unwrap();
        store.create("c1").unwrap();
    }

    let store = open_store(&config).unwrap();
    assert!(store.delete("c1").unwrap());
}

#[test]
fn invalid_configuration_is_rejected() {
    let err = open_store(&StoreConfig::new("", "chat")).err().unwrap();
    assert!(matches!(err, StoreError::InvalidConfig(_)));

    let err = open_store(&StoreConfig::new(":memory:", "bad name"))
        .err()
        .unwrap();
    assert!(matches!(err, StoreError::InvalidConfig(_)));
}

#[test]
fn sqlite_store_refuses_mongodb_connection_string() {
    let err = SqliteConversationStore::open(&StoreConfig::new("mongodb://localhost", "chat"))
        .err()
        .unwrap();
    assert!(matches!(err, StoreError::InvalidConfig(_)));
}

#[cfg(not(feature = "mongodb"))]
#[test]
fn mongodb_connection_string_requires_feature() {
    let err = open_store(&StoreConfig::new("mongodb://localhost:27017", "chat"))
        .err()
        .unwrap();
    assert!(matches!(err, StoreError::InvalidConfig(ref msg) if msg.contains("mongodb")));
}
