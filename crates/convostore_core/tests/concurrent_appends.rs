use convostore_core::{ConversationStore, SqliteConversationStore, StoreConfig};
use std::collections::HashSet;
use std::thread;

const WRITERS: usize = 4;
const APPENDS_PER_WRITER: usize = 25;

#[test]
fn concurrent_appends_from_separate_connections_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().to_str().unwrap(), "concurrent");

    let store = SqliteConversationStore::open(&config).unwrap();
    store.create("shared").unwrap();

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let config = config.clone();
            thread::spawn(move || {
                let store = SqliteConversationStore::open(&config).unwrap();
                for index in 0..APPENDS_PER_WRITER {
                    let appended = store
                        .append_message("shared", &format!("w{writer}-{index}"), "ack")
                        .unwrap();
                    assert!(appended);
                }
                store.close().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let messages = store.list_messages("shared").unwrap();
    assert_eq!(messages.len(), WRITERS * APPENDS_PER_WRITER);

    let distinct: HashSet<_> = messages.iter().map(|pair| pair.nurse.as_str()).collect();
    assert_eq!(distinct.len(), WRITERS * APPENDS_PER_WRITER);

    for writer in 0..WRITERS {
        let prefix = format!("w{writer}-");
        let order: Vec<usize> = messages
            .iter()
            .filter_map(|pair| pair.nurse.strip_prefix(prefix.as_str()))
            .map(|index| index.parse().unwrap())
            .collect();
        assert_eq!(order, (0..APPENDS_PER_WRITER).collect::<Vec<_>>());
    }
}

#[test]
fn concurrent_writers_on_different_conversations_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().to_str().unwrap(), "independent");
    let store = SqliteConversationStore::open(&config).unwrap();
    for writer in 0..WRITERS {
        store.create(&format!("c{writer}")).unwrap();
    }

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let config = config.clone();
            thread::spawn(move || {
                let store = SqliteConversationStore::open(&config).unwrap();
                let id = format!("c{writer}");
                for index in 0..APPENDS_PER_WRITER {
                    store.append_message(&id, &index.to_string(), "ack").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for writer in 0..WRITERS {
        let messages = store.list_messages(&format!("c{writer}")).unwrap();
        assert_eq!(messages.len(), APPENDS_PER_WRITER);
    }
}
