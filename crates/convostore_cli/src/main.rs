//! `convostore` operator binary.
//!
//! Runs one conversation store operation per invocation and prints the
//! result as JSON on stdout.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, StoreCommand};
use convostore_core::{
    core_version, init_logging, open_store, ConversationStore, LogTarget, StoreConfig,
};
use log::info;
use serde_json::{json, Value};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(level) = cli.log_level.as_deref() {
        let target = cli
            .log_dir
            .clone()
            .map_or(LogTarget::Stderr, LogTarget::Directory);
        init_logging(level, target).map_err(anyhow::Error::msg)?;
    }

    let command = match cli.command {
        Command::Version => {
            println!("{}", json!({ "version": core_version() }));
            return Ok(());
        }
        Command::Store(command) => command,
    };

    let config = StoreConfig::new(cli.connection.as_str(), cli.database.as_str());
    let store = open_store(&config)
        .with_context(|| format!("failed to open store `{}`", cli.connection))?;
    info!(
        "event=cli_run module=cli status=start backend={}",
        store.backend_name()
    );

    let outcome = run(&store, command);
    // Why: the store is closed on every exit path, and when both fail the
    // operation error is the one reported.
    let closed = store.close().context("failed to close store");
    let output = outcome?;
    closed?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(store: &impl ConversationStore, command: StoreCommand) -> Result<Value> {
    let output = match command {
        StoreCommand::Create { conversation_id } => {
            let handle = store.create(&conversation_id)?;
            json!({ "handle": handle })
        }
        StoreCommand::Append {
            conversation_id,
            nurse,
            bot,
        } => {
            let appended = store.append_message(&conversation_id, &nurse, &bot)?;
            json!({ "appended": appended })
        }
        StoreCommand::Get { conversation_id } => serde_json::to_value(store.get(&conversation_id)?)?,
        StoreCommand::Messages {
            conversation_id,
            strict,
        } => {
            let messages = if strict {
                store.list_messages_strict(&conversation_id)?
            } else {
                store.list_messages(&conversation_id)?
            };
            serde_json::to_value(messages)?
        }
        StoreCommand::Delete { conversation_id } => {
            let deleted = store.delete(&conversation_id)?;
            json!({ "deleted": deleted })
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use convostore_core::{ConversationStore, SqliteConversationStore, StoreConfig};
    use serde_json::json;

    use super::run;
    use crate::cli::StoreCommand;

    fn store() -> SqliteConversationStore {
        SqliteConversationStore::open(&StoreConfig::in_memory("cli")).unwrap()
    }

    #[test]
    fn create_append_and_list_print_json() {
        let store = store();

        let created = run(
            &store,
            StoreCommand::Create {
                conversation_id: "c1".to_string(),
            },
        )
        .unwrap();
        assert!(created["handle"].is_string());

        let appended = run(
            &store,
            StoreCommand::Append {
                conversation_id: "c1".to_string(),
                nurse: "hi".to_string(),
                bot: "hello".to_string(),
            },
        )
        .unwrap();
        assert_eq!(appended, json!({ "appended": true }));

        let messages = run(
            &store,
            StoreCommand::Messages {
                conversation_id: "c1".to_string(),
                strict: false,
            },
        )
        .unwrap();
        assert_eq!(messages, json!([{ "nurse": "hi", "bot": "hello" }]));
    }

    #[test]
    fn get_missing_prints_null_and_delete_missing_fails() {
        let store = store();

        let missing = run(
            &store,
            StoreCommand::Get {
                conversation_id: "ghost".to_string(),
            },
        )
        .unwrap();
        assert!(missing.is_null());

        let err = run(
            &store,
            StoreCommand::Delete {
                conversation_id: "ghost".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("ghost"));
        assert!(!store.exists("ghost").unwrap());
    }
}
