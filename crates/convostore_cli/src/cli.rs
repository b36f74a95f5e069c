use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version = env!("CARGO_PKG_VERSION"), about = "Inspect and edit stored conversations")]
pub struct Cli {
    /// Connection string: `:memory:`, a directory (optionally `sqlite://`
    /// prefixed), or a `mongodb://` URI.
    #[arg(long, short = 'c', global = true, default_value = ":memory:")]
    pub connection: String,

    /// Database name inside the connection target.
    #[arg(long, short = 'd', global = true, default_value = "convostore")]
    pub database: String,

    /// Log level (trace|debug|info|warn|error). Logging is off when unset.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Absolute directory for rotated log files. Logs go to stderr when
    /// unset.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    #[command(flatten)]
    Store(StoreCommand),

    /// Print the core library version
    Version,
}

/// Operations that run against an open store.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum StoreCommand {
    /// Create an empty conversation and print its storage handle
    Create {
        conversation_id: String,
    },

    /// Append one nurse/bot message pair
    Append {
        conversation_id: String,
        nurse: String,
        bot: String,
    },

    /// Print a conversation, or `null` when it does not exist
    Get {
        conversation_id: String,
    },

    /// Print the message pairs of a conversation
    Messages {
        conversation_id: String,

        /// Fail instead of printing `[]` when the conversation does not exist
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Delete a conversation
    Delete {
        conversation_id: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command, StoreCommand};

    #[test]
    fn parses_append_with_global_options() {
        let cli = Cli::parse_from([
            "convostore",
            "append",
            "c1",
            "hi",
            "hello",
            "--connection",
            "/var/lib/convostore",
            "-d",
            "ward",
        ]);

        assert_eq!(cli.connection, "/var/lib/convostore");
        assert_eq!(cli.database, "ward");
        assert_eq!(
            cli.command,
            Command::Store(StoreCommand::Append {
                conversation_id: "c1".to_string(),
                nurse: "hi".to_string(),
                bot: "hello".to_string(),
            })
        );
    }

    #[test]
    fn defaults_to_in_memory_store() {
        let cli = Cli::parse_from(["convostore", "messages", "c1", "--strict"]);
        assert_eq!(cli.connection, ":memory:");
        assert_eq!(cli.database, "convostore");
        assert!(cli.log_level.is_none());
        assert_eq!(
            cli.command,
            Command::Store(StoreCommand::Messages {
                conversation_id: "c1".to_string(),
                strict: true,
            })
        );
    }

    #[test]
    fn version_is_separate_from_store_commands() {
        let version = Cli::parse_from(["convostore", "version"]);
        assert_eq!(version.command, Command::Version);

        let get = Cli::parse_from(["convostore", "get", "c1"]);
        assert_eq!(
            get.command,
            Command::Store(StoreCommand::Get {
                conversation_id: "c1".to_string(),
            })
        );
    }
}
