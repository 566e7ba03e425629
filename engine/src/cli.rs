//! CLI interface for Larder
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for talking to the assistant.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Larder Kitchen Assistant Engine
///
/// A governed, cost-aware assistant that routes pantry requests through
/// capability agents while keeping model calls to a minimum.
#[derive(Parser, Debug)]
#[command(name = "larder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Process a single message and print the reply
    Ask {
        /// The message to process
        message: String,

        /// Kitchen to operate on (defaults to the configured kitchen)
        #[arg(short, long)]
        kitchen: Option<i64>,

        /// User email attached to the request
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Start an interactive chat session
    Chat {
        /// Kitchen to operate on (defaults to the configured kitchen)
        #[arg(short, long)]
        kitchen: Option<i64>,

        /// User email attached to the session
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Show configuration summary and backend reachability
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_command_parses() {
        let cli = Cli::parse_from(["larder", "ask", "show inventory"]);
        match cli.command {
            Command::Ask { message, kitchen, user } => {
                assert_eq!(message, "show inventory");
                assert_eq!(kitchen, None);
                assert_eq!(user, None);
            }
            _ => panic!("expected ask command"),
        }
    }

    #[test]
    fn test_ask_with_kitchen_and_user() {
        let cli = Cli::parse_from([
            "larder", "ask", "hello", "--kitchen", "7", "--user", "a@example.com",
        ]);
        match cli.command {
            Command::Ask { kitchen, user, .. } => {
                assert_eq!(kitchen, Some(7));
                assert_eq!(user.as_deref(), Some("a@example.com"));
            }
            _ => panic!("expected ask command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["larder", "--log", "debug", "status"]);
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Status));
    }
}
