//! CLI command definitions for task-tracker
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Parser, Subcommand};

/// Personal task tracker web server and account tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Address to listen on (overrides config)
    #[arg(long, global = true)]
    pub bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server (default if no subcommand given)
    Serve,

    /// Create a user account
    CreateUser {
        /// Login name
        username: String,

        /// Password for the new account
        #[arg(long)]
        password: String,
    },

    /// Delete a user account together with all of its tasks
    DeleteUser {
        /// Login name
        username: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::parse_from(["task-tracker"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log, "2");
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["task-tracker", "serve", "--port", "9000", "-v"]);
        assert!(matches!(cli.command, Some(Command::Serve)));
        assert_eq!(cli.port, Some(9000));
        assert!(cli.verbose);
    }

    #[test]
    fn create_user_requires_password() {
        assert!(Cli::try_parse_from(["task-tracker", "create-user", "ana"]).is_err());
        let cli =
            Cli::try_parse_from(["task-tracker", "create-user", "ana", "--password", "pw"]).unwrap();
        match cli.command {
            Some(Command::CreateUser { username, password }) => {
                assert_eq!(username, "ana");
                assert_eq!(password, "pw");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
