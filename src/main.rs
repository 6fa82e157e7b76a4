//! Task Tracker
//!
//! A small multi-user web app for tracking tasks and their subtasks.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use task_tracker::cli::{Cli, Command};
use task_tracker::config::Config;
use task_tracker::db::Database;
use task_tracker::logging;
use task_tracker::web;
use tracing::{info, warn};

/// Resolve configuration: file, then environment, then CLI flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let (mut config, path) = Config::discover(cli.config.as_deref().map(Path::new))?;
    match &path {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    config.apply_env()?;

    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    config.validate()?;
    Ok(config)
}

fn open_database(config: &Config) -> Result<Database> {
    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path)?;
    match db.purge_expired_sessions() {
        Ok(0) => {}
        Ok(n) => info!("Purged {} expired sessions", n),
        Err(e) => warn!("Failed to purge expired sessions: {}", e),
    }
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log, cli.verbose)?;

    let config = load_config(&cli)?;
    let db = open_database(&config)?;

    match cli.command {
        Some(Command::CreateUser { username, password }) => {
            let user = db.create_user(&username, &password)?;
            println!("Created user '{}' (id {})", user.username, user.id);
        }
        Some(Command::DeleteUser { username }) => {
            let user = db.get_user_by_username(&username)?;
            db.delete_user(user.id)?;
            println!("Deleted user '{}' and all of their tasks", user.username);
        }
        Some(Command::Serve) | None => {
            info!("Starting Task Tracker v{}", env!("CARGO_PKG_VERSION"));
            info!("Database: {:?}", config.server.db_path);
            web::serve(Arc::new(db), &config).await?;
        }
    }

    Ok(())
}
