//! Configuration loading and management.
//!
//! Lookup order for the config file: an explicit `--config` path,
//! `./task-tracker.yaml`, then `<user config dir>/task-tracker/config.yaml`.
//! Environment variables override the file; CLI flags override both.
//!
//! ## Environment Variables
//! - `TASK_TRACKER_DB_PATH` - Database path
//! - `TASK_TRACKER_BIND` - Listen address
//! - `TASK_TRACKER_PORT` - Listen port
//! - `TASK_TRACKER_SESSION_TTL_HOURS` - Login session lifetime

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// Project-local config file name.
pub const LOCAL_CONFIG_FILE: &str = "task-tracker.yaml";

/// Longest accepted login session: ten years.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Lifetime of a login session in hours.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            db_path: default_db_path(),
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".task-tracker/tasks.db")
}

fn default_session_ttl_hours() -> i64 {
    24 * 14 // two weeks
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Find and load the config file, falling back to defaults when none exists.
    ///
    /// An explicit path that cannot be read is an error; the implicit
    /// locations are simply skipped when missing. Returns the path used.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        let mut candidates = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("task-tracker").join("config.yaml"));
        }

        for candidate in candidates {
            if candidate.is_file() {
                return Ok((Self::load(&candidate)?, Some(candidate)));
            }
        }

        Ok((Self::default(), None))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup("TASK_TRACKER_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Some(bind) = lookup("TASK_TRACKER_BIND") {
            self.server.bind = bind;
        }

        if let Some(port) = lookup("TASK_TRACKER_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("TASK_TRACKER_PORT is not a valid port: {}", port))?;
        }

        if let Some(ttl) = lookup("TASK_TRACKER_SESSION_TTL_HOURS") {
            self.server.session_ttl_hours = ttl.parse().with_context(|| {
                format!("TASK_TRACKER_SESSION_TTL_HOURS is not a number: {}", ttl)
            })?;
        }

        Ok(())
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        let ttl = self.server.session_ttl_hours;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&ttl) {
            return Err(anyhow!(
                "server.session_ttl_hours must be between 1 and {}, got {}",
                MAX_SESSION_TTL_HOURS,
                ttl
            ));
        }
        self.socket_addr()?;
        Ok(())
    }

    /// The address the HTTP server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Session lifetime. Out-of-range values fall back to the default;
    /// [`Config::validate`] reports them.
    pub fn session_ttl(&self) -> chrono::Duration {
        let hours = self.server.session_ttl_hours;
        if (1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
            chrono::Duration::hours(hours)
        } else {
            chrono::Duration::hours(default_session_ttl_hours())
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
