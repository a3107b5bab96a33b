//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Environment overrides are applied on top by [`Config::apply_env`].

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::store::{JsonFileStore, MemoryStore, RecordStore, StoreError};

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Record store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Transport settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.uri.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "store.uri must not be empty".to_string(),
            });
        }
        validate_name("store.database", &self.store.database)?;
        validate_name("store.collection", &self.store.collection)?;

        if self.server.host.parse::<IpAddr>().is_err() {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid server.host '{}'. Must be an IP address",
                    self.server.host
                ),
            });
        }

        if self.logging.target == LogTarget::File && self.logging.file.is_none() {
            return Err(ConfigError::ValidationError {
                message: "logging.file is required when logging.target is 'file'".to_string(),
            });
        }

        Ok(())
    }

    /// Applies environment overrides.
    ///
    /// `lookup` normally wraps [`std::env::var`]; empty values are ignored.
    ///
    /// | Variable          | Setting            |
    /// |-------------------|--------------------|
    /// | `STORE_URI`       | `store.uri`        |
    /// | `DB_NAME`         | `store.database`   |
    /// | `COLLECTION_NAME` | `store.collection` |
    /// | `PORT`            | `server.port`      |
    /// | `MCP_MODE`        | `server.mode`      |
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` or `MCP_MODE` cannot be parsed.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(uri) = var("STORE_URI") {
            self.store.uri = uri;
        }
        if let Some(database) = var("DB_NAME") {
            self.store.database = database;
        }
        if let Some(collection) = var("COLLECTION_NAME") {
            self.store.collection = collection;
        }
        if let Some(port) = var("PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "PORT",
                value: port,
            })?;
        }
        if let Some(mode) = var("MCP_MODE") {
            self.server.mode = mode.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "MCP_MODE",
                value: mode,
            })?;
        }

        Ok(())
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\']);

    if invalid {
        return Err(ConfigError::ValidationError {
            message: format!("Invalid {field} '{value}'. Must be a plain, non-empty name"),
        });
    }
    Ok(())
}

/// Record store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store location: `memory`, `file://<path>` or a bare directory path.
    #[serde(default = "default_store_uri")]
    pub uri: String,

    /// Database name (a subdirectory of the store root).
    #[serde(default = "default_database")]
    pub database: String,

    /// Collection name (the JSON file inside the database).
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl StoreConfig {
    /// Parses [`Self::uri`].
    #[must_use]
    pub fn location(&self) -> StoreLocation {
        StoreLocation::parse(&self.uri)
    }

    /// Opens the configured record store.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing collection file cannot be loaded.
    pub fn open(&self) -> Result<Arc<dyn RecordStore>, StoreError> {
        match self.location() {
            StoreLocation::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreLocation::File(root) => Ok(Arc::new(JsonFileStore::open(
                &root,
                &self.database,
                &self.collection,
            )?)),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: default_store_uri(),
            database: default_database(),
            collection: default_collection(),
        }
    }
}

fn default_store_uri() -> String {
    dirs::data_dir().map_or_else(
        || "memory".to_string(),
        |dir| dir.join("student-records-mcp").display().to_string(),
    )
}

fn default_database() -> String {
    "school".to_string()
}

fn default_collection() -> String {
    "students".to_string()
}

/// Where records are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Process memory; lost on exit.
    Memory,
    /// JSON files under this root directory.
    File(PathBuf),
}

impl StoreLocation {
    /// Parses a store URI.
    #[must_use]
    pub fn parse(uri: &str) -> Self {
        let uri = uri.trim();
        if uri.eq_ignore_ascii_case("memory") || uri.eq_ignore_ascii_case("memory://") {
            return Self::Memory;
        }
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        Self::File(PathBuf::from(path))
    }
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport selection.
    #[serde(default)]
    pub mode: TransportMode,

    /// Address the TCP listener binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the TCP listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// The TCP listen address.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::ValidationError {
                message: format!("Invalid server.host '{}'", self.host),
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::default(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

/// How the server talks to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Stdio when stdin is piped, TCP when it is a terminal.
    #[default]
    Auto,
    /// One session on stdin/stdout.
    Stdio,
    /// One session per TCP connection.
    Tcp,
}

impl TransportMode {
    /// Resolves [`Self::Auto`] against the state of stdin.
    #[must_use]
    pub const fn resolve(self, stdin_is_terminal: bool) -> Self {
        match self {
            Self::Auto if stdin_is_terminal => Self::Tcp,
            Self::Auto => Self::Stdio,
            other => other,
        }
    }

    /// The mode's configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Stdio => "stdio",
            Self::Tcp => "tcp",
        }
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "stdio" => Ok(Self::Stdio),
            "tcp" => Ok(Self::Tcp),
            other => Err(format!("unknown transport mode '{other}'")),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Where log lines go.
    #[serde(default)]
    pub target: LogTarget,

    /// Log file, required when `target` is `file`.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            target: LogTarget::default(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Log sink. Stdout is reserved for protocol traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard error.
    #[default]
    Stderr,
    /// Appended to `logging.file`.
    File,
    /// Discarded.
    Off,
}
