//! Application configuration management.
//!
//! Handles loading, saving, and validating blueflow configuration including:
//! - Simulated scan and connect latencies
//! - Where initial history and paired devices come from
//! - HTTP bind address and display timezone
//! - Log level and output mode
//!
//! Values come from an optional TOML file, overridden by environment
//! variables of the form `BLUEFLOW__SECTION__KEY`
//! (e.g. `BLUEFLOW__SESSION__SCAN_LATENCY_MS=500`).

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinator::SessionTiming;
use crate::seed::{SeedData, SeedError};

/// Upper bound for any simulated latency, in milliseconds.
pub const MAX_LATENCY_MS: u64 = 60_000;

static MAC_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$").expect("MAC address regex is valid")
});

/// Errors raised while loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file at the given path.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// The file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    ReadError {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteError {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The layered sources could not be merged or deserialized.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] ::config::ConfigError),

    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A single field holds an invalid value.
    #[error("{field}: {message}")]
    ValidationError {
        /// Dotted field path, e.g. `server.port`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session timing.
    pub session: SessionConfig,

    /// Initial state.
    pub seed: SeedConfig,

    /// HTTP adapter settings.
    pub server: ServerConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Simulated latencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Milliseconds before a scan resolves.
    pub scan_latency_ms: u64,

    /// Milliseconds before a connection attempt resolves.
    pub connect_latency_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let timing = SessionTiming::default();
        Self {
            scan_latency_ms: duration_ms(timing.scan_latency),
            connect_latency_ms: duration_ms(timing.connect_latency),
        }
    }
}

impl SessionConfig {
    /// Latencies as a [`SessionTiming`].
    #[must_use]
    pub const fn timing(&self) -> SessionTiming {
        SessionTiming {
            scan_latency: Duration::from_millis(self.scan_latency_ms),
            connect_latency: Duration::from_millis(self.connect_latency_ms),
        }
    }
}

/// Where initial history and paired devices come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Start with the built-in demo data.
    pub demo: bool,

    /// JSON seed file; takes precedence over `demo`.
    pub path: Option<PathBuf>,
}

impl SeedConfig {
    /// Load the configured seed data.
    ///
    /// # Errors
    ///
    /// Returns an error if a seed file is configured but cannot be loaded.
    pub fn load(&self) -> Result<SeedData, SeedError> {
        match (&self.path, self.demo) {
            (Some(path), _) => SeedData::load(path),
            (None, true) => Ok(SeedData::demo()),
            (None, false) => Ok(SeedData::empty()),
        }
    }
}

/// HTTP adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind_address: String,

    /// TCP port.
    pub port: u16,

    /// IANA timezone used for human-readable timestamps.
    pub display_timezone: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            display_timezone: "UTC".to_string(),
        }
    }
}

impl ServerConfig {
    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `bind_address` is not an IP address.
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ConfigError::ValidationError {
                field: "server.bind_address".to_string(),
                message: format!("'{}' is not an IP address", self.bind_address),
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when no env filter is set.
    pub level: String,

    /// JSON file logging plus compact stdout instead of pretty stdout.
    pub production: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            production: false,
        }
    }
}

impl Config {
    /// Load configuration from `path` (if it exists) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be parsed or the result fails
    /// validation.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                ::config::Environment::with_prefix("BLUEFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, which must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file is missing, otherwise
    /// as [`Config::load_or_default`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_or_default(path)
    }

    /// Save configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::WriteError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Check every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns a single [`ConfigError::ValidationError`] or
    /// [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("session.scan_latency_ms", self.session.scan_latency_ms),
            ("session.connect_latency_ms", self.session.connect_latency_ms),
        ] {
            if value > MAX_LATENCY_MS {
                errors.push(invalid(field, format!("must be at most {MAX_LATENCY_MS} ms")));
            }
        }

        if self.server.port == 0 {
            errors.push(invalid("server.port", "must be non-zero".to_string()));
        }
        if let Err(err) = self.server.socket_addr() {
            errors.push(err);
        }
        if !is_valid_timezone(&self.server.display_timezone) {
            errors.push(invalid(
                "server.display_timezone",
                format!("'{}' is not an IANA timezone", self.server.display_timezone),
            ));
        }
        if self.logging.level.trim().is_empty() {
            errors.push(invalid("logging.level", "must not be empty".to_string()));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

/// Default configuration file location.
///
/// On Linux: `/etc/blueflow/config.toml`
/// Elsewhere: the platform config directory for `blueflow`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/blueflow/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "blueflow").map_or_else(
            || PathBuf::from("./config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }
}

/// Whether `address` looks like `AA:BB:CC:DD:EE:FF`.
#[must_use]
pub fn is_valid_mac_address(address: &str) -> bool {
    MAC_ADDRESS.is_match(address)
}

/// Whether `name` is a known IANA timezone.
#[must_use]
pub fn is_valid_timezone(name: &str) -> bool {
    name.parse::<chrono_tz::Tz>().is_ok()
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message,
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
