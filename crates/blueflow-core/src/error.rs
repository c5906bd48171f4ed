//! Unified error types for the blueflow core library.
//!
//! This module provides a unified error type [`BlueflowError`] that covers all
//! failure modes across the crate. Each module also has its own specific error
//! type ([`SessionError`], [`ProviderError`], [`ConfigError`], [`SeedError`])
//! for internal use.
//!
//! # Design Principles
//!
//! - **Specific variants**: Each error variant captures exactly one failure mode
//! - **Actionable messages**: Error messages guide users toward resolution
//! - **Context preservation**: Wrapped errors maintain their original context
//! - **HTTP-ready**: Error types carry the status code and error code the API serves
//!
//! # Example
//!
//! ```rust
//! use blueflow_core::error::{BlueflowError, Result};
//! use std::path::PathBuf;
//!
//! fn load_config(path: &PathBuf) -> Result<()> {
//!     if !path.exists() {
//!         return Err(BlueflowError::ConfigNotFound(path.clone()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::coordinator::SessionError;
use crate::provider::ProviderError;
use crate::seed::SeedError;

/// The unified error type for all blueflow operations.
#[derive(Debug, Error)]
pub enum BlueflowError {
    // =========================================================================
    // SESSION ERRORS
    // =========================================================================
    /// The device is not in the list, or not the one selected.
    #[error("Device '{0}' is not available. Scan again and select it from the list.")]
    InvalidReference(String),

    /// A scan is already running.
    #[error("A scan is already in progress. Wait for it to complete.")]
    ScanInProgress,

    /// A connection attempt is still being resolved.
    #[error("Already connecting to '{0}'. Wait for the attempt to finish.")]
    ConnectInProgress(String),

    /// The user declined a confirmation prompt.
    #[error("Operation cancelled: confirmation was declined")]
    ConfirmationDeclined,

    /// The session task has stopped and no longer accepts commands.
    #[error("Session is not running")]
    SessionClosed,

    // =========================================================================
    // PROVIDER ERRORS
    // =========================================================================
    /// No radio adapter is available.
    #[error("No Bluetooth adapter available. Ensure Bluetooth is present and powered on.")]
    AdapterUnavailable,

    /// Device discovery failed.
    #[error("Device scan failed: {0}")]
    ScanFailed(String),

    /// A connection attempt failed.
    #[error("Could not connect to {address}: {message}")]
    ConnectFailed {
        /// Hardware address of the device.
        address: String,
        /// Reason reported by the transport.
        message: String,
    },

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    /// Seed data was readable but contained invalid records.
    #[error("Invalid seed data: {0}")]
    SeedInvalid(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// An error occurred while persisting or reading data.
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

/// A specialized [`Result`] type for blueflow operations.
pub type Result<T> = std::result::Result<T, BlueflowError>;

/// Shorthand for [`BlueflowError`].
pub type Error = BlueflowError;

impl BlueflowError {
    /// Returns `true` if this error represents an expected operational state.
    ///
    /// A rejected session operation leaves state untouched; the caller just
    /// carries on with the current snapshot.
    #[inline]
    #[must_use]
    pub const fn is_expected_state(&self) -> bool {
        matches!(
            self,
            Self::ScanInProgress | Self::ConnectInProgress(_) | Self::ConfirmationDeclined
        )
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 404 Not Found
            Self::InvalidReference(_) | Self::ConfigNotFound(_) => 404,

            // 409 Conflict - valid request, wrong session state
            Self::ScanInProgress | Self::ConnectInProgress(_) | Self::ConfirmationDeclined => 409,

            // 500 Internal Server Error - startup data or storage is broken
            Self::ConfigParseError(_)
            | Self::ConfigValidationError(_)
            | Self::SeedInvalid(_)
            | Self::PersistenceError(_) => 500,

            // 502 Bad Gateway - the device side failed
            Self::ConnectFailed { .. } => 502,

            // 503 Service Unavailable - radio or session task gone
            Self::AdapterUnavailable | Self::ScanFailed(_) | Self::SessionClosed => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidReference(_) => "INVALID_REFERENCE",
            Self::ScanInProgress => "SCAN_IN_PROGRESS",
            Self::ConnectInProgress(_) => "CONNECT_IN_PROGRESS",
            Self::ConfirmationDeclined => "CONFIRMATION_DECLINED",
            Self::SessionClosed => "SESSION_CLOSED",
            Self::AdapterUnavailable => "ADAPTER_UNAVAILABLE",
            Self::ScanFailed(_) => "SCAN_FAILED",
            Self::ConnectFailed { .. } => "CONNECT_FAILED",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::SeedInvalid(_) => "SEED_INVALID",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<SessionError> for BlueflowError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidReference { device_id } => Self::InvalidReference(device_id),
            SessionError::ScanInProgress => Self::ScanInProgress,
            SessionError::ConnectInProgress { device_name } => Self::ConnectInProgress(device_name),
            SessionError::ConfirmationDeclined => Self::ConfirmationDeclined,
        }
    }
}

impl From<ProviderError> for BlueflowError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::AdapterUnavailable => Self::AdapterUnavailable,
            ProviderError::ScanFailed { message } => Self::ScanFailed(message),
            ProviderError::ConnectFailed { address, message } => {
                Self::ConnectFailed { address, message }
            }
        }
    }
}

impl From<ConfigError> for BlueflowError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path.into()),
            ConfigError::ReadError { path, source } => {
                Self::PersistenceError(format!("Failed to read {path}: {source}"))
            }
            ConfigError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {path}: {source}"))
            }
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            err @ ConfigError::ValidationError { .. } => {
                Self::ConfigValidationError(err.to_string())
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<SeedError> for BlueflowError {
    fn from(err: SeedError) -> Self {
        match err {
            SeedError::ReadError { path, source } => Self::PersistenceError(format!(
                "Failed to read {}: {source}",
                path.display()
            )),
            SeedError::ParseError { path, source } => Self::ConfigParseError(format!(
                "Failed to parse {}: {source}",
                path.display()
            )),
            err @ (SeedError::InvalidAddress { .. } | SeedError::EmptyName { .. }) => {
                Self::SeedInvalid(err.to_string())
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_state() {
        assert!(BlueflowError::ScanInProgress.is_expected_state());
        assert!(BlueflowError::ConfirmationDeclined.is_expected_state());
        assert!(!BlueflowError::InvalidReference("1".into()).is_expected_state());
        assert!(!BlueflowError::AdapterUnavailable.is_expected_state());
        assert!(!BlueflowError::ScanFailed("radio busy".into()).is_expected_state());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            BlueflowError::InvalidReference("9".into()).http_status_code(),
            404
        );
        assert_eq!(BlueflowError::ScanInProgress.http_status_code(), 409);
        assert_eq!(BlueflowError::ConfirmationDeclined.http_status_code(), 409);
        assert_eq!(
            BlueflowError::ConfigParseError("error".into()).http_status_code(),
            500
        );
        assert_eq!(
            BlueflowError::SeedInvalid("bad address".into()).http_status_code(),
            500
        );
        assert_eq!(
            BlueflowError::PersistenceError("error".into()).http_status_code(),
            500
        );
        assert_eq!(BlueflowError::AdapterUnavailable.http_status_code(), 503);
        assert_eq!(BlueflowError::SessionClosed.http_status_code(), 503);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BlueflowError::InvalidReference("9".into()).error_code(),
            "INVALID_REFERENCE"
        );
        assert_eq!(
            BlueflowError::ScanInProgress.error_code(),
            "SCAN_IN_PROGRESS"
        );
        assert_eq!(
            BlueflowError::ConfigNotFound(PathBuf::new()).error_code(),
            "CONFIG_NOT_FOUND"
        );
    }

    #[test]
    fn test_from_session_error() {
        let err: BlueflowError = SessionError::ConnectInProgress {
            device_name: "MacBook Pro".into(),
        }
        .into();
        assert!(matches!(err, BlueflowError::ConnectInProgress(ref name) if name == "MacBook Pro"));
        assert_eq!(err.http_status_code(), 409);
    }

    #[test]
    fn test_from_provider_error() {
        let err: BlueflowError = ProviderError::AdapterUnavailable.into();
        assert!(matches!(err, BlueflowError::AdapterUnavailable));
    }

    #[test]
    fn test_from_config_validation_errors() {
        let err: BlueflowError = ConfigError::MultipleValidationErrors(vec![
            ConfigError::ValidationError {
                field: "server.port".into(),
                message: "must be non-zero".into(),
            },
            ConfigError::ValidationError {
                field: "logging.level".into(),
                message: "must not be empty".into(),
            },
        ])
        .into();

        let message = err.to_string();
        assert!(message.contains("server.port"));
        assert!(message.contains("logging.level"));
    }

    #[test]
    fn test_from_seed_error() {
        let err: BlueflowError = SeedError::InvalidAddress {
            address: "nope".into(),
        }
        .into();
        assert!(matches!(err, BlueflowError::SeedInvalid(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<BlueflowError>();
        assert_sync::<BlueflowError>();
    }
}
