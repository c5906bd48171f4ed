//! # blueflow-core
//!
//! Core session model for blueflow, a wireless device discovery and
//! connection manager.
//!
//! This crate provides:
//! - Device discovery with a scan state machine and device selection
//! - Simulated connection attempts resolved through an async scheduler
//! - An append-only connection history and a registry of paired devices
//! - Configuration management (latencies, seed data, server, logging)
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`signal`] - RSSI classification into quality tiers
//! - [`provider`] - Device catalog and connection transport seams
//! - [`discovery`] - Scan, selection and connect-dialog state machine
//! - [`history`] - Connection history ledger
//! - [`paired`] - Paired device registry
//! - [`coordinator`] - Single owner of session state and its transitions
//! - [`scheduler`] - Deferred task execution (tokio timer or virtual clock)
//! - [`runtime`] - Async task and cloneable handle around the coordinator
//! - [`capabilities`] - Confirmation and notification hooks
//! - [`config`] - Application configuration loading, saving, and validation
//! - [`seed`] - Initial history and paired devices
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod capabilities;
pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod error;
pub mod history;
pub mod paired;
pub mod provider;
pub mod runtime;
pub mod scheduler;
pub mod seed;
pub mod signal;
pub mod types;

// Re-export primary types for convenience
pub use capabilities::{
    AlwaysConfirm, AlwaysDecline, ConfirmPrompt, Confirmer, Decision, FanoutNotifier,
    Notification, NotificationKind, NotificationLog, Notifier, TracingNotifier,
};
pub use config::{
    default_config_path, is_valid_mac_address, is_valid_timezone, Config, ConfigError,
    ConfigResult, LoggingConfig, SeedConfig, ServerConfig, SessionConfig,
};
pub use coordinator::{SessionCoordinator, SessionError, SessionEvent, SessionResult, SessionTiming};
pub use discovery::{DiscoverySession, ScanId};
pub use error::{BlueflowError, Error, Result};
pub use history::HistoryLedger;
pub use paired::PairedRegistry;
pub use provider::{
    ConnectTransport, FixtureScanProvider, FixtureTransport, ProviderError, ProviderResult,
    RejectingTransport, ScanProvider, StaticScanProvider,
};
pub use runtime::{spawn_from_config, spawn_session, SessionHandle};
pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};
pub use seed::{SeedData, SeedError};
pub use signal::{classify, ColorKey, SignalClass, SignalTier};
pub use types::{
    ConnectionOutcome, Device, DeviceClass, DeviceId, HistoryEntry, PairedDevice, ScanState,
    SessionSnapshot,
};
