//! Device discovery and connection providers.
//!
//! The session never talks to a radio directly. It asks a [`ScanProvider`] for
//! the device catalog and a [`ConnectTransport`] to establish a connection.
//! The fixtures in this module return canned results immediately; the
//! simulated latency is applied by the scheduler that runs them.

use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::types::{Device, DeviceClass, DeviceId};

/// Errors reported by discovery and connection providers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// No usable adapter is available.
    #[error("Wireless adapter is unavailable")]
    AdapterUnavailable,

    /// Device discovery failed.
    #[error("Device scan failed: {message}")]
    ScanFailed {
        /// Provider-supplied reason.
        message: String,
    },

    /// A connection attempt failed.
    #[error("Connection to {address} failed: {message}")]
    ConnectFailed {
        /// Address of the target device.
        address: String,
        /// Provider-supplied reason.
        message: String,
    },
}

/// Result type for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Source of the device catalog.
pub trait ScanProvider: Send + Sync {
    /// Discover nearby devices.
    ///
    /// Implementations may take arbitrarily long; callers must not assume
    /// the future resolves immediately.
    fn fetch_devices(&self) -> BoxFuture<'static, ProviderResult<Vec<Device>>>;
}

/// Establishes connections to discovered devices.
pub trait ConnectTransport: Send + Sync {
    /// Connect to `device`.
    fn connect(&self, device: &Device) -> BoxFuture<'static, ProviderResult<()>>;
}

/// Scan provider that always returns the same five devices.
#[derive(Debug, Clone, Default)]
pub struct FixtureScanProvider;

impl FixtureScanProvider {
    /// The canned catalog, in return order.
    #[must_use]
    pub fn devices() -> Vec<Device> {
        vec![
            fixture("1", "iPhone 12 Pro", "AA:BB:CC:DD:EE:FF", -45, DeviceClass::Smartphone),
            fixture("2", "AirPods Pro", "BB:CC:DD:EE:FF:00", -30, DeviceClass::Headphones),
            fixture("3", "Samsung Galaxy S21", "CC:DD:EE:FF:00:11", -60, DeviceClass::Smartphone),
            fixture("4", "Sony WH-1000XM4", "DD:EE:FF:00:11:22", -55, DeviceClass::Headphones),
            fixture("5", "MacBook Pro", "EE:FF:00:11:22:33", -70, DeviceClass::Computer),
        ]
    }
}

impl ScanProvider for FixtureScanProvider {
    fn fetch_devices(&self) -> BoxFuture<'static, ProviderResult<Vec<Device>>> {
        Box::pin(async { Ok(Self::devices()) })
    }
}

/// Transport whose connection attempts always succeed.
#[derive(Debug, Clone, Default)]
pub struct FixtureTransport;

impl ConnectTransport for FixtureTransport {
    fn connect(&self, _device: &Device) -> BoxFuture<'static, ProviderResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Scan provider that returns a fixed result, success or failure.
///
/// Useful for driving a session through specific catalogs.
#[derive(Debug, Clone)]
pub struct StaticScanProvider {
    result: ProviderResult<Vec<Device>>,
}

impl StaticScanProvider {
    /// Always return `devices`.
    #[must_use]
    pub const fn new(devices: Vec<Device>) -> Self {
        Self { result: Ok(devices) }
    }

    /// Always fail with `error`.
    #[must_use]
    pub const fn failing(error: ProviderError) -> Self {
        Self { result: Err(error) }
    }
}

impl ScanProvider for StaticScanProvider {
    fn fetch_devices(&self) -> BoxFuture<'static, ProviderResult<Vec<Device>>> {
        let result = self.result.clone();
        Box::pin(async move { result })
    }
}

/// Transport that rejects every connection attempt.
#[derive(Debug, Clone)]
pub struct RejectingTransport {
    reason: Arc<str>,
}

impl RejectingTransport {
    /// Reject with the given reason.
    pub fn new(reason: impl Into<Arc<str>>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ConnectTransport for RejectingTransport {
    fn connect(&self, device: &Device) -> BoxFuture<'static, ProviderResult<()>> {
        let error = ProviderError::ConnectFailed {
            address: device.address.clone(),
            message: self.reason.to_string(),
        };
        Box::pin(async move { Err(error) })
    }
}

fn fixture(
    id: &str,
    name: &str,
    address: &str,
    signal_strength: i16,
    device_class: DeviceClass,
) -> Device {
    Device {
        id: DeviceId::new(id),
        name: name.to_string(),
        address: address.to_string(),
        signal_strength,
        device_class,
    }
}
