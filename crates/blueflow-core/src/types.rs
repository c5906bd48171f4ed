//! Shared types and OpenAPI schemas.
//!
//! This module contains the records that flow between the session components
//! and out to the presentation layer: devices, history entries, paired devices
//! and the session snapshot itself.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Opaque device identifier, stable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "2")]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Broad category of a peripheral, used for icon selection by presenters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Phone-class device.
    Smartphone,
    /// Audio peripheral.
    Headphones,
    /// Laptop or desktop.
    Computer,
    /// Anything not recognized.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A discoverable wireless peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "2",
    "name": "AirPods Pro",
    "address": "BB:CC:DD:EE:FF:00",
    "signal_strength": -30,
    "device_class": "headphones"
}))]
pub struct Device {
    /// Session-stable identifier.
    pub id: DeviceId,

    /// Display name.
    #[schema(example = "AirPods Pro")]
    pub name: String,

    /// Hardware address, unique per physical device.
    #[schema(example = "BB:CC:DD:EE:FF:00")]
    pub address: String,

    /// Received signal strength in dBm. Lower is weaker.
    #[schema(example = -30)]
    pub signal_strength: i16,

    /// Device category.
    #[serde(default)]
    pub device_class: DeviceClass,
}

impl Device {
    /// Whether this device has the given hardware address.
    #[must_use]
    pub fn has_address(&self, address: &str) -> bool {
        same_address(&self.address, address)
    }
}

/// Compare two hardware addresses, ignoring ASCII case.
#[must_use]
pub fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Progress of the discovery scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// No scan has been started yet.
    #[default]
    Idle,
    /// A catalog fetch is in flight.
    Scanning,
    /// The last scan finished and its results are in `devices`.
    Complete,
}

/// Result of a connection attempt as recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionOutcome {
    /// The device connected.
    Connected,
    /// The device was connected and has since disconnected.
    Disconnected,
    /// The attempt failed.
    Failed,
}

impl ConnectionOutcome {
    /// Lowercase label, as shown in history lists.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        }
    }
}

/// A single connection attempt in the history ledger.
///
/// Entries are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    /// Entry identifier (UUID v7, time ordered).
    pub id: Uuid,

    /// Device name at the time of the attempt.
    #[schema(example = "AirPods Pro")]
    pub device_name: String,

    /// Device hardware address.
    #[schema(example = "BB:CC:DD:EE:FF:00")]
    pub address: String,

    /// When the attempt resolved (UTC).
    pub timestamp: DateTime<Utc>,

    /// How the attempt ended.
    pub outcome: ConnectionOutcome,

    /// Elapsed time of the connection. Always zero for failed attempts.
    #[serde(rename = "duration_ms", with = "duration_ms")]
    #[schema(value_type = u64, example = 8_100_000)]
    pub duration: Duration,
}

impl HistoryEntry {
    /// Record an attempt against `device` that resolved at `timestamp`.
    #[must_use]
    pub fn record(
        device: &Device,
        outcome: ConnectionOutcome,
        timestamp: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let duration = if outcome == ConnectionOutcome::Failed {
            Duration::ZERO
        } else {
            duration
        };

        Self {
            id: Uuid::now_v7(),
            device_name: device.name.clone(),
            address: device.address.clone(),
            timestamp,
            outcome,
            duration,
        }
    }
}

/// A device remembered as paired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PairedDevice {
    /// Identifier of the device when it was paired.
    pub id: DeviceId,

    /// Display name.
    #[schema(example = "MacBook Pro")]
    pub name: String,

    /// Hardware address; unique within the registry.
    #[schema(example = "EE:FF:00:11:22:33")]
    pub address: String,

    /// Device category.
    #[serde(default)]
    pub device_class: DeviceClass,

    /// Last successful connection (UTC).
    pub last_connected: DateTime<Utc>,
}

impl PairedDevice {
    /// Build a registry record from a discovered device.
    #[must_use]
    pub fn from_device(device: &Device, connected_at: DateTime<Utc>) -> Self {
        Self {
            id: device.id.clone(),
            name: device.name.clone(),
            address: device.address.clone(),
            device_class: device.device_class,
            last_connected: connected_at,
        }
    }
}

/// Immutable view of the whole session, produced after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct SessionSnapshot {
    /// Incremented on every applied transition.
    pub version: u64,

    /// Scan progress.
    pub scan_state: ScanState,

    /// Devices from the last completed scan, in catalog order.
    pub devices: Vec<Device>,

    /// Device the user picked, if any.
    pub selected: Option<Device>,

    /// Whether the connect dialog is showing. Implies `selected` is set.
    pub modal_open: bool,

    /// Device whose connection is being resolved.
    pub connecting: Option<Device>,

    /// Connection history in creation order.
    pub history: Vec<HistoryEntry>,

    /// Paired devices in insertion order.
    pub paired: Vec<PairedDevice>,
}

/// Serialize a [`Duration`] as whole milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Write the duration as milliseconds, saturating at `u64::MAX`.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    /// Read a duration from milliseconds.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headphones() -> Device {
        Device {
            id: DeviceId::new("2"),
            name: "AirPods Pro".to_string(),
            address: "BB:CC:DD:EE:FF:00".to_string(),
            signal_strength: -30,
            device_class: DeviceClass::Headphones,
        }
    }

    #[test]
    fn test_failed_entry_has_zero_duration() {
        let entry = HistoryEntry::record(
            &headphones(),
            ConnectionOutcome::Failed,
            Utc::now(),
            Duration::from_secs(90),
        );
        assert_eq!(entry.duration, Duration::ZERO);
        assert_eq!(entry.device_name, "AirPods Pro");
    }

    #[test]
    fn test_connected_entry_keeps_duration() {
        let entry = HistoryEntry::record(
            &headphones(),
            ConnectionOutcome::Connected,
            Utc::now(),
            Duration::from_secs(90),
        );
        assert_eq!(entry.duration, Duration::from_secs(90));
    }

    #[test]
    fn test_address_comparison_ignores_case() {
        assert!(headphones().has_address("bb:cc:dd:ee:ff:00"));
        assert!(!headphones().has_address("BB:CC:DD:EE:FF:01"));
    }

    #[test]
    fn test_unknown_device_class_deserializes() {
        let json = r#"{"id":"9","name":"Tag","address":"01:02:03:04:05:06","signal_strength":-80,"device_class":"watch"}"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.device_class, DeviceClass::Unknown);
    }

    #[test]
    fn test_history_entry_serializes_duration_as_millis() {
        let entry = HistoryEntry::record(
            &headphones(),
            ConnectionOutcome::Connected,
            Utc::now(),
            Duration::from_secs(2700),
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"duration_ms\":2700000"));
        assert!(json.contains("\"outcome\":\"connected\""));
    }

    #[test]
    fn test_sub_second_duration_survives_json() {
        let entry = HistoryEntry::record(
            &headphones(),
            ConnectionOutcome::Connected,
            Utc::now(),
            Duration::from_millis(1500),
        );
        let json = serde_json::to_string(&entry).unwrap();
        let back: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.duration, Duration::from_millis(1500));
        assert_eq!(back, entry);
    }
}
