//! Initial state for history and paired devices.
//!
//! Seed data is read from a JSON file or taken from the built-in demo set.
//! It is loaded once at startup; the session never writes it back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::is_valid_mac_address;
use crate::types::{ConnectionOutcome, DeviceClass, DeviceId, HistoryEntry, PairedDevice};

/// Errors raised while loading seed data.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The seed file could not be read.
    #[error("Failed to read seed file {}: {source}", path.display())]
    ReadError {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The seed file is not valid JSON for [`SeedData`].
    #[error("Failed to parse seed file {}: {source}", path.display())]
    ParseError {
        /// File that failed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A record carries a malformed hardware address.
    #[error("Invalid hardware address in seed data: '{address}'")]
    InvalidAddress {
        /// The offending address.
        address: String,
    },

    /// A record has an empty name.
    #[error("Seed record for {address} has an empty name")]
    EmptyName {
        /// Address of the offending record.
        address: String,
    },
}

/// History and paired devices to start a session with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedData {
    /// Past connection attempts, in any order.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    /// Devices already paired.
    #[serde(default)]
    pub paired: Vec<PairedDevice>,
}

impl SeedData {
    /// No history and nothing paired.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The demo data set: four past connections and two paired devices.
    #[must_use]
    pub fn demo() -> Self {
        let history = vec![
            demo_entry("MacBook Pro", "EE:FF:00:11:22:33", (12, 11, 20), ConnectionOutcome::Connected, 12_120),
            demo_entry("iPhone 12 Pro", "AA:BB:CC:DD:EE:FF", (13, 16, 45), ConnectionOutcome::Failed, 0),
            demo_entry("Sony WH-1000XM4", "DD:EE:FF:00:11:22", (14, 9, 15), ConnectionOutcome::Disconnected, 2_700),
            demo_entry("AirPods Pro", "BB:CC:DD:EE:FF:00", (15, 14, 30), ConnectionOutcome::Connected, 8_100),
        ];

        let paired = vec![
            PairedDevice {
                id: DeviceId::new("2"),
                name: "AirPods Pro".to_string(),
                address: "BB:CC:DD:EE:FF:00".to_string(),
                device_class: DeviceClass::Headphones,
                last_connected: january_2024(15, 14, 30),
            },
            PairedDevice {
                id: DeviceId::new("5"),
                name: "MacBook Pro".to_string(),
                address: "EE:FF:00:11:22:33".to_string(),
                device_class: DeviceClass::Computer,
                last_connected: january_2024(12, 11, 20),
            },
        ];

        Self { history, paired }
    }

    /// Load and validate seed data from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if any
    /// record fails validation.
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let content = std::fs::read_to_string(path).map_err(|source| SeedError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let seed: Self = serde_json::from_str(&content).map_err(|source| SeedError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        seed.validate()?;
        Ok(seed)
    }

    /// Check every record's address and name.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), SeedError> {
        let records = self
            .history
            .iter()
            .map(|e| (e.address.as_str(), e.device_name.as_str()))
            .chain(self.paired.iter().map(|p| (p.address.as_str(), p.name.as_str())));

        for (address, name) in records {
            if !is_valid_mac_address(address) {
                return Err(SeedError::InvalidAddress {
                    address: address.to_string(),
                });
            }
            if name.trim().is_empty() {
                return Err(SeedError::EmptyName {
                    address: address.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Split into history entries and paired devices.
    #[must_use]
    pub fn into_parts(self) -> (Vec<HistoryEntry>, Vec<PairedDevice>) {
        (self.history, self.paired)
    }
}

fn january_2024(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

fn demo_entry(
    device_name: &str,
    address: &str,
    (day, hour, minute): (u32, u32, u32),
    outcome: ConnectionOutcome,
    duration_secs: u64,
) -> HistoryEntry {
    HistoryEntry {
        id: Uuid::now_v7(),
        device_name: device_name.to_string(),
        address: address.to_string(),
        timestamp: january_2024(day, hour, minute),
        outcome,
        duration: Duration::from_secs(duration_secs),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_demo_seed_is_valid_and_ordered() {
        let seed = SeedData::demo();
        assert!(seed.validate().is_ok());
        assert_eq!(seed.history.len(), 4);
        assert_eq!(seed.paired.len(), 2);
        assert!(seed
            .history
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(seed.history[1].outcome, ConnectionOutcome::Failed);
        assert_eq!(seed.history[1].duration, Duration::ZERO);
    }

    #[test]
    fn test_load_round_trips_through_file() {
        let mut file = NamedTempFile::new().unwrap();
        let json = serde_json::to_string_pretty(&SeedData::demo()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = SeedData::load(file.path()).unwrap();
        assert_eq!(loaded.paired, SeedData::demo().paired);
        assert_eq!(loaded.history.len(), 4);
    }

    #[test]
    fn test_load_accepts_partial_documents() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"paired": []}"#).unwrap();

        let loaded = SeedData::load(file.path()).unwrap();
        assert_eq!(loaded, SeedData::empty());
    }

    #[test]
    fn test_load_rejects_bad_address() {
        let mut seed = SeedData::demo();
        seed.paired[0].address = "not-a-mac".to_string();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&seed).unwrap().as_bytes())
            .unwrap();

        let err = SeedData::load(file.path()).unwrap_err();
        assert!(matches!(err, SeedError::InvalidAddress { address } if address == "not-a-mac"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SeedData::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, SeedError::ReadError { .. }));
    }

    #[test]
    fn test_load_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = SeedData::load(file.path()).unwrap_err();
        assert!(matches!(err, SeedError::ParseError { .. }));
    }
}
