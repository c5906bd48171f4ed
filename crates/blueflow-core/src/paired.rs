//! Paired device registry.
//!
//! Devices are keyed by hardware address; at most one entry exists per
//! address. Insertion order is kept for display.

use chrono::{DateTime, Utc};

use crate::types::{same_address, Device, PairedDevice};

/// Set of devices considered paired.
#[derive(Debug, Clone, Default)]
pub struct PairedRegistry {
    devices: Vec<PairedDevice>,
}

impl PairedRegistry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Record a successful connection to `device`.
    ///
    /// Refreshes `last_connected` if the address is already paired,
    /// otherwise adds a new entry. Returns `true` if an entry was added.
    pub fn upsert(&mut self, device: &Device, connected_at: DateTime<Utc>) -> bool {
        self.insert(PairedDevice::from_device(device, connected_at))
    }

    /// Insert a full record, merging with any entry for the same address.
    ///
    /// On a merge only `last_connected` changes. Returns `true` if an entry
    /// was added.
    pub fn insert(&mut self, paired: PairedDevice) -> bool {
        if let Some(existing) = self.get_mut(&paired.address) {
            existing.last_connected = paired.last_connected;
            false
        } else {
            self.devices.push(paired);
            true
        }
    }

    /// Forget the device with `address`. Returns the removed entry, if any.
    pub fn remove(&mut self, address: &str) -> Option<PairedDevice> {
        let index = self
            .devices
            .iter()
            .position(|d| same_address(&d.address, address))?;
        Some(self.devices.remove(index))
    }

    /// Look up a device by address.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<&PairedDevice> {
        self.devices
            .iter()
            .find(|d| same_address(&d.address, address))
    }

    /// Whether `address` is paired.
    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.get(address).is_some()
    }

    /// Paired devices in insertion order.
    #[must_use]
    pub fn devices(&self) -> &[PairedDevice] {
        &self.devices
    }

    /// Number of paired devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether nothing is paired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn get_mut(&mut self, address: &str) -> Option<&mut PairedDevice> {
        self.devices
            .iter_mut()
            .find(|d| same_address(&d.address, address))
    }
}
