//! Discovery session state machine.
//!
//! ```text
//! Idle --start_scan--> Scanning --finish_scan--> Complete
//! Complete --start_scan--> Scanning
//! Complete --select_device--> Complete[selected, modal open]
//! [modal open] --cancel_selection--> Complete
//! [modal open] --begin_connect--> Complete[connecting] --finish_connect--> Complete
//! ```
//!
//! The selection is held by id and resolved against the current device list,
//! so a device that disappears on re-scan is no longer selected. The modal is
//! only open while a selection resolves.

use tracing::debug;

use crate::coordinator::SessionError;
use crate::types::{Device, DeviceId, ScanState};

/// Identifies one scan; completions carrying another id are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanId(u64);

impl ScanId {
    /// Raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Scan, selection and connect-dialog state for one screen lifetime.
#[derive(Debug, Clone, Default)]
pub struct DiscoverySession {
    scan_state: ScanState,
    devices: Vec<Device>,
    selected: Option<DeviceId>,
    modal_open: bool,
    connecting: Option<Device>,
    in_flight_scan: Option<ScanId>,
    scans_started: u64,
}

impl DiscoverySession {
    /// A fresh, idle session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a scan, clearing the device list and any selection.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ScanInProgress`] if a scan is already running;
    /// the session is left untouched.
    pub fn start_scan(&mut self) -> Result<ScanId, SessionError> {
        if self.scan_state == ScanState::Scanning {
            return Err(SessionError::ScanInProgress);
        }

        self.scans_started += 1;
        let scan_id = ScanId(self.scans_started);

        self.scan_state = ScanState::Scanning;
        self.devices.clear();
        self.selected = None;
        self.modal_open = false;
        self.in_flight_scan = Some(scan_id);

        debug!(scan_id = scan_id.get(), "Scan started");
        Ok(scan_id)
    }

    /// Apply the result of scan `scan_id`.
    ///
    /// Returns `false` and changes nothing if `scan_id` is not the scan in
    /// flight.
    pub fn finish_scan(&mut self, scan_id: ScanId, devices: Vec<Device>) -> bool {
        if self.in_flight_scan != Some(scan_id) {
            debug!(scan_id = scan_id.get(), "Discarding stale scan result");
            return false;
        }

        self.in_flight_scan = None;
        self.devices = devices;
        self.scan_state = ScanState::Complete;

        debug!(
            scan_id = scan_id.get(),
            count = self.devices.len(),
            "Scan complete"
        );
        true
    }

    /// Select a device from the current list and open the connect dialog.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidReference`] if `device_id` is not in the
    /// current device list.
    pub fn select_device(&mut self, device_id: &DeviceId) -> Result<&Device, SessionError> {
        let index = self
            .position(device_id)
            .ok_or_else(|| SessionError::invalid_reference(device_id))?;

        self.selected = Some(device_id.clone());
        self.modal_open = true;

        debug!(device_id = %device_id, "Device selected");
        Ok(&self.devices[index])
    }

    /// Close the dialog and drop the selection.
    ///
    /// Returns `true` if anything changed.
    pub fn cancel_selection(&mut self) -> bool {
        let changed = self.modal_open || self.selected.is_some();
        self.modal_open = false;
        self.selected = None;
        changed
    }

    /// Confirm the connection to the selected device.
    ///
    /// Closes the dialog at once and marks the device as connecting.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidReference`] if `device_id` is not the
    ///   selected device with its dialog open, or is no longer listed.
    /// - [`SessionError::ConnectInProgress`] if another connection is still
    ///   being resolved.
    pub fn begin_connect(&mut self, device_id: &DeviceId) -> Result<Device, SessionError> {
        let device = self
            .selected_device()
            .filter(|selected| self.modal_open && &selected.id == device_id)
            .cloned()
            .ok_or_else(|| SessionError::invalid_reference(device_id))?;

        if let Some(pending) = &self.connecting {
            return Err(SessionError::ConnectInProgress {
                device_name: pending.name.clone(),
            });
        }

        self.modal_open = false;
        self.selected = None;
        self.connecting = Some(device.clone());

        debug!(device_id = %device_id, address = %device.address, "Connect confirmed");
        Ok(device)
    }

    /// Mark the in-flight connection to `address` as resolved.
    ///
    /// Returns the device that was connecting, if it matches.
    pub fn finish_connect(&mut self, address: &str) -> Option<Device> {
        if self
            .connecting
            .as_ref()
            .is_some_and(|device| device.has_address(address))
        {
            self.connecting.take()
        } else {
            None
        }
    }

    /// Current scan state.
    #[must_use]
    pub const fn scan_state(&self) -> ScanState {
        self.scan_state
    }

    /// Devices from the last completed scan.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// The selected device, if it is still listed.
    #[must_use]
    pub fn selected_device(&self) -> Option<&Device> {
        let id = self.selected.as_ref()?;
        self.devices.iter().find(|device| &device.id == id)
    }

    /// Whether the connect dialog is open.
    #[must_use]
    pub fn modal_open(&self) -> bool {
        self.modal_open && self.selected_device().is_some()
    }

    /// Device whose connection is being resolved.
    #[must_use]
    pub const fn connecting(&self) -> Option<&Device> {
        self.connecting.as_ref()
    }

    fn position(&self, device_id: &DeviceId) -> Option<usize> {
        self.devices.iter().position(|device| &device.id == device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FixtureScanProvider;

    fn completed() -> DiscoverySession {
        let mut session = DiscoverySession::new();
        let scan = session.start_scan().unwrap();
        assert!(session.finish_scan(scan, FixtureScanProvider::devices()));
        session
    }

    fn assert_modal_invariant(session: &DiscoverySession) {
        if session.modal_open() {
            assert!(session.selected_device().is_some());
        }
        if session.scan_state() == ScanState::Scanning {
            assert!(session.devices().is_empty());
        }
    }

    #[test]
    fn test_scan_lifecycle() {
        let mut session = DiscoverySession::new();
        assert_eq!(session.scan_state(), ScanState::Idle);

        let scan = session.start_scan().unwrap();
        assert_eq!(session.scan_state(), ScanState::Scanning);
        assert!(session.devices().is_empty());

        assert!(session.finish_scan(scan, FixtureScanProvider::devices()));
        assert_eq!(session.scan_state(), ScanState::Complete);
        assert_eq!(session.devices().len(), 5);
    }

    #[test]
    fn test_start_scan_while_scanning_is_rejected() {
        let mut session = DiscoverySession::new();
        session.start_scan().unwrap();
        assert_eq!(session.start_scan(), Err(SessionError::ScanInProgress));
        assert_eq!(session.scan_state(), ScanState::Scanning);
    }

    #[test]
    fn test_stale_scan_result_is_discarded() {
        let mut session = DiscoverySession::new();
        let first = session.start_scan().unwrap();
        assert!(session.finish_scan(first, Vec::new()));
        let second = session.start_scan().unwrap();

        assert!(!session.finish_scan(first, FixtureScanProvider::devices()));
        assert_eq!(session.scan_state(), ScanState::Scanning);
        assert!(session.finish_scan(second, FixtureScanProvider::devices()));
    }

    #[test]
    fn test_select_and_cancel() {
        let mut session = completed();
        let id = session.devices()[1].id.clone();

        let selected = session.select_device(&id).unwrap();
        assert_eq!(selected.name, "AirPods Pro");
        assert!(session.modal_open());
        assert_modal_invariant(&session);

        assert!(session.cancel_selection());
        assert!(!session.modal_open());
        assert!(session.selected_device().is_none());
        assert!(!session.cancel_selection());
    }

    #[test]
    fn test_select_unknown_device() {
        let mut session = completed();
        let err = session.select_device(&DeviceId::new("99")).unwrap_err();
        assert!(matches!(err, SessionError::InvalidReference { .. }));
        assert!(!session.modal_open());
    }

    #[test]
    fn test_rescan_drops_selection() {
        let mut session = completed();
        let id = session.devices()[0].id.clone();
        session.select_device(&id).unwrap();

        session.start_scan().unwrap();
        assert!(!session.modal_open());
        assert!(session.selected_device().is_none());
        assert_modal_invariant(&session);

        let err = session.begin_connect(&id).unwrap_err();
        assert!(matches!(err, SessionError::InvalidReference { .. }));
    }

    #[test]
    fn test_begin_connect_requires_selection() {
        let mut session = completed();
        let first = session.devices()[0].id.clone();
        let second = session.devices()[1].id.clone();
        session.select_device(&first).unwrap();

        assert!(session.begin_connect(&second).is_err());
        assert!(session.modal_open());

        let device = session.begin_connect(&first).unwrap();
        assert_eq!(device.id, first);
        assert!(!session.modal_open());
        assert_eq!(session.connecting().map(|d| &d.id), Some(&first));
    }

    #[test]
    fn test_single_connect_in_flight() {
        let mut session = completed();
        let first = session.devices()[0].clone();
        let second = session.devices()[1].id.clone();

        session.select_device(&first.id).unwrap();
        session.begin_connect(&first.id).unwrap();

        session.select_device(&second).unwrap();
        let err = session.begin_connect(&second).unwrap_err();
        assert!(matches!(err, SessionError::ConnectInProgress { .. }));
        assert!(session.modal_open());

        assert!(session.finish_connect("00:00:00:00:00:00").is_none());
        assert_eq!(session.finish_connect(&first.address), Some(first));
        assert!(session.begin_connect(&second).is_ok());
    }
}
