//! Session coordinator.
//!
//! The coordinator is the single owner of the discovery session, the history
//! ledger and the paired registry. Every operation either applies a
//! transition and returns a fresh [`SessionSnapshot`], or fails with a
//! [`SessionError`] and leaves all state untouched. Work that takes time
//! (fetching the catalog, resolving a connection) is handed to a
//! [`Scheduler`] and comes back later as a [`SessionEvent`], which the owner
//! feeds into [`SessionCoordinator::handle_event`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::capabilities::{Confirmer, Notification, Notifier, TracingNotifier};
use crate::discovery::{DiscoverySession, ScanId};
use crate::history::HistoryLedger;
use crate::paired::PairedRegistry;
use crate::provider::{
    ConnectTransport, FixtureScanProvider, FixtureTransport, ProviderResult, ScanProvider,
};
use crate::scheduler::Scheduler;
use crate::seed::SeedData;
use crate::types::{ConnectionOutcome, Device, DeviceId, HistoryEntry, SessionSnapshot};

/// Why a session operation was not applied.
///
/// None of these are faults: the session is unchanged and the caller should
/// carry on with the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The device is not where the operation expected it.
    #[error("Device '{device_id}' is not available for this operation")]
    InvalidReference {
        /// The id the caller passed.
        device_id: String,
    },

    /// A scan is already running.
    #[error("A scan is already in progress")]
    ScanInProgress,

    /// A connection is still being resolved.
    #[error("A connection to '{device_name}' is already in progress")]
    ConnectInProgress {
        /// Name of the device being connected.
        device_name: String,
    },

    /// The user declined to clear history.
    #[error("Clearing connection history was cancelled")]
    ConfirmationDeclined,
}

impl SessionError {
    pub(crate) fn invalid_reference(device_id: &DeviceId) -> Self {
        Self::InvalidReference {
            device_id: device_id.to_string(),
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Completion of deferred session work.
#[derive(Debug)]
pub enum SessionEvent {
    /// A catalog fetch finished.
    ScanFinished {
        /// The scan this result belongs to.
        scan_id: ScanId,
        /// Devices found, or why discovery failed.
        result: ProviderResult<Vec<Device>>,
    },

    /// A connection attempt resolved.
    ConnectResolved {
        /// The device that was being connected.
        device: Device,
        /// Transport outcome.
        result: ProviderResult<()>,
        /// When the attempt was confirmed.
        started: Instant,
    },
}

/// Simulated latencies for deferred work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Delay before a scan resolves.
    pub scan_latency: Duration,
    /// Delay before a connection attempt resolves.
    pub connect_latency: Duration,
}

impl SessionTiming {
    /// Default scan latency.
    pub const DEFAULT_SCAN_LATENCY: Duration = Duration::from_millis(3000);
    /// Default connect latency.
    pub const DEFAULT_CONNECT_LATENCY: Duration = Duration::from_millis(1500);
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            scan_latency: Self::DEFAULT_SCAN_LATENCY,
            connect_latency: Self::DEFAULT_CONNECT_LATENCY,
        }
    }
}

/// Owner of all session state.
pub struct SessionCoordinator {
    discovery: DiscoverySession,
    history: HistoryLedger,
    paired: PairedRegistry,
    version: u64,
    timing: SessionTiming,
    provider: Arc<dyn ScanProvider>,
    transport: Arc<dyn ConnectTransport>,
    scheduler: Arc<dyn Scheduler<SessionEvent>>,
    notifier: Arc<dyn Notifier>,
}

impl SessionCoordinator {
    /// Create a coordinator using the fixture provider and transport.
    #[must_use]
    pub fn new(scheduler: Arc<dyn Scheduler<SessionEvent>>) -> Self {
        Self {
            discovery: DiscoverySession::new(),
            history: HistoryLedger::new(),
            paired: PairedRegistry::new(),
            version: 0,
            timing: SessionTiming::default(),
            provider: Arc::new(FixtureScanProvider),
            transport: Arc::new(FixtureTransport),
            scheduler,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Use `provider` for device discovery.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn ScanProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Use `transport` for connection attempts.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn ConnectTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Deliver notifications to `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Use `timing` for simulated latencies.
    #[must_use]
    pub fn with_timing(mut self, timing: SessionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Pre-fill history and paired devices.
    #[must_use]
    pub fn with_seed(mut self, seed: SeedData) -> Self {
        let (history, paired) = seed.into_parts();
        self.history = HistoryLedger::with_entries(history);
        for device in paired {
            self.paired.insert(device);
        }
        self
    }

    /// Start discovering devices.
    ///
    /// # Errors
    ///
    /// [`SessionError::ScanInProgress`] if a scan is already running.
    pub fn start_scan(&mut self) -> SessionResult<SessionSnapshot> {
        let scan_id = self.discovery.start_scan()?;

        let fetch = self.provider.fetch_devices();
        self.scheduler.schedule(
            self.timing.scan_latency,
            Box::pin(async move {
                SessionEvent::ScanFinished {
                    scan_id,
                    result: fetch.await,
                }
            }),
        );

        info!(scan_id = scan_id.get(), "Scanning for devices");
        Ok(self.bump())
    }

    /// Select a listed device and open the connect dialog.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidReference`] if the device is not listed.
    pub fn select_device(&mut self, device_id: &DeviceId) -> SessionResult<SessionSnapshot> {
        self.discovery.select_device(device_id)?;
        Ok(self.bump())
    }

    /// Close the connect dialog and drop the selection.
    pub fn cancel_selection(&mut self) -> SessionSnapshot {
        if self.discovery.cancel_selection() {
            self.bump()
        } else {
            self.snapshot()
        }
    }

    /// Connect to the selected device.
    ///
    /// The dialog closes immediately; the outcome arrives later as a
    /// [`SessionEvent::ConnectResolved`].
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidReference`] if `device_id` is not the
    ///   selected device.
    /// - [`SessionError::ConnectInProgress`] if another attempt is pending.
    pub fn confirm_connect(&mut self, device_id: &DeviceId) -> SessionResult<SessionSnapshot> {
        let device = self.discovery.begin_connect(device_id)?;
        self.notifier.notify(&Notification::connecting(&device.name));

        let started = Instant::now();
        let attempt = self.transport.connect(&device);
        info!(device_id = %device.id, address = %device.address, "Connecting");

        self.scheduler.schedule(
            self.timing.connect_latency,
            Box::pin(async move {
                SessionEvent::ConnectResolved {
                    result: attempt.await,
                    device,
                    started,
                }
            }),
        );

        Ok(self.bump())
    }

    /// Empty the connection history after asking `confirmer`.
    ///
    /// # Errors
    ///
    /// [`SessionError::ConfirmationDeclined`] if the user declined.
    pub fn clear_history(&mut self, confirmer: &dyn Confirmer) -> SessionResult<SessionSnapshot> {
        let removed = self
            .history
            .clear(confirmer)
            .ok_or(SessionError::ConfirmationDeclined)?;

        info!(removed, "Connection history cleared");
        Ok(self.bump())
    }

    /// Forget a paired device. Unknown addresses are ignored.
    pub fn remove_from_paired(&mut self, address: &str) -> SessionSnapshot {
        if let Some(removed) = self.paired.remove(address) {
            info!(address = %removed.address, name = %removed.name, "Device unpaired");
            self.bump()
        } else {
            debug!(address, "Unpair ignored, address not paired");
            self.snapshot()
        }
    }

    /// Apply the completion of deferred work.
    pub fn handle_event(&mut self, event: SessionEvent) -> SessionSnapshot {
        match event {
            SessionEvent::ScanFinished { scan_id, result } => {
                let devices = result.unwrap_or_else(|err| {
                    warn!(scan_id = scan_id.get(), error = %err, "Scan failed, no devices found");
                    Vec::new()
                });
                if self.discovery.finish_scan(scan_id, devices) {
                    info!(
                        scan_id = scan_id.get(),
                        count = self.discovery.devices().len(),
                        "Scan complete"
                    );
                    self.bump()
                } else {
                    self.snapshot()
                }
            }
            SessionEvent::ConnectResolved {
                device,
                result,
                started,
            } => {
                self.resolve_connect(&device, result, started);
                self.bump()
            }
        }
    }

    /// Current state, without changing anything.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: self.version,
            scan_state: self.discovery.scan_state(),
            devices: self.discovery.devices().to_vec(),
            selected: self.discovery.selected_device().cloned(),
            modal_open: self.discovery.modal_open(),
            connecting: self.discovery.connecting().cloned(),
            history: self.history.entries().to_vec(),
            paired: self.paired.devices().to_vec(),
        }
    }

    /// Number of applied state changes so far.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// The history ledger.
    #[must_use]
    pub const fn history(&self) -> &HistoryLedger {
        &self.history
    }

    /// The paired registry.
    #[must_use]
    pub const fn paired(&self) -> &PairedRegistry {
        &self.paired
    }

    /// The discovery session.
    #[must_use]
    pub const fn discovery(&self) -> &DiscoverySession {
        &self.discovery
    }

    fn resolve_connect(&mut self, device: &Device, result: ProviderResult<()>, started: Instant) {
        if self.discovery.finish_connect(&device.address).is_none() {
            debug!(address = %device.address, "Connect resolved for a device no longer pending");
        }

        let now = Utc::now();
        let outcome = match result {
            Ok(()) => ConnectionOutcome::Connected,
            Err(err) => {
                warn!(address = %device.address, error = %err, "Connection failed");
                ConnectionOutcome::Failed
            }
        };

        self.history
            .append(HistoryEntry::record(device, outcome, now, started.elapsed()));

        if outcome == ConnectionOutcome::Connected {
            self.paired.upsert(device, now);
            self.notifier.notify(&Notification::connected(&device.name));
        } else {
            self.notifier
                .notify(&Notification::connect_failed(&device.name));
        }

        info!(
            address = %device.address,
            outcome = outcome.as_str(),
            "Connection resolved"
        );
    }

    fn bump(&mut self) -> SessionSnapshot {
        self.version += 1;
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{AlwaysConfirm, AlwaysDecline, NotificationKind, NotificationLog};
    use crate::provider::{ProviderError, RejectingTransport, StaticScanProvider};
    use crate::scheduler::ManualScheduler;
    use crate::types::ScanState;

    struct Harness {
        scheduler: Arc<ManualScheduler<SessionEvent>>,
        notifications: Arc<NotificationLog>,
        coordinator: SessionCoordinator,
    }

    impl Harness {
        fn new() -> Self {
            Self::build(|c| c)
        }

        fn build(configure: impl FnOnce(SessionCoordinator) -> SessionCoordinator) -> Self {
            let scheduler = Arc::new(ManualScheduler::new());
            let notifications = Arc::new(NotificationLog::default());
            let coordinator = configure(
                SessionCoordinator::new(scheduler.clone()).with_notifier(notifications.clone()),
            );
            Self {
                scheduler,
                notifications,
                coordinator,
            }
        }

        fn advance(&mut self, millis: u64) -> SessionSnapshot {
            for event in self.scheduler.advance(Duration::from_millis(millis)) {
                self.coordinator.handle_event(event);
            }
            self.coordinator.snapshot()
        }

        fn scanned(mut self) -> Self {
            self.coordinator.start_scan().unwrap();
            self.advance(3000);
            self
        }

        fn connect(&mut self, index: usize) -> Device {
            let device = self.coordinator.snapshot().devices[index].clone();
            self.coordinator.select_device(&device.id).unwrap();
            self.coordinator.confirm_connect(&device.id).unwrap();
            self.advance(1500);
            device
        }
    }

    fn assert_modal_invariant(snapshot: &SessionSnapshot) {
        assert!(!snapshot.modal_open || snapshot.selected.is_some());
        assert!(snapshot.scan_state != ScanState::Scanning || snapshot.devices.is_empty());
    }

    #[test]
    fn test_scan_resolves_after_latency() {
        let mut h = Harness::new();
        let snapshot = h.coordinator.start_scan().unwrap();
        assert_eq!(snapshot.scan_state, ScanState::Scanning);
        assert!(snapshot.devices.is_empty());

        let snapshot = h.advance(2999);
        assert_eq!(snapshot.scan_state, ScanState::Scanning);

        let snapshot = h.advance(1);
        assert_eq!(snapshot.scan_state, ScanState::Complete);
        assert_eq!(snapshot.devices.len(), 5);
    }

    #[test]
    fn test_start_scan_while_scanning_is_noop() {
        let mut h = Harness::new();
        let before = h.coordinator.start_scan().unwrap();

        let err = h.coordinator.start_scan().unwrap_err();
        assert_eq!(err, SessionError::ScanInProgress);
        assert_eq!(h.coordinator.snapshot(), before);
        assert_eq!(h.scheduler.pending(), 1);
    }

    #[test]
    fn test_select_then_cancel() {
        let mut h = Harness::new().scanned();
        let target = h.coordinator.snapshot().devices[1].clone();

        let snapshot = h.coordinator.select_device(&target.id).unwrap();
        assert!(snapshot.modal_open);
        assert_eq!(snapshot.selected.as_ref().map(|d| &d.id), Some(&target.id));

        let snapshot = h.coordinator.cancel_selection();
        assert!(!snapshot.modal_open);
        assert!(snapshot.selected.is_none());
    }

    #[test]
    fn test_connect_records_history_and_pairs() {
        let mut h = Harness::new().scanned();
        let target = h.coordinator.snapshot().devices[2].clone();
        h.coordinator.select_device(&target.id).unwrap();

        let snapshot = h.coordinator.confirm_connect(&target.id).unwrap();
        assert!(!snapshot.modal_open);
        assert_eq!(snapshot.connecting.as_ref(), Some(&target));
        assert!(snapshot.history.is_empty());

        let snapshot = h.advance(1500);
        assert!(snapshot.connecting.is_none());
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].outcome, ConnectionOutcome::Connected);
        assert!(snapshot.paired.iter().any(|p| p.address == target.address));

        let messages: Vec<_> = h.notifications.recent().into_iter().map(|n| n.message).collect();
        assert_eq!(
            messages,
            [
                "Connecting to Samsung Galaxy S21...",
                "Successfully connected to Samsung Galaxy S21"
            ]
        );
    }

    #[test]
    fn test_history_grows_once_per_resolution() {
        let mut h = Harness::new().scanned();
        for i in 0..4 {
            h.connect(i % 2);
        }
        assert_eq!(h.coordinator.history().len(), 4);
        assert_eq!(h.coordinator.paired().len(), 2);
    }

    #[test]
    fn test_failed_connect_records_failure_only() {
        let mut h = Harness::build(|c| {
            c.with_transport(Arc::new(RejectingTransport::new("device out of range")))
        })
        .scanned();

        h.connect(0);
        let snapshot = h.coordinator.snapshot();
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].outcome, ConnectionOutcome::Failed);
        assert_eq!(snapshot.history[0].duration, Duration::ZERO);
        assert!(snapshot.paired.is_empty());

        let last = h.notifications.recent().pop().unwrap();
        assert_eq!(last.kind, NotificationKind::Failure);
    }

    #[test]
    fn test_failed_scan_completes_empty() {
        let mut h = Harness::build(|c| {
            c.with_provider(Arc::new(StaticScanProvider::failing(
                ProviderError::AdapterUnavailable,
            )))
        });
        h.coordinator.start_scan().unwrap();
        let snapshot = h.advance(3000);
        assert_eq!(snapshot.scan_state, ScanState::Complete);
        assert!(snapshot.devices.is_empty());
    }

    #[test]
    fn test_custom_catalog_with_custom_timing() {
        let catalog = vec![Device {
            id: DeviceId::new("tag-1"),
            name: "Key Finder".to_string(),
            address: "01:02:03:04:05:06".to_string(),
            signal_strength: -62,
            device_class: crate::types::DeviceClass::Unknown,
        }];
        let mut h = Harness::build(|c| {
            c.with_provider(Arc::new(StaticScanProvider::new(catalog)))
                .with_timing(SessionTiming {
                    scan_latency: Duration::from_millis(500),
                    connect_latency: Duration::from_millis(200),
                })
        });

        h.coordinator.start_scan().unwrap();
        assert_eq!(h.advance(499).scan_state, ScanState::Scanning);
        let snapshot = h.advance(1);
        assert_eq!(snapshot.devices.len(), 1);

        let id = DeviceId::new("tag-1");
        assert!(h.coordinator.select_device(&id).unwrap().modal_open);
        h.coordinator.confirm_connect(&id).unwrap();
        let snapshot = h.advance(200);

        assert_eq!(h.scheduler.elapsed(), Duration::from_millis(700));
        assert!(snapshot.connecting.is_none());
        assert_eq!(snapshot.history[0].device_name, "Key Finder");
        assert!(h.coordinator.paired().contains("01:02:03:04:05:06"));
    }

    #[test]
    fn test_clear_history_needs_confirmation() {
        let mut h = Harness::new().scanned();
        h.connect(0);
        h.connect(1);

        let version = h.coordinator.snapshot().version;
        let err = h.coordinator.clear_history(&AlwaysDecline).unwrap_err();
        assert_eq!(err, SessionError::ConfirmationDeclined);
        assert_eq!(h.coordinator.snapshot().history.len(), 2);
        assert_eq!(h.coordinator.snapshot().version, version);

        let snapshot = h.coordinator.clear_history(&AlwaysConfirm).unwrap();
        assert!(snapshot.history.is_empty());
        assert_eq!(snapshot.paired.len(), 2);
    }

    #[test]
    fn test_remove_unknown_paired_is_noop() {
        let mut h = Harness::new().scanned();
        h.connect(0);
        let before = h.coordinator.snapshot();

        let after = h.coordinator.remove_from_paired("00:11:22:33:44:55");
        assert_eq!(after, before);

        let after = h.coordinator.remove_from_paired(&before.paired[0].address);
        assert!(after.paired.is_empty());
        assert_eq!(after.version, before.version + 1);
    }

    #[test]
    fn test_confirm_after_rescan_is_invalid_reference() {
        let mut h = Harness::new().scanned();
        let target = h.coordinator.snapshot().devices[0].clone();
        h.coordinator.select_device(&target.id).unwrap();
        h.coordinator.start_scan().unwrap();

        let err = h.coordinator.confirm_connect(&target.id).unwrap_err();
        assert!(matches!(err, SessionError::InvalidReference { .. }));
        assert!(h.notifications.is_empty());
    }

    #[test]
    fn test_seeded_paired_device_is_refreshed_not_duplicated() {
        let mut h = Harness::build(|c| c.with_seed(SeedData::demo())).scanned();
        let seeded = h.coordinator.paired().len();
        assert_eq!(h.coordinator.history().len(), 4);

        // AirPods Pro is both in the catalog and in the demo paired list.
        let airpods = h.connect(1);
        assert_eq!(h.coordinator.paired().len(), seeded);
        assert!(h.coordinator.paired().contains(&airpods.address));
        assert_eq!(h.coordinator.history().len(), 5);
    }

    #[test]
    fn test_seed_history_newest_first_regardless_of_file_order() {
        let mut seed = SeedData::demo();
        seed.history.reverse();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        serde_json::to_writer(&mut file, &seed).unwrap();
        let loaded = SeedData::load(file.path()).unwrap();

        let h = Harness::build(|c| c.with_seed(loaded));
        let names: Vec<_> = h
            .coordinator
            .history()
            .newest_first()
            .map(|e| e.device_name.as_str())
            .collect();
        assert_eq!(
            names,
            ["AirPods Pro", "Sony WH-1000XM4", "iPhone 12 Pro", "MacBook Pro"]
        );
    }

    #[test]
    fn test_invariants_hold_across_a_session() {
        let mut h = Harness::new();
        let mut seen = vec![h.coordinator.snapshot()];

        seen.push(h.coordinator.start_scan().unwrap());
        seen.push(h.advance(3000));
        let id = seen.last().unwrap().devices[3].id.clone();
        seen.push(h.coordinator.select_device(&id).unwrap());
        seen.push(h.coordinator.start_scan().unwrap());
        seen.push(h.advance(3000));
        seen.push(h.coordinator.select_device(&id).unwrap());
        seen.push(h.coordinator.confirm_connect(&id).unwrap());
        seen.push(h.advance(1500));

        for snapshot in &seen {
            assert_modal_invariant(snapshot);
        }
        let versions: Vec<_> = seen.iter().map(|s| s.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }
}
