//! Async session runtime.
//!
//! A [`SessionCoordinator`] is owned by a single tokio task. Callers talk to it
//! through a cloneable [`SessionHandle`]: each operation is sent as a command
//! and answered over a oneshot channel, while deferred work completes through
//! a [`TokioScheduler`] feeding the same task. Every state change is published
//! on a watch channel, so presenters can follow the session without polling.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::capabilities::{Confirmer, Notifier};
use crate::config::Config;
use crate::coordinator::{SessionCoordinator, SessionEvent, SessionResult};
use crate::error::{BlueflowError, Result};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::types::{DeviceId, SessionSnapshot};

const COMMAND_BUFFER: usize = 32;

type Reply<T> = oneshot::Sender<T>;

enum Command {
    StartScan(Reply<SessionResult<SessionSnapshot>>),
    SelectDevice(DeviceId, Reply<SessionResult<SessionSnapshot>>),
    CancelSelection(Reply<SessionSnapshot>),
    ConfirmConnect(DeviceId, Reply<SessionResult<SessionSnapshot>>),
    ClearHistory(Box<dyn Confirmer>, Reply<SessionResult<SessionSnapshot>>),
    RemoveFromPaired(String, Reply<SessionSnapshot>),
}

/// Cloneable handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::StartScan(_) => "StartScan",
            Self::SelectDevice(..) => "SelectDevice",
            Self::CancelSelection(_) => "CancelSelection",
            Self::ConfirmConnect(..) => "ConfirmConnect",
            Self::ClearHistory(..) => "ClearHistory",
            Self::RemoveFromPaired(..) => "RemoveFromPaired",
        };
        f.write_str(name)
    }
}

/// Start a session task.
///
/// `build` receives the scheduler the coordinator must use for deferred work.
/// Must be called from within a tokio runtime. The task stops once every
/// [`SessionHandle`] has been dropped.
pub fn spawn_session<F>(build: F) -> (SessionHandle, JoinHandle<()>)
where
    F: FnOnce(Arc<dyn Scheduler<SessionEvent>>) -> SessionCoordinator,
{
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

    let coordinator = build(Arc::new(TokioScheduler::new(event_tx)));
    let (snapshot_tx, snapshot_rx) = watch::channel(coordinator.snapshot());

    let task = tokio::spawn(run(coordinator, command_rx, event_rx, snapshot_tx));

    let handle = SessionHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
    };
    (handle, task)
}

/// Start a session task set up from `config`.
///
/// Seed data and latencies come from the configuration; notifications go to
/// `notifier`.
///
/// # Errors
///
/// Returns an error if the configured seed data cannot be loaded.
pub fn spawn_from_config(
    config: &Config,
    notifier: Arc<dyn Notifier>,
) -> Result<(SessionHandle, JoinHandle<()>)> {
    let seed = config.seed.load()?;
    let timing = config.session.timing();
    info!(
        history = seed.history.len(),
        paired = seed.paired.len(),
        scan_latency_ms = config.session.scan_latency_ms,
        connect_latency_ms = config.session.connect_latency_ms,
        "Starting session"
    );

    Ok(spawn_session(move |scheduler| {
        SessionCoordinator::new(scheduler)
            .with_timing(timing)
            .with_notifier(notifier)
            .with_seed(seed)
    }))
}

async fn run(
    mut coordinator: SessionCoordinator,
    mut commands: mpsc::Receiver<Command>,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    snapshots: watch::Sender<SessionSnapshot>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                debug!(?command, "Session command");
                apply(&mut coordinator, command, &snapshots);
            }
            Some(event) = events.recv() => {
                coordinator.handle_event(event);
                publish(&coordinator, &snapshots);
            }
        }
    }
    debug!("Session task stopped");
}

fn apply(
    coordinator: &mut SessionCoordinator,
    command: Command,
    snapshots: &watch::Sender<SessionSnapshot>,
) {
    match command {
        Command::StartScan(reply) => {
            respond(reply, coordinator.start_scan(), coordinator, snapshots);
        }
        Command::SelectDevice(id, reply) => {
            respond(reply, coordinator.select_device(&id), coordinator, snapshots);
        }
        Command::CancelSelection(reply) => {
            respond(reply, coordinator.cancel_selection(), coordinator, snapshots);
        }
        Command::ConfirmConnect(id, reply) => {
            respond(reply, coordinator.confirm_connect(&id), coordinator, snapshots);
        }
        Command::ClearHistory(confirmer, reply) => {
            let result = coordinator.clear_history(confirmer.as_ref());
            respond(reply, result, coordinator, snapshots);
        }
        Command::RemoveFromPaired(address, reply) => {
            respond(reply, coordinator.remove_from_paired(&address), coordinator, snapshots);
        }
    }
}

/// Publish first so a caller that awaited the reply reads the same state
/// from [`SessionHandle::snapshot`].
fn respond<T>(
    reply: Reply<T>,
    value: T,
    coordinator: &SessionCoordinator,
    snapshots: &watch::Sender<SessionSnapshot>,
) {
    publish(coordinator, snapshots);
    if reply.send(value).is_err() {
        debug!("Caller stopped waiting for session reply");
    }
}

fn publish(coordinator: &SessionCoordinator, snapshots: &watch::Sender<SessionSnapshot>) {
    snapshots.send_if_modified(|current| {
        if current.version == coordinator.version() {
            false
        } else {
            *current = coordinator.snapshot();
            true
        }
    });
}

impl SessionHandle {
    /// The most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Whether the session task is still accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Receive every future snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `predicate` and return it.
    ///
    /// # Errors
    ///
    /// Returns [`BlueflowError::SessionClosed`] if the session stops first.
    pub async fn wait_for<P>(&self, mut predicate: P) -> Result<SessionSnapshot>
    where
        P: FnMut(&SessionSnapshot) -> bool,
    {
        let mut receiver = self.subscribe();
        let snapshot = receiver
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| BlueflowError::SessionClosed)?;
        Ok(snapshot.clone())
    }

    /// Start discovering devices.
    ///
    /// # Errors
    ///
    /// [`BlueflowError::ScanInProgress`] if a scan is already running.
    pub async fn start_scan(&self) -> Result<SessionSnapshot> {
        Ok(self.request(Command::StartScan).await??)
    }

    /// Select a listed device and open the connect dialog.
    ///
    /// # Errors
    ///
    /// [`BlueflowError::InvalidReference`] if the device is not listed.
    pub async fn select_device(&self, device_id: DeviceId) -> Result<SessionSnapshot> {
        Ok(self
            .request(|reply| Command::SelectDevice(device_id, reply))
            .await??)
    }

    /// Close the connect dialog and drop the selection.
    ///
    /// # Errors
    ///
    /// [`BlueflowError::SessionClosed`] if the session has stopped.
    pub async fn cancel_selection(&self) -> Result<SessionSnapshot> {
        self.request(Command::CancelSelection).await
    }

    /// Connect to the selected device.
    ///
    /// # Errors
    ///
    /// [`BlueflowError::InvalidReference`] if `device_id` is not the selected
    /// device, [`BlueflowError::ConnectInProgress`] if another attempt is
    /// pending.
    pub async fn confirm_connect(&self, device_id: DeviceId) -> Result<SessionSnapshot> {
        Ok(self
            .request(|reply| Command::ConfirmConnect(device_id, reply))
            .await??)
    }

    /// Empty the connection history after asking `confirmer`.
    ///
    /// # Errors
    ///
    /// [`BlueflowError::ConfirmationDeclined`] if the user declined.
    pub async fn clear_history<C>(&self, confirmer: C) -> Result<SessionSnapshot>
    where
        C: Confirmer + 'static,
    {
        Ok(self
            .request(|reply| Command::ClearHistory(Box::new(confirmer), reply))
            .await??)
    }

    /// Forget a paired device. Unknown addresses are ignored.
    ///
    /// # Errors
    ///
    /// [`BlueflowError::SessionClosed`] if the session has stopped.
    pub async fn remove_from_paired(&self, address: impl Into<String>) -> Result<SessionSnapshot> {
        let address = address.into();
        self.request(|reply| Command::RemoveFromPaired(address, reply))
            .await
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| BlueflowError::SessionClosed)?;
        response.await.map_err(|_| BlueflowError::SessionClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::capabilities::{Decision, NotificationLog};
    use crate::seed::SeedData;
    use crate::types::{ConnectionOutcome, ScanState};

    fn spawn_default() -> (SessionHandle, Arc<NotificationLog>) {
        let log = Arc::new(NotificationLog::default());
        let notifier = log.clone();
        let (handle, _task) = spawn_session(move |scheduler| {
            SessionCoordinator::new(scheduler)
                .with_notifier(notifier)
                .with_seed(SeedData::demo())
        });
        (handle, log)
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_completes_after_three_seconds() {
        let (handle, _) = spawn_default();

        let snapshot = assert_ok!(handle.start_scan().await);
        assert_eq!(snapshot.scan_state, ScanState::Scanning);

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(handle.snapshot().scan_state, ScanState::Scanning);

        let done = handle
            .wait_for(|s| s.scan_state == ScanState::Complete)
            .await
            .unwrap();
        assert_eq!(done.devices.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_operations_surface_errors() {
        let (handle, _) = spawn_default();

        handle.start_scan().await.unwrap();
        let err = assert_err!(handle.start_scan().await);
        assert!(matches!(err, BlueflowError::ScanInProgress));

        let err = assert_err!(handle.select_device(DeviceId::new("1")).await);
        assert!(matches!(err, BlueflowError::InvalidReference(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_connect_flow() {
        let (handle, log) = spawn_default();

        handle.start_scan().await.unwrap();
        handle
            .wait_for(|s| s.scan_state == ScanState::Complete)
            .await
            .unwrap();

        let id = DeviceId::new("4");
        let snapshot = handle.select_device(id.clone()).await.unwrap();
        assert!(snapshot.modal_open);

        let snapshot = handle.confirm_connect(id).await.unwrap();
        assert!(!snapshot.modal_open);
        assert!(snapshot.connecting.is_some());

        let done = handle
            .wait_for(|s| s.connecting.is_none())
            .await
            .unwrap();
        let last = done.history.last().unwrap();
        assert_eq!(last.device_name, "Sony WH-1000XM4");
        assert_eq!(last.outcome, ConnectionOutcome::Connected);
        assert!(done.paired.iter().any(|p| p.name == "Sony WH-1000XM4"));
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_history_with_decision() {
        let (handle, _) = spawn_default();
        assert_eq!(handle.snapshot().history.len(), 4);

        let err = assert_err!(handle.clear_history(Decision::Decline).await);
        assert!(matches!(err, BlueflowError::ConfirmationDeclined));

        let snapshot = handle.clear_history(Decision::Confirm).await.unwrap();
        assert!(snapshot.history.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let (handle, _) = spawn_default();
        let mut updates = handle.subscribe();

        let address = handle.snapshot().paired[0].address.clone();
        handle.remove_from_paired(address).await.unwrap();

        assert_ok!(updates.changed().await);
        assert_eq!(updates.borrow().paired.len(), 1);
    }

    #[tokio::test]
    async fn test_spawn_from_config_uses_seed_and_timing() {
        let mut config = Config::default();
        config.seed.demo = true;
        config.session.scan_latency_ms = 10;

        let (handle, _task) =
            spawn_from_config(&config, Arc::new(NotificationLog::default())).unwrap();
        assert_eq!(handle.snapshot().paired.len(), 2);

        handle.start_scan().await.unwrap();
        let done = handle
            .wait_for(|s| s.scan_state == ScanState::Complete)
            .await
            .unwrap();
        assert_eq!(done.devices.len(), 5);
    }
}
