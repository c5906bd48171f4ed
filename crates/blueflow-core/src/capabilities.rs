//! Capabilities the presentation layer injects into the session.
//!
//! - [`Confirmer`] asks the user to approve a destructive action.
//! - [`Notifier`] surfaces fire-and-forget status messages.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

/// A question put to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    /// Dialog title.
    pub title: String,
    /// Dialog body.
    pub message: String,
    /// Label of the approving action, e.g. "Clear".
    pub confirm_label: String,
}

impl ConfirmPrompt {
    /// Prompt shown before wiping connection history.
    #[must_use]
    pub fn clear_history() -> Self {
        Self {
            title: "Clear History".to_string(),
            message: "Are you sure you want to clear all connection history?".to_string(),
            confirm_label: "Clear".to_string(),
        }
    }
}

/// The user's answer to a [`ConfirmPrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Go ahead.
    Confirm,
    /// Cancel; nothing changes.
    Decline,
}

impl From<bool> for Decision {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirm
        } else {
            Self::Decline
        }
    }
}

/// Asks the user to approve an action.
pub trait Confirmer: Send + Sync {
    /// Present `prompt` and return the user's decision.
    fn confirm(&self, prompt: &ConfirmPrompt) -> Decision;
}

/// An answer collected up front, e.g. a `confirm` flag in a request body.
impl Confirmer for Decision {
    fn confirm(&self, _prompt: &ConfirmPrompt) -> Decision {
        *self
    }
}

/// Approves everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirmer for AlwaysConfirm {
    fn confirm(&self, _prompt: &ConfirmPrompt) -> Decision {
        Decision::Confirm
    }
}

/// Declines everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDecline;

impl Confirmer for AlwaysDecline {
    fn confirm(&self, _prompt: &ConfirmPrompt) -> Decision {
        Decision::Decline
    }
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Progress information.
    Info,
    /// Something completed.
    Success,
    /// Something failed.
    Failure,
}

/// A user-facing status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "kind": "success",
    "title": "Success",
    "message": "Successfully connected to AirPods Pro",
    "at": "2025-01-15T03:30:00Z"
}))]
pub struct Notification {
    /// Severity.
    pub kind: NotificationKind,

    /// Short title.
    #[schema(example = "Success")]
    pub title: String,

    /// Message body.
    #[schema(example = "Successfully connected to AirPods Pro")]
    pub message: String,

    /// When it was raised (UTC).
    pub at: DateTime<Utc>,
}

impl Notification {
    /// Raised when a connection attempt starts.
    #[must_use]
    pub fn connecting(device_name: &str) -> Self {
        Self::new(
            NotificationKind::Info,
            "Connection",
            format!("Connecting to {device_name}..."),
        )
    }

    /// Raised when a connection attempt succeeds.
    #[must_use]
    pub fn connected(device_name: &str) -> Self {
        Self::new(
            NotificationKind::Success,
            "Success",
            format!("Successfully connected to {device_name}"),
        )
    }

    /// Raised when a connection attempt fails.
    #[must_use]
    pub fn connect_failed(device_name: &str) -> Self {
        Self::new(
            NotificationKind::Failure,
            "Connection Failed",
            format!("Could not connect to {device_name}"),
        )
    }

    fn new(kind: NotificationKind, title: &str, message: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message,
            at: Utc::now(),
        }
    }
}

/// Delivers notifications to the user.
pub trait Notifier: Send + Sync {
    /// Show `notification`. Must not block.
    fn notify(&self, notification: &Notification);
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, notification: &Notification) {
        (**self).notify(notification);
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.kind {
            NotificationKind::Failure => warn!(
                title = %notification.title,
                "{}", notification.message
            ),
            NotificationKind::Info | NotificationKind::Success => info!(
                title = %notification.title,
                "{}", notification.message
            ),
        }
    }
}

/// Keeps the most recent notifications in memory.
#[derive(Debug)]
pub struct NotificationLog {
    capacity: usize,
    entries: Mutex<VecDeque<Notification>>,
}

impl NotificationLog {
    /// Default number of notifications retained.
    pub const DEFAULT_CAPACITY: usize = 50;

    /// Retain at most `capacity` notifications (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Retained notifications, oldest first.
    pub fn recent(&self) -> Vec<Notification> {
        self.lock().iter().cloned().collect()
    }

    /// Number of retained notifications.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been retained.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: &Notification) {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(notification.clone());
    }
}

/// Forwards every notification to several notifiers.
#[derive(Default, Clone)]
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    /// Start with no targets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target.
    #[must_use]
    pub fn with(mut self, target: Arc<dyn Notifier>) -> Self {
        self.targets.push(target);
        self
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, notification: &Notification) {
        for target in &self.targets {
            target.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_confirmers() {
        let prompt = ConfirmPrompt::clear_history();
        assert_eq!(AlwaysConfirm.confirm(&prompt), Decision::Confirm);
        assert_eq!(AlwaysDecline.confirm(&prompt), Decision::Decline);
        assert_eq!(Decision::from(false), Decision::Decline);
    }

    #[test]
    fn test_notification_text() {
        let n = Notification::connecting("AirPods Pro");
        assert_eq!(n.title, "Connection");
        assert_eq!(n.message, "Connecting to AirPods Pro...");

        let n = Notification::connected("AirPods Pro");
        assert_eq!(n.kind, NotificationKind::Success);
        assert_eq!(n.message, "Successfully connected to AirPods Pro");
    }

    #[test]
    fn test_log_drops_oldest_when_full() {
        let log = NotificationLog::new(2);
        log.notify(&Notification::connecting("a"));
        log.notify(&Notification::connecting("b"));
        log.notify(&Notification::connecting("c"));

        let recent = log.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "Connecting to b...");
        assert_eq!(recent[1].message, "Connecting to c...");
    }

    #[test]
    fn test_fanout_reaches_every_target() {
        let first = Arc::new(NotificationLog::default());
        let second = Arc::new(NotificationLog::default());
        let fanout = FanoutNotifier::new()
            .with(first.clone())
            .with(second.clone())
            .with(Arc::new(TracingNotifier));

        fanout.notify(&Notification::connect_failed("MacBook Pro"));

        assert_eq!(first.len(), 1);
        assert_eq!(second.recent()[0].kind, NotificationKind::Failure);
    }
}
