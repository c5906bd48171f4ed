//! Application state shared across handlers.

use std::sync::Arc;

use blueflow_core::{
    spawn_from_config, Config, FanoutNotifier, NotificationLog, SessionHandle, TracingNotifier,
};
use chrono_tz::Tz;

/// State handed to every handler.
pub type SharedState = AppState;

/// Shared application state.
///
/// Session state lives in the session task; handlers only hold a handle to
/// it, so no lock is needed here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    session: SessionHandle,
    notifications: Arc<NotificationLog>,
    display_timezone: Tz,
}

impl AppState {
    /// Start a session from `config` and wrap it for the router.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured seed data cannot be loaded.
    pub fn new(config: Config) -> blueflow_core::Result<Self> {
        let notifications = Arc::new(NotificationLog::default());
        let notifier = FanoutNotifier::new()
            .with(Arc::new(TracingNotifier))
            .with(notifications.clone());

        let (session, _task) = spawn_from_config(&config, Arc::new(notifier))?;
        let display_timezone = config.server.display_timezone.parse().unwrap_or(Tz::UTC);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                session,
                notifications,
                display_timezone,
            }),
        })
    }

    /// The running session.
    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.inner.session
    }

    /// Recent notifications.
    #[must_use]
    pub fn notifications(&self) -> &NotificationLog {
        &self.inner.notifications
    }

    /// Configuration the server was started with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Timezone used for display timestamps.
    #[must_use]
    pub fn display_timezone(&self) -> Tz {
        self.inner.display_timezone
    }
}
