//! Bridge between the session core and the hosting application.
//!
//! The core never renders anything or drives navigation itself. It emits
//! `ShellEvent`s on a broadcast channel and the host (a CLI, a GUI, a test)
//! subscribes and reacts. The shell also tracks the current navigation
//! location so expiry handling can avoid redirect loops.

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

/// Buffer size for the shell event channel.
/// Slow subscribers past this many events start missing the oldest ones.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Default login route
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Transient message for the user (a toast, a status line)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Notify(Notification),
    /// The host should navigate to this path
    Navigate(String),
}

pub struct Shell {
    location: Mutex<String>,
    login_route: String,
    events: broadcast::Sender<ShellEvent>,
}

impl Shell {
    pub fn new(login_route: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            location: Mutex::new("/".to_string()),
            login_route: login_route.into(),
            events,
        }
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShellEvent> {
        self.events.subscribe()
    }

    pub fn location(&self) -> String {
        self.location.lock().clone()
    }

    /// Record where the host currently is. Called by the navigator.
    pub fn set_location(&self, path: impl Into<String>) {
        *self.location.lock() = path.into();
    }

    /// Whether the current location is the login screen (or below it)
    pub fn is_on_login(&self) -> bool {
        is_under(&self.location.lock(), &self.login_route)
    }

    /// Send the host to the login screen unless it is already there.
    ///
    /// Returns `true` if a navigate event was emitted. The check and the
    /// location update happen under one lock, so concurrent callers emit a
    /// single event between them.
    pub fn redirect_to_login(&self) -> bool {
        let mut location = self.location.lock();
        if is_under(&location, &self.login_route) {
            debug!("Already on login route, redirect skipped");
            return false;
        }
        *location = self.login_route.clone();
        self.emit(ShellEvent::Navigate(self.login_route.clone()));
        true
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.emit(ShellEvent::Notify(Notification {
            level,
            message: message.into(),
        }));
    }

    pub fn notify_error(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, message);
    }

    fn emit(&self, event: ShellEvent) {
        // No subscribers is fine: nobody is rendering
        let _ = self.events.send(event);
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_ROUTE)
    }
}

fn is_under(path: &str, route: &str) -> bool {
    path == route
        || path
            .strip_prefix(route)
            .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
}
