//! Client-side session core for the Raman lab backend.
//!
//! - `storage`: persistent key-value backends for the session tokens
//! - `auth`: the session store (login, registration, profile, logout)
//! - `api`: auth endpoints and the shared, token-injecting transport
//! - `navigation`: route table, guard and navigator
//! - `shell`: events for the hosting application (notifications, redirects)
//! - `context`: wires the pieces together around one session

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod models;
pub mod navigation;
pub mod shell;
pub mod storage;

pub use api::{ApiError, ErrorBody, Transport};
pub use auth::{SessionError, SessionStore};
pub use config::Config;
pub use context::SessionContext;
pub use models::{TokenPair, UserProfile};
pub use navigation::{GuardDecision, NavigationGuard, Navigator, Route, RouteTable};
pub use shell::{Notification, NotificationLevel, Shell, ShellEvent};
pub use storage::{KeyValueStore, MemoryStore};
