//! Authentication state for the client.
//!
//! `SessionStore` owns the access/refresh tokens and the cached user profile,
//! mirrors them into persistent storage, and runs the login, registration,
//! profile and logout flows.

pub mod session;

pub use session::{SessionError, SessionState, SessionStore};
