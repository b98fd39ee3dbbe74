//! Data models exchanged with the backend's auth endpoints.
//!
//! - `UserProfile`: the cached profile returned by `auth/me/`
//! - `TokenPair`, `LoginRequest`, `RegisterRequest`: login/registration payloads

pub mod auth;
pub mod user;

pub use auth::{LoginRequest, RegisterRequest, TokenPair};
pub use user::UserProfile;
