//! REST API plumbing for the lab backend.
//!
//! This module provides:
//! - `AuthApi`: the login, registration and profile endpoints used by the
//!   session store
//! - `Transport`: the shared client feature modules issue requests through,
//!   which injects the bearer token and handles session expiry
//!
//! The backend uses JWT bearer tokens obtained from `auth/login/`.

pub mod auth;
pub mod error;
pub mod transport;

use std::time::Duration;

use reqwest::{Client, Url};

pub use auth::{AuthApi, LOGIN_PATH, PROFILE_PATH, REGISTER_PATH};
pub use error::{ApiError, ErrorBody, GENERIC_ERROR_MESSAGE};
pub use transport::Transport;

/// Build the HTTP client shared by `AuthApi` and `Transport`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
pub fn build_http_client(timeout: Duration) -> Result<Client, ApiError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Parse a base URL, making sure relative paths land beneath it
pub fn parse_base_url(base: &str) -> Result<Url, ApiError> {
    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base, e)))
}

/// Join an endpoint path onto the base URL. Leading slashes are ignored so
/// `"/records/"` and `"records/"` resolve the same way.
pub(crate) fn join_url(base: &Url, path: &str) -> Result<Url, ApiError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
}
