use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, AuthApi, ErrorBody};
use crate::models::{TokenPair, UserProfile};
use crate::shell::Shell;
use crate::storage::{
    KeyValueStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, USER_INFO_KEY,
};

#[derive(Error, Debug)]
pub enum SessionError {
    /// The server answered with an error body. It is passed through verbatim
    /// so callers can show field-level messages.
    #[error("Request rejected ({status}): {body}")]
    Rejected { status: StatusCode, body: ErrorBody },

    #[error(transparent)]
    Api(ApiError),

    #[error("Failed to persist session: {0:#}")]
    Storage(anyhow::Error),
}

impl SessionError {
    /// Prefer the server's error body over the transport error
    pub fn from_api(err: ApiError) -> Self {
        if let (Some(status), Some(body)) = (err.status(), err.body()) {
            if !body.is_empty() {
                return SessionError::Rejected {
                    status,
                    body: body.clone(),
                };
            }
        }
        SessionError::Api(err)
    }

    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            SessionError::Rejected { body, .. } => Some(body),
            SessionError::Api(e) => e.body(),
            SessionError::Storage(_) => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SessionError::Rejected { status, .. } => Some(*status),
            SessionError::Api(e) => e.status(),
            SessionError::Storage(_) => None,
        }
    }
}

/// Tokens and profile of the current session.
#[derive(Clone, Default, PartialEq)]
pub struct SessionState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .finish()
    }
}

/// Owner of the session.
///
/// The state mutex is held across the in-memory update and the matching
/// storage writes, so the three session keys are always written and cleared
/// as a unit. It is never held across an `.await`.
pub struct SessionStore {
    state: Mutex<SessionState>,
    kv: Arc<dyn KeyValueStore>,
    api: AuthApi,
    shell: Arc<Shell>,
}

impl SessionStore {
    /// Create the store, seeding it from persistent storage. No network calls.
    pub fn new(kv: Arc<dyn KeyValueStore>, api: AuthApi, shell: Arc<Shell>) -> Self {
        let state = Self::restore(kv.as_ref());
        debug!(
            authenticated = state.is_authenticated(),
            has_user = state.user.is_some(),
            "Session restored"
        );
        Self {
            state: Mutex::new(state),
            kv,
            api,
            shell,
        }
    }

    fn restore(kv: &dyn KeyValueStore) -> SessionState {
        let read = |key: &str| match kv.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read session key");
                None
            }
        };

        let user = read(USER_INFO_KEY).and_then(|raw| match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Ignoring unparseable stored user profile");
                None
            }
        });

        SessionState {
            access_token: read(ACCESS_TOKEN_KEY),
            refresh_token: read(REFRESH_TOKEN_KEY),
            user,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().is_authenticated()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.lock().access_token.clone()
    }

    /// Stored for completeness; nothing renews sessions with it yet.
    pub fn refresh_token(&self) -> Option<String> {
        self.state.lock().refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.lock().user.clone()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    pub fn shell(&self) -> &Arc<Shell> {
        &self.shell
    }

    /// Log in and load the user's profile.
    ///
    /// On failure nothing about the current session changes.
    pub async fn login(&self, username: &str, password: &str) -> Result<bool, SessionError> {
        let tokens = match self.api.login(username, password).await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!(error = %e, "Login failed");
                return Err(SessionError::from_api(e));
            }
        };

        self.store_tokens(&tokens).map_err(SessionError::Storage)?;
        info!(username = username, "Login successful");

        self.fetch_user().await;
        Ok(true)
    }

    /// Write a fresh token pair. The previous profile is dropped; it belonged
    /// to the previous token.
    fn store_tokens(&self, tokens: &TokenPair) -> anyhow::Result<()> {
        let mut state = self.state.lock();

        self.kv
            .set(ACCESS_TOKEN_KEY, &tokens.access)
            .context("Failed to store access token")?;
        if let Err(e) = self.kv.set(REFRESH_TOKEN_KEY, &tokens.refresh) {
            if let Err(rollback) = self.kv.remove(ACCESS_TOKEN_KEY) {
                warn!(error = %rollback, "Failed to roll back access token");
            }
            return Err(e.context("Failed to store refresh token"));
        }
        if state.user.is_some() {
            if let Err(e) = self.kv.remove(USER_INFO_KEY) {
                warn!(error = %e, "Failed to clear previous user profile");
            }
        }

        *state = SessionState {
            access_token: Some(tokens.access.clone()),
            refresh_token: Some(tokens.refresh.clone()),
            user: None,
        };
        Ok(())
    }

    /// Refresh the cached profile.
    ///
    /// Does nothing without a token. A 401 ends the session and sends the
    /// host to the login screen; any other failure keeps the stale profile.
    pub async fn fetch_user(&self) {
        let Some(token) = self.access_token() else {
            return;
        };

        match self.api.fetch_profile(&token).await {
            Ok(user) => self.store_user(&token, user),
            Err(e) if e.is_unauthorized() => {
                warn!("Profile request unauthorized, ending session");
                if self.clear(Some(&token)) {
                    self.shell.redirect_to_login();
                }
            }
            Err(e) => warn!(error = %e, "Failed to fetch user profile"),
        }
    }

    fn store_user(&self, token: &str, user: UserProfile) {
        let mut state = self.state.lock();
        if state.access_token.as_deref() != Some(token) {
            debug!("Session changed while fetching profile, discarding it");
            return;
        }

        match serde_json::to_string(&user) {
            Ok(raw) => {
                if let Err(e) = self.kv.set(USER_INFO_KEY, &raw) {
                    warn!(error = %e, "Failed to persist user profile");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize user profile"),
        }
        debug!(user_id = user.id, "User profile updated");
        state.user = Some(user);
    }

    /// Create an account. Does not log in.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<bool, SessionError> {
        match self.api.register(username, password, email).await {
            Ok(()) => {
                info!(username = username, "Registration successful");
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "Registration failed");
                Err(SessionError::from_api(e))
            }
        }
    }

    /// Clear the session from memory and storage. Safe to call repeatedly.
    ///
    /// Returns `true` if there was a session to clear.
    pub fn logout(&self) -> bool {
        self.clear(None)
    }

    /// End the session a rejected request was sent with.
    ///
    /// Returns `false` when a different token has been stored since the
    /// request went out; that newer session is left alone. Otherwise the
    /// session is cleared (if anything is left of it) and the caller should
    /// send the host to the login screen.
    pub fn expire(&self, sent_token: Option<&str>) -> bool {
        let mut state = self.state.lock();
        if state.access_token.is_some() && state.access_token.as_deref() != sent_token {
            debug!("Rejected token already replaced, keeping the newer session");
            return false;
        }
        self.clear_locked(&mut state);
        true
    }

    /// Clear the session, optionally only if it still holds `token`
    fn clear(&self, only_if_token: Option<&str>) -> bool {
        let mut state = self.state.lock();
        if let Some(token) = only_if_token {
            if state.access_token.as_deref() != Some(token) {
                debug!("Session already replaced, not clearing");
                return false;
            }
        }
        self.clear_locked(&mut state)
    }

    fn clear_locked(&self, state: &mut SessionState) -> bool {
        for key in SESSION_KEYS {
            if let Err(e) = self.kv.remove(key) {
                warn!(key = key, error = %e, "Failed to remove session key");
            }
        }

        let was_active = !state.is_empty();
        *state = SessionState::default();
        if was_active {
            info!("Logged out");
        }
        was_active
    }
}
