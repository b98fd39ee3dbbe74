use std::sync::Arc;

use tracing::debug;

use crate::auth::SessionStore;

use super::Route;

/// Authentication status as seen by the guard. Derived on every check, never
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(String),
}

/// Runs before each navigation and keeps anonymous users out of protected
/// routes.
pub struct NavigationGuard {
    session: Arc<SessionStore>,
    login_route: String,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionStore>, login_route: impl Into<String>) -> Self {
        Self {
            session,
            login_route: login_route.into(),
        }
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    pub fn state(&self) -> AuthState {
        if self.session.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn before_each(&self, to: &Route) -> GuardDecision {
        if to.requires_auth && self.state() == AuthState::Unauthenticated {
            debug!(route = %to.pattern, "Protected route, redirecting to login");
            GuardDecision::Redirect(self.login_route.clone())
        } else {
            GuardDecision::Proceed
        }
    }
}
