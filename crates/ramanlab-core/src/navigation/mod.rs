//! Route table, navigation guard and navigator.
//!
//! The navigator resolves a path, follows static redirects, asks the guard
//! whether the session may enter the route, and records the final location
//! on the shell.

pub mod guard;
pub mod routes;

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::shell::Shell;

pub use guard::{AuthState, GuardDecision, NavigationGuard};
pub use routes::{ResolvedRoute, Route, RouteTable};

/// Upper bound on redirects followed for one navigation
const MAX_REDIRECTS: usize = 8;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NavigationError {
    #[error("No route matches {0}")]
    NotFound(String),

    #[error("Too many redirects while navigating to {0}")]
    RedirectLoop(String),
}

pub struct Navigator {
    routes: RouteTable,
    guard: NavigationGuard,
    shell: Arc<Shell>,
}

impl Navigator {
    pub fn new(routes: RouteTable, guard: NavigationGuard, shell: Arc<Shell>) -> Self {
        Self {
            routes,
            guard,
            shell,
        }
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Navigate to `path`, returning where the host actually ends up
    pub fn navigate(&self, path: &str) -> Result<String, NavigationError> {
        let mut target = path.to_string();

        for _ in 0..MAX_REDIRECTS {
            let resolved = self
                .routes
                .resolve(&target)
                .ok_or_else(|| NavigationError::NotFound(target.clone()))?;

            if let Some(ref to) = resolved.route.redirect {
                debug!(from = %target, to = %to, "Following route redirect");
                target = to.clone();
                continue;
            }

            match self.guard.before_each(resolved.route) {
                GuardDecision::Proceed => {
                    self.shell.set_location(target.clone());
                    return Ok(target);
                }
                GuardDecision::Redirect(to) => target = to,
            }
        }

        Err(NavigationError::RedirectLoop(path.to_string()))
    }
}
