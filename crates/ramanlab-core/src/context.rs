//! Wiring of the session core.
//!
//! One `SessionContext` owns the shell bridge, the session store, the shared
//! transport and the navigator. The session store is created once and handed
//! to the transport and the guard, so they all see the same session.

use std::sync::Arc;

use reqwest::{Client, Url};

use crate::api::{build_http_client, parse_base_url, ApiError, AuthApi, Transport};
use crate::auth::SessionStore;
use crate::config::Config;
use crate::navigation::{NavigationGuard, Navigator, RouteTable};
use crate::shell::Shell;
use crate::storage::KeyValueStore;

pub struct SessionContext {
    pub shell: Arc<Shell>,
    pub session: Arc<SessionStore>,
    pub transport: Transport,
    pub navigator: Navigator,
}

impl SessionContext {
    /// Build everything from configuration, with the default route table
    pub fn from_config(config: &Config, kv: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let client = build_http_client(config.request_timeout())?;
        let base_url = parse_base_url(&config.api_base_url())?;
        Ok(Self::new(
            client,
            base_url,
            kv,
            config.login_route(),
            RouteTable::default_routes(),
        ))
    }

    pub fn new(
        client: Client,
        base_url: Url,
        kv: Arc<dyn KeyValueStore>,
        login_route: &str,
        routes: RouteTable,
    ) -> Self {
        let shell = Arc::new(Shell::new(login_route));
        let auth = AuthApi::new(client.clone(), base_url.clone());
        let session = Arc::new(SessionStore::new(kv, auth, shell.clone()));
        let transport = Transport::new(client, base_url, session.clone());
        let guard = NavigationGuard::new(session.clone(), login_route);
        let navigator = Navigator::new(routes, guard, shell.clone());

        Self {
            shell,
            session,
            transport,
            navigator,
        }
    }
}
