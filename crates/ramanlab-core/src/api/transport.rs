//! Shared HTTP transport for feature modules.
//!
//! Every request goes through two interceptors:
//! - request: attach `Authorization: Bearer <token>` using the token found in
//!   persistent storage at send time
//! - response: on a 401 outside the login flow, end the session and send the
//!   host to the login screen; surface other server errors as notifications
//!
//! Errors are always returned to the caller as well, so a feature module can
//! still react (stop a spinner, re-enable a button).

use std::sync::Arc;

use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::storage::ACCESS_TOKEN_KEY;

use super::{join_url, ApiError, AuthApi, LOGIN_PATH};

/// Shared client. Clone is cheap and shares the connection pool.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    base_url: Url,
    session: Arc<SessionStore>,
}

impl Transport {
    pub fn new(client: Client, base_url: Url, session: Arc<SessionStore>) -> Self {
        Self {
            client,
            base_url,
            session,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Start a request to `path`, relative to the base URL. Send it with
    /// [`Transport::send`] so the interceptors run.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = join_url(&self.base_url, path)?;
        Ok(self.client.request(method, url))
    }

    /// Send a request built by [`Transport::request`]
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let (request, token) = self.authorize(request);
        let request = request
            .build()
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        // Taken before sending: a redirect caused by another response must
        // not change how this one is handled
        let sent = Sent {
            path: request.url().path().to_string(),
            login_request: targets_login(&self.base_url, request.url()),
            from_login_screen: self.session.shell().is_on_login(),
            token,
        };
        let result = self.client.execute(request).await;
        self.intercept_response(sent, result).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path)?;
        let response = self.send(request).await?;
        AuthApi::parse_json(response).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.request(Method::GET, path)?.query(query);
        let response = self.send(request).await?;
        AuthApi::parse_json(response).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.request(Method::POST, path)?.json(body);
        let response = self.send(request).await?;
        AuthApi::parse_json(response).await
    }

    /// Multipart upload, e.g. a spectrum file
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::POST, path)?.multipart(form);
        let response = self.send(request).await?;
        AuthApi::parse_json(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, path)?;
        self.send(request).await?;
        Ok(())
    }

    /// Request interceptor. Returns the token it attached.
    ///
    /// Reads storage rather than the session store so requests are authorized
    /// even when the store has not seen a token written by someone else.
    fn authorize(&self, request: RequestBuilder) -> (RequestBuilder, Option<String>) {
        match self.session.store().get(ACCESS_TOKEN_KEY) {
            Ok(Some(token)) => (request.bearer_auth(&token), Some(token)),
            Ok(None) => (request, None),
            Err(e) => {
                warn!(error = %e, "Failed to read access token, sending unauthenticated");
                (request, None)
            }
        }
    }

    /// Response interceptor
    async fn intercept_response(
        &self,
        sent: Sent,
        result: Result<Response, reqwest::Error>,
    ) -> Result<Response, ApiError> {
        let path = sent.path.as_str();
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                // No response to report; the caller decides how to show it
                debug!(path = path, error = %e, "Request failed without a response");
                return Err(ApiError::Network(e));
            }
        };

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, &body);

        let shell = self.session.shell();
        if status == StatusCode::UNAUTHORIZED && !sent.from_login_screen && !sent.login_request {
            if self.session.expire(sent.token.as_deref()) {
                warn!(path = path, "Session expired, logging out");
                shell.redirect_to_login();
            } else {
                debug!(path = path, "Rejected token was already replaced");
            }
        } else {
            debug!(path = path, status = %status, "Request failed");
            shell.notify_error(err.user_message());
        }

        Err(err)
    }
}

/// What the response interceptor needs to know about the request
struct Sent {
    path: String,
    token: Option<String>,
    login_request: bool,
    from_login_screen: bool,
}

/// Whether `url` is the login endpoint under `base`
fn targets_login(base: &Url, url: &Url) -> bool {
    join_url(base, LOGIN_PATH).is_ok_and(|login| login.path() == url.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::parse_base_url;

    #[test]
    fn test_targets_login() {
        let base = parse_base_url("http://127.0.0.1:8000/api/v1/").unwrap();
        let url = |s: &str| Url::parse(s).unwrap();

        assert!(targets_login(&base, &url("http://127.0.0.1:8000/api/v1/auth/login/")));
        assert!(targets_login(
            &base,
            &url("http://127.0.0.1:8000/api/v1/auth/login/?next=/records")
        ));
        assert!(!targets_login(&base, &url("http://127.0.0.1:8000/api/v1/auth/me/")));
        assert!(!targets_login(&base, &url("http://127.0.0.1:8000/api/v1/records/")));
        assert!(!targets_login(
            &base,
            &url("http://127.0.0.1:8000/api/v1/auth/login/extra/")
        ));
        assert!(!targets_login(
            &base,
            &url("http://127.0.0.1:8000/api/v1/other-auth/login/")
        ));
    }
}
