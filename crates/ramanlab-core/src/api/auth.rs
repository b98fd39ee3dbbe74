use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{LoginRequest, RegisterRequest, TokenPair, UserProfile};

use super::{join_url, ApiError};

/// Obtain an access/refresh token pair
pub const LOGIN_PATH: &str = "auth/login/";

/// Profile of the bearer of the token
pub const PROFILE_PATH: &str = "auth/me/";

/// Create an account. No authentication required.
pub const REGISTER_PATH: &str = "auth/register/";

/// Client for the authentication endpoints.
///
/// Requests made here bypass the transport's interceptors: the caller passes
/// the bearer token explicitly and decides what a 401 means.
#[derive(Clone)]
pub struct AuthApi {
    client: Client,
    base_url: Url,
}

impl AuthApi {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Exchange credentials for a token pair
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let url = join_url(&self.base_url, LOGIN_PATH)?;
        debug!(username = username, "Sending login request");

        let response = self
            .client
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        Self::parse_json(Self::check_response(response).await?).await
    }

    /// Fetch the profile of the user the token belongs to
    pub async fn fetch_profile(&self, token: &str) -> Result<UserProfile, ApiError> {
        let url = join_url(&self.base_url, PROFILE_PATH)?;

        let response = self.client.get(url).bearer_auth(token).send().await?;

        Self::parse_json(Self::check_response(response).await?).await
    }

    /// Create an account. The success body is not used.
    pub async fn register(&self, username: &str, password: &str, email: &str) -> Result<(), ApiError> {
        let url = join_url(&self.base_url, REGISTER_PATH)?;
        debug!(username = username, "Sending registration request");

        let response = self
            .client
            .post(url)
            .json(&RegisterRequest {
                username,
                password,
                email,
            })
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    /// Check if response is successful, returning an error with body if not.
    pub(crate) async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    pub(crate) async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let url = response.url().clone();
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url.path(), e)))
    }
}
