//! Authenticated HTTP client for the shop backend.
//!
//! Every request carries the stored access token as a bearer header. A 401
//! triggers one coordinated token refresh (see [`super::refresh`]) and a
//! single replay of the failed request with the new token.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::auth::TokenStore;
use crate::models::{CredentialPair, RefreshRequest, RefreshResponse};

use super::endpoints;
use super::refresh::{RefreshCoordinator, Ticket};
use super::{ApiError, ApiRequest, RefreshError};

// ============================================================================
// Constants
// ============================================================================

/// Default backend origin; the API lives under `/api`
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on one token refresh, including reading its body. Queued
/// requests are rejected with `RefreshError::TimedOut` once it elapses.
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 15;

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://shop.example.com`
    pub base_url: String,
    pub request_timeout: Duration,
    pub refresh_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            refresh_timeout: Duration::from_secs(DEFAULT_REFRESH_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// `{base_url}/api`
    pub fn api_root(&self) -> String {
        format!("{}/api", self.base_url.trim_end_matches('/'))
    }
}

/// API client for the shop backend.
/// Clone is cheap - clones share the connection pool, the token store and
/// the refresh state, so a refresh started by one clone is joined by all.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    api_root: String,
    refresh_timeout: Duration,
    store: TokenStore,
    refresh: Arc<RefreshCoordinator>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, store: TokenStore) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            api_root: config.api_root(),
            refresh_timeout: config.refresh_timeout,
            store,
            refresh: Arc::new(RefreshCoordinator::new()),
        })
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Whether a token refresh is currently outstanding
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_in_flight()
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.api_root, path)
        } else {
            format!("{}/{}", self.api_root, path)
        }
    }

    /// Whether `url` is a relative path or an absolute URL under the API
    /// root. Only such URLs may carry the access token.
    pub fn is_api_url(&self, url: &str) -> bool {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return true;
        }
        url.strip_prefix(self.api_root.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
    }

    fn stored_access_token(&self) -> Result<Option<String>, ApiError> {
        self.store
            .access_token()
            .map_err(|e| ApiError::Storage(e.to_string()))
    }

    /// Send a request through the full credential protocol.
    ///
    /// Returns the successful response, or the most specific error: a
    /// refresh failure wins over the 401 that triggered it. A request is
    /// replayed at most once; a 401 on the replay is final.
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let token = self.stored_access_token()?;
        let response = self.dispatch(&request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check_response(response).await;
        }
        if !request.refresh_on_unauthorized || endpoints::is_token_refresh(&request.path) {
            debug!(path = %request.path, "401 on a request exempt from token refresh");
            return Self::check_response(response).await;
        }

        debug!(method = %request.method, path = %request.path, "Access token rejected");
        let new_token = self.obtain_token(token.as_deref()).await?;

        let replayed = self.dispatch(&request, Some(&new_token)).await?;
        if replayed.status() == StatusCode::UNAUTHORIZED {
            warn!(path = %request.path, "Request rejected again after token refresh");
        }
        Self::check_response(replayed).await
    }

    /// Force a token refresh, joining one already in flight.
    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        let token = self.stored_access_token()?;
        self.obtain_token(token.as_deref()).await
    }

    async fn obtain_token(&self, sent_token: Option<&str>) -> Result<String, ApiError> {
        match self.refresh.join(&self.store, sent_token)? {
            Ticket::Replay(token) => Ok(token),
            Ticket::Wait(rx) => {
                let outcome = rx.await.unwrap_or(Err(RefreshError::Abandoned));
                Ok(outcome?)
            }
            Ticket::Lead(guard) => {
                let outcome = self.perform_refresh().await;
                guard.settle(outcome.clone());
                Ok(outcome?)
            }
        }
    }

    async fn perform_refresh(&self) -> Result<String, RefreshError> {
        let refresh_token = self
            .store
            .refresh_token()
            .map_err(|e| RefreshError::Storage(e.to_string()))?
            .ok_or(RefreshError::NoRefreshToken)?;

        info!("Refreshing access token");
        let refreshed = tokio::time::timeout(
            self.refresh_timeout,
            self.call_refresh_endpoint(&refresh_token),
        )
        .await
        .map_err(|_| RefreshError::TimedOut)??;

        let stored = match refreshed.refresh {
            Some(ref rotated) => self
                .store
                .save_pair(&CredentialPair::new(refreshed.access.as_str(), rotated.as_str())),
            None => self.store.set_access_token(&refreshed.access),
        };
        stored.map_err(|e| RefreshError::Storage(e.to_string()))?;

        info!("Access token refreshed");
        Ok(refreshed.access)
    }

    async fn call_refresh_endpoint(&self, refresh_token: &str) -> Result<RefreshResponse, RefreshError> {
        let response = self
            .client
            .post(self.url(endpoints::TOKEN_REFRESH))
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                body: ApiError::truncate_body(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        let token = token.filter(|_| request.authenticated);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        debug!(method = %request.method, path = %request.path, authenticated = token.is_some(), "Sending request");
        Ok(builder.send().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    // ===== Typed helpers =====

    pub async fn request_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_json(ApiRequest::get(path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Self::with_body(ApiRequest::post(path), body)?)
            .await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Self::with_body(ApiRequest::put(path), body)?)
            .await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Self::with_body(ApiRequest::patch(path), body)?)
            .await
    }

    /// Send a request whose response body is not needed (204s and the like)
    pub async fn execute(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(path)).await
    }

    fn with_body<B: Serialize + ?Sized>(request: ApiRequest, body: &B) -> Result<ApiRequest, ApiError> {
        request
            .with_json(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))
    }
}

// ============================================================================
// Tests
// ============================================================================
