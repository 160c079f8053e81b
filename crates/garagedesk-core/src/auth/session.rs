use tracing::{info, warn};

use crate::api::{endpoints, ApiClient, ApiError, ApiRequest};
use crate::models::{
    CredentialPair, LoginRequest, ProfileUpdate, Registration, SetPasswordRequest,
    TokenPairResponse, UserProfile,
};

use super::TokenStore;

/// Owns the user's session: obtains and discards the credential pair and
/// decides what to do when the API client reports an unrecoverable
/// authentication failure.
#[derive(Clone)]
pub struct SessionManager {
    api: ApiClient,
}

impl SessionManager {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn store(&self) -> &TokenStore {
        self.api.store()
    }

    /// A refresh token is stored, so requests can at least attempt recovery
    pub fn is_authenticated(&self) -> bool {
        self.store().has_credentials()
    }

    /// Exchange username and password for a token pair and store it.
    ///
    /// Bad credentials come back as `ApiError::Unauthorized`; login never
    /// goes through token refresh.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        // The current pair stays in place until the exchange succeeds;
        // save_pair replaces both tokens.
        let request = ApiRequest::post(endpoints::LOGIN)
            .with_json(&LoginRequest { username, password })
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?
            .without_credentials();
        let response = self.api.send(request).await?;
        let pair: TokenPairResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("login response: {}", e)))?;

        self.store()
            .save_pair(&CredentialPair::from(pair))
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        info!(username, "Logged in");
        Ok(())
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.clear_credentials()?;
        info!("Logged out");
        Ok(())
    }

    fn clear_credentials(&self) -> Result<(), ApiError> {
        self.store()
            .clear()
            .map_err(|e| ApiError::Storage(e.to_string()))
    }

    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::post(endpoints::USERS)
            .with_json(registration)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?
            .without_token_refresh();
        self.api.request_json(request).await
    }

    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.api.get_json(endpoints::CURRENT_USER).await
    }

    pub async fn update_me(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        self.api.patch_json(endpoints::CURRENT_USER, update).await
    }

    pub async fn set_password(&self, current_password: &str, new_password: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post(endpoints::SET_PASSWORD)
            .with_json(&SetPasswordRequest {
                current_password,
                new_password,
            })
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        self.api.execute(request).await
    }

    /// Refresh the access token ahead of a batch of requests.
    pub async fn ensure_fresh(&self) -> Result<(), ApiError> {
        self.api.refresh_access_token().await.map(|_| ())
    }

    /// React to an error returned by any API call.
    ///
    /// Stored credentials are cleared only when the session is definitely
    /// gone: no refresh token, or the refresh endpoint answered 401/403.
    /// Network failures and timeouts keep the credentials so the next
    /// attempt can recover. Returns true if a logout happened.
    pub fn handle_auth_failure(&self, err: &ApiError) -> bool {
        let Some(refresh_err) = err.refresh_error() else {
            return false;
        };

        if !refresh_err.is_session_revoked() {
            warn!(error = %refresh_err, "Token refresh failed, keeping stored credentials");
            return false;
        }

        warn!(error = %refresh_err, "Session revoked, clearing stored credentials");
        if let Err(e) = self.store().clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::{ClientConfig, RefreshError};

    fn session_for(server: &MockServer) -> SessionManager {
        let api = ApiClient::new(&ClientConfig::with_base_url(server.uri()), TokenStore::in_memory())
            .unwrap();
        SessionManager::new(api)
    }

    #[tokio::test]
    async fn test_login_stores_token_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/jwt/create/"))
            .and(body_json(json!({"username": "ada", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": "T1", "refresh": "R1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        session.login("ada", "pw").await.unwrap();

        assert!(session.is_authenticated());
        assert_eq!(session.store().access_token().unwrap().as_deref(), Some("T1"));
        assert_eq!(session.store().refresh_token().unwrap().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_unauthorized_without_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/jwt/create/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "detail": "No active account found with the given credentials"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/token/refresh/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let session = session_for(&server);
        session
            .store()
            .save_pair(&CredentialPair::new("old", "old-refresh"))
            .unwrap();

        let err = session.login("ada", "wrong").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert!(session.is_authenticated());
        assert_eq!(session.store().access_token().unwrap().as_deref(), Some("old"));
        assert_eq!(session.store().refresh_token().unwrap().as_deref(), Some("old-refresh"));
    }

    #[tokio::test]
    async fn test_login_network_failure_keeps_existing_session() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let api = ApiClient::new(
            &ClientConfig::with_base_url(format!("http://{}", addr)),
            TokenStore::in_memory(),
        )
        .unwrap();
        let session = SessionManager::new(api);
        session.store().save_pair(&CredentialPair::new("T1", "R1")).unwrap();

        let err = session.login("ada", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::NetworkError(_)));
        assert_eq!(session.store().access_token().unwrap().as_deref(), Some("T1"));
        assert_eq!(session.store().refresh_token().unwrap().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_login_replaces_pair_without_sending_old_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/jwt/create/"))
            .respond_with(|req: &wiremock::Request| {
                if req.headers.contains_key("authorization") {
                    ResponseTemplate::new(400)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({"access": "T2", "refresh": "R2"}))
                }
            })
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        session.store().save_pair(&CredentialPair::new("T1", "R1")).unwrap();
        session.login("grace", "pw").await.unwrap();

        assert_eq!(session.store().access_token().unwrap().as_deref(), Some("T2"));
        assert_eq!(session.store().refresh_token().unwrap().as_deref(), Some("R2"));
    }

    #[tokio::test]
    async fn test_me_uses_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/users/me/"))
            .and(header("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3, "username": "ada", "first_name": "Ada", "last_name": "Lovelace"
            })))
            .mount(&server)
            .await;

        let session = session_for(&server);
        session.store().save_pair(&CredentialPair::new("T1", "R1")).unwrap();

        let me = session.me().await.unwrap();
        assert_eq!(me.display_name(), "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_set_password_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/users/set_password/"))
            .and(body_json(json!({"current_password": "old", "new_password": "new"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        session.store().save_pair(&CredentialPair::new("T1", "R1")).unwrap();
        session.set_password("old", "new").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_me_sends_only_set_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/auth/users/me/"))
            .and(body_json(json!({"email": "ada@shop.test"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "ada", "email": "ada@shop.test"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        session.store().save_pair(&CredentialPair::new("T1", "R1")).unwrap();
        let update = ProfileUpdate {
            email: Some("ada@shop.test".into()),
            ..Default::default()
        };
        let profile = session.update_me(&update).await.unwrap();
        assert_eq!(profile.email.as_deref(), Some("ada@shop.test"));
    }

    #[test]
    fn test_handle_auth_failure_logs_out_on_revoked_session() {
        let api = ApiClient::new(&ClientConfig::default(), TokenStore::in_memory()).unwrap();
        let session = SessionManager::new(api);
        session.store().save_pair(&CredentialPair::new("T1", "R1")).unwrap();

        let revoked = ApiError::Refresh(RefreshError::Rejected {
            status: 401,
            body: String::new(),
        });
        assert!(session.handle_auth_failure(&revoked));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_handle_auth_failure_keeps_credentials_on_network_error() {
        let api = ApiClient::new(&ClientConfig::default(), TokenStore::in_memory()).unwrap();
        let session = SessionManager::new(api);
        session.store().save_pair(&CredentialPair::new("T1", "R1")).unwrap();

        let transient = ApiError::Refresh(RefreshError::Network("connection refused".into()));
        assert!(!session.handle_auth_failure(&transient));
        assert!(!session.handle_auth_failure(&ApiError::RateLimited));
        assert!(session.is_authenticated());
    }
}
