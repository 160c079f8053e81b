use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// A replayable description of one API call.
///
/// The body is held as a JSON value rather than a stream so the same call
/// can be sent again after a token refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Whether a 401 may be recovered by refreshing the access token
    pub refresh_on_unauthorized: bool,
    /// Whether the stored access token is attached
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            refresh_on_unauthorized: true,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> serde_json::Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Treat a 401 as final. Used for credential exchanges such as login,
    /// where a 401 means bad credentials rather than an expired token.
    pub fn without_token_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }

    /// Send without a bearer token and treat a 401 as final. Used for
    /// login, where a stored token from an older session must not be sent.
    pub fn without_credentials(mut self) -> Self {
        self.authenticated = false;
        self.without_token_refresh()
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}
