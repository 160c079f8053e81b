use thiserror::Error;

/// Why a token refresh did not produce a new access token.
///
/// One refresh failure is delivered to every request queued behind it, so
/// this type is `Clone` and carries no transport handles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No refresh token stored - please log in again")]
    NoRefreshToken,

    #[error("Refresh token rejected (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Network error during token refresh: {0}")]
    Network(String),

    #[error("Token refresh timed out")]
    TimedOut,

    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("Credential storage error during refresh: {0}")]
    Storage(String),

    #[error("Token refresh was abandoned before it completed")]
    Abandoned,
}

impl RefreshError {
    /// True when the backend explicitly refused the session (or there is no
    /// session to refresh), as opposed to a transport hiccup.
    pub fn is_session_revoked(&self) -> bool {
        match self {
            RefreshError::NoRefreshToken => true,
            RefreshError::Rejected { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Authentication failed: {0}")]
    Refresh(#[from] RefreshError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            code => ApiError::Status {
                status: code,
                body: truncated,
            },
        }
    }

    /// Terminal authentication failure: the session cannot be recovered by
    /// this client and the session owner should decide whether to log out.
    pub fn is_terminal_auth(&self) -> bool {
        matches!(self, ApiError::Refresh(_))
    }

    pub fn refresh_error(&self) -> Option<&RefreshError> {
        match self {
            ApiError::Refresh(err) => Some(err),
            _ => None,
        }
    }
}
