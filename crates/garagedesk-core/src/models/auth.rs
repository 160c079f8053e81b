//! Authentication payloads exchanged with the `/auth/` endpoints.

use serde::{Deserialize, Serialize};

/// The access/refresh token pair held in durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response from `/auth/jwt/create/`
#[derive(Debug, Deserialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

impl From<TokenPairResponse> for CredentialPair {
    fn from(pair: TokenPairResponse) -> Self {
        CredentialPair::new(pair.access, pair.refresh)
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Response from `/auth/token/refresh/`. Backends that rotate refresh
/// tokens also return a new `refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// The logged-in user, from `/auth/users/me/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        match (first.is_empty(), last.is_empty()) {
            (true, true) => self.username.clone(),
            (false, true) => first.to_string(),
            (true, false) => last.to_string(),
            (false, false) => format!("{} {}", first, last),
        }
    }
}

/// Partial update for `PATCH /auth/users/me/`. Unset fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }
}

/// Body for `POST /auth/users/`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetPasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_response_without_rotation() {
        let parsed: RefreshResponse = serde_json::from_str(r#"{"access":"T2"}"#).unwrap();
        assert_eq!(parsed.access, "T2");
        assert!(parsed.refresh.is_none());
    }

    #[test]
    fn test_profile_display_name() {
        let mut profile = UserProfile {
            username: "mechanic1".into(),
            ..Default::default()
        };
        assert_eq!(profile.display_name(), "mechanic1");

        profile.first_name = Some("Ada".into());
        profile.last_name = Some("Lovelace".into());
        assert_eq!(profile.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            email: Some("ada@shop.test".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"email": "ada@shop.test"}));
        assert!(ProfileUpdate::default().is_empty());
    }
}
