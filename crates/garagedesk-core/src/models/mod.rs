//! Data models for the shop backend.
//!
//! - Auth payloads: `CredentialPair`, `UserProfile`, `Registration`, ...
//! - `Customer`, `Vehicle`: client records and their vehicles
//! - `Employee`: shop staff
//! - `JobCard`, `JobStatus`: the work-order workflow
//! - `InventoryItem`, `Appointment`, `Invoice`

pub mod auth;
pub mod customer;
pub mod employee;
pub mod jobcard;
pub mod shop;

use serde::{Deserialize, Deserializer};

pub use auth::{
    CredentialPair, LoginRequest, ProfileUpdate, RefreshRequest, RefreshResponse, Registration,
    SetPasswordRequest, TokenPairResponse, UserProfile,
};
pub use customer::{Customer, Vehicle};
pub use employee::Employee;
pub use jobcard::{JobCard, JobStatus};
pub use shop::{Appointment, InventoryItem, Invoice};

/// A collection response. The backend returns either a bare array or a
/// paginated envelope depending on whether pagination is enabled.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Page {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        results: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Page { results, .. } => results,
            ListResponse::Bare(items) => items,
        }
    }

    pub fn next_page(&self) -> Option<&str> {
        match self {
            ListResponse::Page { next, .. } => next.as_deref(),
            ListResponse::Bare(_) => None,
        }
    }
}

/// Decimal fields arrive as strings ("120.50") or numbers depending on the
/// serializer; accept both.
pub(crate) fn decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
