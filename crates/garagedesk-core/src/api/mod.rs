//! REST API client module for the shop backend.
//!
//! This module provides the `ApiClient` for communicating with the backend
//! under `{base}/api`, plus typed access to its resource collections.
//!
//! The API uses JWT bearer authentication. Expired access tokens are
//! refreshed once, with concurrent failures sharing a single refresh call.

pub mod client;
pub mod endpoints;
pub mod error;
mod refresh;
pub mod request;
pub mod resources;

pub use client::{ApiClient, ClientConfig};
pub use error::{ApiError, RefreshError};
pub use request::ApiRequest;
pub use resources::{Resource, ShopApi};
