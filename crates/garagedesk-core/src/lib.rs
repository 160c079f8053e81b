//! Core library for garagedesk, a client for an auto-repair shop backend.
//!
//! - [`api`]: authenticated HTTP client with single-flight token refresh,
//!   plus typed access to the shop's collections
//! - [`auth`]: credential storage backends and session management
//! - [`board`]: the job-card board
//! - [`config`]: persisted settings and environment overrides
//! - [`models`]: serde models for backend payloads

pub mod api;
pub mod auth;
pub mod board;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiRequest, ClientConfig, RefreshError, ShopApi};
pub use auth::{SessionManager, TokenStore};
pub use board::{BoardError, CardMove, JobBoard};
pub use config::Config;
