//! Authentication module for credential storage and session management.
//!
//! This module provides:
//! - `TokenStore`: the access/refresh token pair over a `KeyValueStore`
//! - Store backends: `MemoryStore`, `FileStore`, `SealedFileStore`, `KeyringStore`
//! - `SessionManager`: login, logout, profile, and forced logout when the
//!   session is revoked

pub mod file_store;
pub mod keyring_store;
pub mod sealed;
pub mod session;
pub mod store;

pub use file_store::FileStore;
pub use keyring_store::KeyringStore;
pub use sealed::SealedFileStore;
pub use session::SessionManager;
pub use store::{KeyValueStore, MemoryStore, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
