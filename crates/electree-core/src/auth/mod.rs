//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionManager`: login, registration, logout and claims over one stored token
//! - `SecureStore`: keychain, encrypted-file and in-memory token storage
//! - `Claims`: unverified, display-only JWT payload decoding
//! - `BusyFlag`: re-invocation guard for user-triggered actions
//!
//! The token lives only in the secure store under `TOKEN_KEY`.

pub mod busy;
pub mod claims;
pub mod session;
pub mod store;
pub mod validation;

pub use busy::{BusyFlag, BusyGuard};
pub use claims::Claims;
pub use session::{Credential, SessionManager, SessionState};
pub use store::{EncryptedFileStore, KeyringStore, MemoryStore, SecureStore, StoreError, TOKEN_KEY};
