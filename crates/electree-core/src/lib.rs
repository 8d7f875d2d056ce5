//! Core library for electree.
//!
//! The interesting part is the session lifecycle in [`auth`]: a bearer token
//! obtained from the backend is kept in a secure store, attached to requests
//! by [`api::ApiClient`], and decoded (without verification) for display.

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod profile;

pub use api::{ApiClient, AuthError};
pub use auth::{Claims, SecureStore, SessionManager, SessionState};
pub use config::Config;
pub use profile::Profile;
