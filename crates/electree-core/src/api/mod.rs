//! REST API client module for the Electree backend.
//!
//! This module provides the `ApiClient` for the login and registration
//! endpoints and for any authenticated endpoint, plus the `AuthError`
//! type every session operation returns.
//!
//! The backend issues a JWT bearer token on login; it is attached to
//! authenticated requests as `Authorization: Bearer <token>`.

pub mod client;
pub mod error;

pub use client::{ApiClient, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, DEFAULT_TIMEOUT_SECS};
pub use error::{AuthError, GENERIC_NETWORK_MESSAGE};
