use serde::Deserialize;
use thiserror::Error;

use crate::auth::StoreError;

/// Message shown when a failure carries nothing more specific to display.
pub const GENERIC_NETWORK_MESSAGE: &str = "Network error. Please try again.";

/// Maximum length for error response bodies kept in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error ({status}): {}", message.as_deref().unwrap_or("no message"))]
    Server {
        status: u16,
        message: Option<String>,
    },

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Secure store error: {0}")]
    Store(#[from] StoreError),
}

/// Error payload shape returned by the backend. Either field may carry the text.
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    message: Option<String>,
    error: Option<String>,
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        AuthError::Validation(message.into())
    }

    /// Build an error from a non-success status and its raw body.
    ///
    /// A 401 stays a `Server` error here: on login it means bad credentials
    /// and the body says so. Authenticated requests map it themselves.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        AuthError::Server {
            status: status.as_u16(),
            message: extract_message(body),
        }
    }

    /// Text suitable for showing directly to the user.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(msg) => msg.clone(),
            AuthError::Server {
                message: Some(msg), ..
            } => msg.clone(),
            AuthError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            _ => GENERIC_NETWORK_MESSAGE.to_string(),
        }
    }

    /// Whether the failure happened before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, AuthError::Validation(_))
    }
}

/// Pull a displayable message out of an error body, preferring `message` over `error`.
fn extract_message(body: &str) -> Option<String> {
    let payload: ErrorPayload = serde_json::from_str(body).unwrap_or_default();
    payload
        .message
        .or(payload.error)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

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
