//! API client for the Electree backend.
//!
//! Login and registration go out without credentials. Every other request
//! is decorated with the stored bearer token inside [`ApiClient`], so callers
//! never attach it themselves.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{SecureStore, TOKEN_KEY};
use crate::config::Config;

use super::error::truncate_body;
use super::AuthError;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/api/login";
const REGISTER_PATH: &str = "/api/register";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub token_type: Option<String>,
    /// Seconds or a duration string, depending on backend configuration
    pub expires_in: Option<Value>,
    pub status: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub data: Option<Value>,
}

/// HTTP collaborator for the session manager.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn SecureStore>,
}

impl ApiClient {
    /// Create a new API client reading its bearer token from `store`.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        store: Arc<dyn SecureStore>,
    ) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            store,
        })
    }

    pub fn from_config(config: &Config, store: Arc<dyn SecureStore>) -> Result<Self, AuthError> {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            store,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store the bearer token is read from.
    pub fn store(&self) -> &Arc<dyn SecureStore> {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // ===== Unauthenticated endpoints =====

    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<LoginResponse, AuthError> {
        let url = self.url(LOGIN_PATH);
        debug!(url = %url, "Sending login request");

        let response = self.client.post(&url).json(request).send().await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response).await
    }

    pub async fn register(
        &self,
        request: &RegisterRequest<'_>,
    ) -> Result<RegisterResponse, AuthError> {
        let url = self.url(REGISTER_PATH);
        debug!(url = %url, "Sending register request");

        let response = self.client.post(&url).json(request).send().await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response).await
    }

    // ===== Authenticated endpoints =====

    /// GET an endpoint with the stored credential attached.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AuthError> {
        let builder = self.client.get(self.url(path));
        let response = self.send_authorized(builder).await?;
        Self::parse_json(response).await
    }

    /// POST a JSON body to an endpoint with the stored credential attached.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AuthError> {
        let builder = self.client.post(self.url(path)).json(body);
        let response = self.send_authorized(builder).await?;
        Self::parse_json(response).await
    }

    async fn auth_headers(&self) -> Result<header::HeaderMap, AuthError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.store.get(TOKEN_KEY).await? {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                AuthError::InvalidResponse("stored token is not a valid header value".to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Decorate, send, and check a request. A 401 drops the stored credential.
    async fn send_authorized(&self, builder: RequestBuilder) -> Result<Response, AuthError> {
        let response = builder.headers(self.auth_headers().await?).send().await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            warn!(url = %response.url(), "Request rejected as unauthorized, clearing credential");
            if let Err(e) = self.store.delete(TOKEN_KEY).await {
                warn!(error = %e, "Failed to clear credential after 401");
            }
            return Err(AuthError::Unauthorized);
        }

        Self::check_response(response).await
    }

    /// Check if response is successful, returning an error built from the body if not.
    async fn check_response(response: Response) -> Result<Response, AuthError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, body = %truncate_body(&body), "Request failed");
            Err(AuthError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, AuthError> {
        let url = response.url().to_string();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            AuthError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(1), Arc::new(MemoryStore::new()))
            .expect("client should build")
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let api = client("http://localhost:4000/");
        assert_eq!(api.base_url(), "http://localhost:4000");
        assert_eq!(api.url("/api/login"), "http://localhost:4000/api/login");
        assert_eq!(api.url("api/prices"), "http://localhost:4000/api/prices");
    }

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"token":"a.b.c","token_type":"Bearer","expires_in":3600,"status":"ok","message":"Logged in"}"#;
        let resp: LoginResponse = serde_json::from_str(json).expect("login response should parse");
        assert_eq!(resp.token.as_deref(), Some("a.b.c"));
        assert_eq!(resp.token_type.as_deref(), Some("Bearer"));
        assert_eq!(resp.expires_in, Some(serde_json::json!(3600)));
    }

    #[test]
    fn test_parse_register_response_with_missing_fields() {
        let resp: RegisterResponse =
            serde_json::from_str(r#"{"message":"created"}"#).expect("register response should parse");
        assert_eq!(resp.message.as_deref(), Some("created"));
        assert!(resp.status.is_none());
        assert!(resp.data.is_none());
    }

    #[tokio::test]
    async fn test_auth_headers_empty_when_anonymous() {
        let api = client("http://localhost:4000");
        let headers = api.auth_headers().await.expect("headers");
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_auth_headers_carry_stored_token() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "abc.def.ghi").await.expect("set");
        let api = ApiClient::new("http://localhost:4000", Duration::from_secs(1), store)
            .expect("client should build");

        let headers = api.auth_headers().await.expect("headers");
        let value = headers.get(header::AUTHORIZATION).expect("authorization header");
        assert_eq!(value.to_str().expect("ascii"), "Bearer abc.def.ghi");
        assert!(value.is_sensitive());
    }
}
