use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{ApiClient, AuthError, LoginRequest, RegisterRequest};
use crate::profile::Profile;

use super::claims::Claims;
use super::store::{SecureStore, TOKEN_KEY};
use super::validation::{validate_login, validate_registration};

/// Message returned when the backend accepts a registration without saying anything
const DEFAULT_REGISTER_MESSAGE: &str = "Registration successful";

/// Opaque bearer token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    #[cfg(test)]
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Credential),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Owns the credential lifecycle: acquire, persist, expose claims, clear.
///
/// The store is the only copy of the token. Nothing is cached here, so two
/// managers over the same store always agree, and so does a restarted process.
#[derive(Clone)]
pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn SecureStore>,
}

impl SessionManager {
    /// Build a manager over the same store the client decorates requests from.
    pub fn new(api: ApiClient) -> Self {
        let store = Arc::clone(api.store());
        Self { api, store }
    }

    /// Client for authenticated endpoints; it attaches the stored token itself.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Log in and persist the returned token.
    ///
    /// Fails if the token cannot be stored, so a returned `Ok` always means
    /// the credential is in the store. Claims are empty when the token
    /// payload is not decodable.
    pub async fn login(&self, email: &str, password: &str) -> Result<Claims, AuthError> {
        validate_login(email, password)?;

        let request = LoginRequest {
            email: email.trim(),
            password,
        };
        let response = self
            .api
            .login(&request)
            .await
            .inspect_err(|e| warn!(error = %e, "Login failed"))?;

        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidResponse("login response did not include a token".to_string()))?;

        self.store
            .set(TOKEN_KEY, &token)
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to persist credential"))?;

        let claims = Claims::decode_unverified(&token).unwrap_or_default();
        info!(has_claims = !claims.is_empty(), "Login successful");
        Ok(claims)
    }

    /// Register an account. Does not log in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<String, AuthError> {
        validate_registration(name, email, password)?;

        let request = RegisterRequest {
            name: name.trim(),
            email: email.trim(),
            password,
        };
        let response = self
            .api
            .register(&request)
            .await
            .inspect_err(|e| warn!(error = %e, "Registration failed"))?;

        info!(status = ?response.status, "Registration accepted");
        Ok(response
            .message
            .unwrap_or_else(|| DEFAULT_REGISTER_MESSAGE.to_string()))
    }

    /// Remove the stored credential. Calling it while logged out is fine.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.store.delete(TOKEN_KEY).await?;
        info!("Logged out");
        Ok(())
    }

    /// Claims of the stored credential, or `None` if there is none, it does
    /// not decode, or it has expired. An expired credential is removed.
    pub async fn current_claims(&self) -> Option<Claims> {
        let token = match self.store.get(TOKEN_KEY).await {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read credential");
                return None;
            }
        };

        let Some(claims) = Claims::decode_unverified(&token) else {
            debug!("Stored credential has no decodable claims");
            return None;
        };

        if claims.is_expired() {
            self.expire().await;
            return None;
        }
        Some(claims)
    }

    pub async fn profile(&self) -> Option<Profile> {
        self.current_claims().await.map(|c| Profile::from_claims(&c))
    }

    /// Current session state, dropping an expired credential on the way.
    ///
    /// A credential whose payload does not decode still counts as
    /// authenticated; the server decides whether it is any good.
    pub async fn state(&self) -> Result<SessionState, AuthError> {
        let Some(token) = self.store.get(TOKEN_KEY).await? else {
            return Ok(SessionState::Anonymous);
        };

        if Claims::decode_unverified(&token).is_some_and(|c| c.is_expired()) {
            self.expire().await;
            return Ok(SessionState::Anonymous);
        }
        Ok(SessionState::Authenticated(Credential(token)))
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state()
            .await
            .map(|s| s.is_authenticated())
            .unwrap_or(false)
    }

    async fn expire(&self) {
        info!("Stored credential has expired, clearing session");
        if let Err(e) = self.store.delete(TOKEN_KEY).await {
            warn!(error = %e, "Failed to clear expired credential");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;
    use std::time::Duration;

    fn manager() -> (SessionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        // Nothing listens here; tests below never reach the network
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1), store.clone())
            .expect("client should build");
        (SessionManager::new(api), store)
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let state = SessionState::Authenticated(Credential("secret.token.value".to_string()));
        let printed = format!("{:?}", state);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("redacted"));
    }

    #[tokio::test]
    async fn test_login_validation_happens_before_network() {
        let (session, _) = manager();
        let err = session.login("", "x").await.unwrap_err();
        assert!(err.is_validation());
        let err = session.login("a@b.com", "").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (session, store) = manager();
        session.logout().await.unwrap();

        store.set(TOKEN_KEY, "a.eyJuYW1lIjoiQWRhbSJ9.sig").await.unwrap();
        session.logout().await.unwrap();
        session.logout().await.unwrap();
        assert!(session.current_claims().await.is_none());
        assert_eq!(session.state().await.unwrap(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_claims_come_from_store() {
        let (session, store) = manager();
        assert!(session.current_claims().await.is_none());

        store.set(TOKEN_KEY, "a.eyJuYW1lIjoiQWRhbSJ9.sig").await.unwrap();
        let claims = session.current_claims().await.expect("claims");
        assert_eq!(claims.name(), Some("Adam"));
        assert!(session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_undecodable_credential_is_authenticated_without_claims() {
        let (session, store) = manager();
        store.set(TOKEN_KEY, "opaque-token").await.unwrap();

        assert!(session.current_claims().await.is_none());
        match session.state().await.unwrap() {
            SessionState::Authenticated(credential) => assert_eq!(credential.as_str(), "opaque-token"),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expired_credential_is_cleared_lazily() {
        let (session, store) = manager();
        // {"name":"Adam","exp":1}
        store
            .set(TOKEN_KEY, "a.eyJuYW1lIjoiQWRhbSIsImV4cCI6MX0.sig")
            .await
            .unwrap();

        assert!(session.current_claims().await.is_none());
        assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
        assert_eq!(session.state().await.unwrap(), SessionState::Anonymous);
    }
}
