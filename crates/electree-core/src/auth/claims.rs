//! Display-only decoding of JWT payloads.
//!
//! Nothing here checks a signature. [`Claims`] is good for a greeting or an
//! avatar, never for deciding what a user may do.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Unverified claims read out of a token's payload segment.
///
/// Every claim is optional; accessors return `None` for missing or
/// mistyped values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Decode the payload segment of `token`.
    ///
    /// Returns `None` when the token has no second segment, the segment is
    /// not base64, or it does not hold a JSON object.
    pub fn decode_unverified(token: &str) -> Option<Self> {
        let segment = token.split('.').nth(1)?;
        let standard: String = segment
            .trim_end_matches('=')
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                other => other,
            })
            .collect();

        let bytes = STANDARD_NO_PAD.decode(standard.as_bytes()).ok()?;
        match serde_json::from_slice::<Value>(&bytes).ok()? {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    /// Subject id; numeric subjects are rendered as strings.
    pub fn subject(&self) -> Option<String> {
        match self.0.get("sub")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("iat")
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("exp")
    }

    /// A token without `exp` never counts as expired here.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|exp| exp <= now).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        let secs = match self.0.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
            _ => return None,
        };
        Utc.timestamp_opt(secs, 0).single()
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Duration;

    fn token_with(payload: &Value) -> String {
        let encoded = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", encoded)
    }

    #[test]
    fn test_decode_name_claim() {
        let claims = Claims::decode_unverified("a.eyJuYW1lIjoiQWRhbSJ9.sig").expect("claims");
        assert_eq!(claims.name(), Some("Adam"));
        assert_eq!(claims.email(), None);
        assert_eq!(claims.as_map().len(), 1);
    }

    #[test]
    fn test_decode_requires_payload_segment() {
        assert!(Claims::decode_unverified("").is_none());
        assert!(Claims::decode_unverified("onlyonesegment").is_none());
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        assert!(Claims::decode_unverified("a.!!!not-base64!!!.sig").is_none());
        assert!(Claims::decode_unverified("a.e.sig").is_none());
    }

    #[test]
    fn test_decode_rejects_non_json_and_non_object() {
        let not_json = URL_SAFE_NO_PAD.encode("hello there");
        assert!(Claims::decode_unverified(&format!("a.{}.b", not_json)).is_none());

        let array = URL_SAFE_NO_PAD.encode("[1,2,3]");
        assert!(Claims::decode_unverified(&format!("a.{}.b", array)).is_none());
    }

    #[test]
    fn test_decode_handles_url_safe_alphabet_and_padding() {
        // Payload of {"name":"???>>>"} contains both '_' and '-' plus padding
        let claims = Claims::decode_unverified("a.eyJuYW1lIjoiPz8_Pj4-In0=.sig").expect("claims");
        assert_eq!(claims.name(), Some("???>>>"));

        let claims = Claims::decode_unverified("a.eyJuYW1lIjoiPz8_Pj4-In0.sig").expect("claims");
        assert_eq!(claims.name(), Some("???>>>"));

        let payload = serde_json::json!({"name": "Žofie", "email": "z@x.cz"});
        let claims = Claims::decode_unverified(&token_with(&payload)).expect("claims");
        assert_eq!(claims.name(), Some("Žofie"));
        assert_eq!(claims.email(), Some("z@x.cz"));
    }

    #[test]
    fn test_two_segment_token_still_decodes() {
        let encoded = URL_SAFE_NO_PAD.encode(r#"{"email":"a@b.com"}"#);
        let claims = Claims::decode_unverified(&format!("header.{}", encoded)).expect("claims");
        assert_eq!(claims.email(), Some("a@b.com"));
    }

    #[test]
    fn test_subject_accepts_string_or_number() {
        let claims = Claims::decode_unverified(&token_with(&serde_json::json!({"sub": 42}))).unwrap();
        assert_eq!(claims.subject().as_deref(), Some("42"));

        let claims = Claims::decode_unverified(&token_with(&serde_json::json!({"sub": "u-7"}))).unwrap();
        assert_eq!(claims.subject().as_deref(), Some("u-7"));
    }

    #[test]
    fn test_mistyped_claims_are_absent() {
        let claims =
            Claims::decode_unverified(&token_with(&serde_json::json!({"name": 5, "exp": "soon"}))).unwrap();
        assert_eq!(claims.name(), None);
        assert_eq!(claims.expires_at(), None);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let past = (now - Duration::minutes(5)).timestamp();
        let future = (now + Duration::hours(1)).timestamp();

        let expired = Claims::decode_unverified(&token_with(&serde_json::json!({"exp": past}))).unwrap();
        assert!(expired.is_expired_at(now));

        let valid = Claims::decode_unverified(&token_with(&serde_json::json!({"exp": future}))).unwrap();
        assert!(!valid.is_expired_at(now));
        assert_eq!(valid.expires_at().map(|t| t.timestamp()), Some(future));
    }
}
