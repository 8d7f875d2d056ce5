//! Profile details shown in the app header and profile screen.

use serde::Serialize;

use crate::auth::Claims;

/// Greeting shown when the token carries no name
const FALLBACK_GREETING: &str = "Přehled & grafy";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Profile {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Profile {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            name: claims.name().map(str::to_string),
            email: claims.email().map(str::to_string),
        }
    }

    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }

    /// Up to two uppercase initials from the name, else the email, else "?".
    pub fn initials(&self) -> String {
        let source = Self::non_empty(&self.name)
            .or_else(|| Self::non_empty(&self.email))
            .unwrap_or("?");

        source
            .split(' ')
            .filter_map(|part| part.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }

    pub fn greeting(&self) -> String {
        match Self::non_empty(&self.name) {
            Some(name) => format!("Vítej, {}", name),
            None => FALLBACK_GREETING.to_string(),
        }
    }
}
