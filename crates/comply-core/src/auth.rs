//! Authentication settings and header construction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    None,
    Bearer,
}

/// Credentials presented to a Compliant Application.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type", default)]
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AuthConfig {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Bearer,
            token: Some(token.into()),
        }
    }
}

// Tokens never appear in logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("auth_type", &self.auth_type)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Validates credentials and turns them into request headers.
pub struct AuthManager;

impl AuthManager {
    /// Checks that a bearer token is usable in an `Authorization` header.
    pub fn validate_token(token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(ConsoleError::connection("bearer token must not be empty"));
        }
        if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ConsoleError::connection(
                "bearer token must not contain whitespace or control characters",
            ));
        }
        Ok(())
    }

    /// Validates a complete auth configuration.
    pub fn validate(auth: &AuthConfig) -> Result<()> {
        match auth.auth_type {
            AuthType::None => Ok(()),
            AuthType::Bearer => Self::validate_token(auth.token.as_deref().unwrap_or_default()),
        }
    }

    /// Returns the `Authorization` header value, if the auth type sends one.
    pub fn create_auth_header(auth: &AuthConfig) -> Option<String> {
        match (auth.auth_type, auth.token.as_deref()) {
            (AuthType::Bearer, Some(token)) => Some(format!("Bearer {token}")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        let auth = AuthConfig::bearer("abc123");
        assert_eq!(
            AuthManager::create_auth_header(&auth),
            Some("Bearer abc123".to_string())
        );
        assert_eq!(AuthManager::create_auth_header(&AuthConfig::none()), None);
    }

    #[test]
    fn test_token_validation() {
        assert!(AuthManager::validate(&AuthConfig::bearer("ok-token")).is_ok());
        assert!(AuthManager::validate(&AuthConfig::bearer("")).is_err());
        assert!(AuthManager::validate(&AuthConfig::bearer("two words")).is_err());
        assert!(AuthManager::validate(&AuthConfig::none()).is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", AuthConfig::bearer("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let auth: AuthConfig = toml::from_str("type = \"bearer\"\ntoken = \"t\"").unwrap();
        assert_eq!(auth, AuthConfig::bearer("t"));
    }
}
