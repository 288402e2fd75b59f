use std::time::Duration;

use crate::auth::TOKEN_URL;
use crate::error::AppError;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Timeout applied to every outbound call to Intuit.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Client credentials issued by the Intuit developer portal.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Settings for the OAuth callback service, read once at startup.
#[derive(Debug, Clone)]
pub struct CallbackConfig {
    pub credentials: ClientCredentials,
    pub redirect_uri: String,
    /// When set, `/callback` rejects any `state` that differs from it.
    pub expected_state: Option<String>,
    pub token_url: String,
}

/// Process-level settings that do not depend on OAuth configuration.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub bind_addr: String,
}

impl CallbackConfig {
    /// Loads `.env` (if present) and reads the configuration from the environment.
    pub fn from_env() -> Result<Self, AppError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Failed to load .env file: {e}");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values
    /// count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = get("CLIENT_ID");
        let client_secret = get("CLIENT_SECRET");
        let redirect_uri = get("REDIRECT_URI");

        let missing: Vec<&str> = [
            ("CLIENT_ID", client_id.is_none()),
            ("CLIENT_SECRET", client_secret.is_none()),
            ("REDIRECT_URI", redirect_uri.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();

        match (client_id, client_secret, redirect_uri) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => Ok(Self {
                credentials: ClientCredentials {
                    client_id,
                    client_secret,
                },
                redirect_uri,
                expected_state: get("EXPECTED_STATE"),
                token_url: get("TOKEN_URL").unwrap_or_else(|| TOKEN_URL.to_string()),
            }),
            _ => Err(AppError::Configuration(missing.join(", "))),
        }
    }
}

impl ServiceSettings {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_required_and_optional_values() {
        let config = CallbackConfig::from_lookup(lookup(&[
            ("CLIENT_ID", "id"),
            ("CLIENT_SECRET", "secret"),
            ("REDIRECT_URI", "https://example.com/callback"),
            ("EXPECTED_STATE", "xyz"),
        ]))
        .unwrap();

        assert_eq!(config.credentials.client_id, "id");
        assert_eq!(config.credentials.client_secret, "secret");
        assert_eq!(config.redirect_uri, "https://example.com/callback");
        assert_eq!(config.expected_state.as_deref(), Some("xyz"));
        assert_eq!(config.token_url, TOKEN_URL);
    }

    #[test]
    fn reports_every_missing_key() {
        let err = CallbackConfig::from_lookup(lookup(&[("CLIENT_SECRET", "secret")])).unwrap_err();
        match err {
            AppError::Configuration(keys) => assert_eq!(keys, "CLIENT_ID, REDIRECT_URI"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_values_count_as_missing() {
        let err = CallbackConfig::from_lookup(lookup(&[
            ("CLIENT_ID", "id"),
            ("CLIENT_SECRET", ""),
            ("REDIRECT_URI", "https://example.com/callback"),
            ("EXPECTED_STATE", ""),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(keys) if keys == "CLIENT_SECRET"));
    }
}
