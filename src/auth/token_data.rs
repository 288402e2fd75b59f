use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Tokens returned by the Intuit token endpoint.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    /// Pulls both tokens out of a token endpoint body. Any other fields
    /// (`expires_in`, `token_type`, ...) are ignored.
    pub fn from_response(body: &serde_json::Value) -> Result<Self, AppError> {
        let access_token = required_str(body, "access_token")?;
        let refresh_token = required_str(body, "refresh_token")?;
        Ok(Self {
            access_token,
            refresh_token,
        })
    }
}

fn required_str(body: &serde_json::Value, key: &str) -> Result<String, AppError> {
    body.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::InvalidResponse(format!("Missing {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_token_response() {
        let body = json!({
            "access_token": "eyJ.access",
            "refresh_token": "AB11.refresh",
            "token_type": "bearer",
            "expires_in": 3600,
            "x_refresh_token_expires_in": 8726400
        });
        let tokens = TokenPair::from_response(&body).unwrap();
        assert_eq!(tokens.access_token, "eyJ.access");
        assert_eq!(tokens.refresh_token, "AB11.refresh");
    }

    #[test]
    fn rejects_empty_refresh_token() {
        let body = json!({ "access_token": "a", "refresh_token": "" });
        let err = TokenPair::from_response(&body).unwrap_err();
        assert!(matches!(err, AppError::InvalidResponse(msg) if msg == "Missing refresh_token"));
    }

    #[test]
    fn rejects_missing_access_token() {
        let body = json!({ "refresh_token": "r" });
        assert!(TokenPair::from_response(&body).is_err());
    }
}
