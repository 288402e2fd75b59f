use crate::auth::token_data::TokenPair;
use crate::config::{ClientCredentials, HTTP_TIMEOUT};
use crate::error::AppError;

/// Exchanges a one-time authorization code for a token pair.
///
/// Single attempt, no retry: a code can only be redeemed once, so a failed
/// request has to be restarted from the browser.
pub async fn exchange_authorization_code(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &ClientCredentials,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenPair, AppError> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
    ];

    let response = client
        .post(token_url)
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&params)
        .timeout(HTTP_TIMEOUT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        log::warn!("Token exchange rejected with status {status}");
        return Err(AppError::VendorRejection {
            status: status.as_u16(),
            body,
        });
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| AppError::InvalidResponse(e.to_string()))?;
    TokenPair::from_response(&body)
}
