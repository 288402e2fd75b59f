use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised by the callback service and the item exporter.
#[derive(Error, Debug)]
pub enum AppError {
    /// Required settings are absent.
    #[error("Server is missing configuration: {0}")]
    Configuration(String),

    /// Missing or mismatched request parameters.
    #[error("{0}")]
    Validation(String),

    /// Transport failure while talking to Intuit.
    #[error("Network error contacting Intuit: {0}")]
    Network(#[from] reqwest::Error),

    /// Intuit answered with a non-success status.
    #[error("Intuit returned {status}: {body}")]
    VendorRejection { status: u16, body: String },

    /// Intuit answered 200 but the body was not what we expect.
    #[error("Unexpected response from Intuit: {0}")]
    InvalidResponse(String),

    /// The operator never completed the browser authorization.
    #[error("No authorization received after {0} seconds")]
    Timeout(u64),

    #[error("Authorization failed: {0}")]
    AuthorizationDenied(String),

    #[error("Process cancelled by user")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::VendorRejection { .. } => StatusCode::BAD_REQUEST,
            AppError::Network(_) | AppError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            AppError::Configuration(_)
            | AppError::Cancelled
            | AppError::Io(_)
            | AppError::Csv(_)
            | AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            // Surface the vendor's text untouched so redirect-URI mismatches,
            // reused codes and bad keys are visible to whoever hit the endpoint.
            AppError::VendorRejection { body, .. } => format!("Error exchanging code: {body}"),
            other => other.to_string(),
        };
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_rejection_is_a_client_error_with_raw_body() {
        let err = AppError::VendorRejection {
            status: 400,
            body: r#"{"error":"invalid_grant"}"#.to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn configuration_error_names_missing_keys() {
        let err = AppError::Configuration("CLIENT_ID, REDIRECT_URI".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Server is missing configuration: CLIENT_ID, REDIRECT_URI"
        );
    }
}
