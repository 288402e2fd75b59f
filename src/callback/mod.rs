pub mod handler;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::config::CallbackConfig;
use crate::error::AppError;

pub use handler::{callback, is_dry_run, CallbackParams};

/// Shared state for the callback routes.
#[derive(Clone)]
pub struct CallbackState {
    /// `Err` holds the names of the missing settings; `/callback` answers 500
    /// until the service is restarted with them.
    config: Arc<Result<CallbackConfig, String>>,
    http: reqwest::Client,
}

impl CallbackState {
    pub fn new(config: Result<CallbackConfig, AppError>, http: reqwest::Client) -> Self {
        let config = config.map_err(|e| match e {
            AppError::Configuration(keys) => keys,
            other => other.to_string(),
        });
        Self {
            config: Arc::new(config),
            http,
        }
    }

    pub fn config(&self) -> Result<&CallbackConfig, AppError> {
        match &*self.config {
            Ok(config) => Ok(config),
            Err(keys) => Err(AppError::Configuration(keys.clone())),
        }
    }
}

pub fn router(state: CallbackState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/healthz", get(health))
        .route("/callback", get(callback))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
