use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;

use crate::auth::exchange_authorization_code;
use crate::callback::CallbackState;
use crate::error::AppError;

/// `code` value Intuit never issues; lets operators test the route by hand.
pub const DRY_RUN_CODE: &str = "test";

/// Query parameters Intuit appends to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "realmId")]
    pub realm_id: Option<String>,
    pub dryrun: Option<String>,
}

pub fn is_dry_run(dryrun: Option<&str>, code: &str) -> bool {
    matches!(dryrun, Some("1" | "true" | "yes")) || code == DRY_RUN_CODE
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// GET /callback
///
/// Completes one authorization-code grant. Nothing is persisted; the tokens
/// only go to the log for now.
pub async fn callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>, AppError> {
    let config = state.config()?;

    let (code, oauth_state, realm_id) = match (
        non_empty(params.code),
        non_empty(params.state),
        non_empty(params.realm_id),
    ) {
        (Some(code), Some(oauth_state), Some(realm_id)) => (code, oauth_state, realm_id),
        _ => {
            return Err(AppError::Validation(
                "Missing OAuth params (code, state, realmId).".to_string(),
            ))
        }
    };

    if let Some(expected) = &config.expected_state {
        if oauth_state != *expected {
            log::warn!("Rejected callback with unexpected state for realm {realm_id}");
            return Err(AppError::Validation("State mismatch.".to_string()));
        }
    }

    if is_dry_run(params.dryrun.as_deref(), &code) {
        log::info!("Dry-run callback for realm {realm_id}");
        return Ok(Html(format!(
            "<h2>QuickBooks authorization page reached (dry run)</h2>\
             <p>realmId={}</p>\
             <p>No token exchange attempted.</p>",
            html_escape::encode_text(&realm_id)
        )));
    }

    let tokens = exchange_authorization_code(
        &state.http,
        &config.token_url,
        &config.credentials,
        &code,
        &config.redirect_uri,
    )
    .await?;

    // Placeholder until tokens go to a secret store.
    log::info!("Realm ID: {realm_id}");
    log::info!("Access Token: {}", tokens.access_token);
    log::info!("Refresh Token: {}", tokens.refresh_token);

    Ok(Html(
        "<h2>QuickBooks authorization complete</h2>\
         <p>You can close this window now.</p>"
            .to_string(),
    ))
}
