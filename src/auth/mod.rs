pub mod oauth_server;
pub mod token_data;
pub mod token_exchange;

pub use oauth_server::{
    authorization_url, run_login_server, AuthorizationResult, LoginServer, ServerOptions,
    ShutdownGuard, ShutdownHandle,
};
pub use token_data::TokenPair;
pub use token_exchange::exchange_authorization_code;

// Intuit OAuth2 endpoints (production and sandbox share them)
pub const AUTHORIZE_URL: &str = "https://appcenter.intuit.com/connect/oauth2";
pub const TOKEN_URL: &str = "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer";
pub const ACCOUNTING_SCOPE: &str = "com.intuit.quickbooks.accounting";
