use std::io;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tiny_http::{Header, Method, Request, Response, Server};
use tokio::sync::oneshot;
use url::Url;

use crate::auth::{ACCOUNTING_SCOPE, AUTHORIZE_URL};
use crate::error::AppError;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300);
/// Lets the browser receive the result page before the socket goes away.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub client_id: String,
    /// Registered redirect URI; it must end up forwarding to `port` on this host.
    pub redirect_uri: String,
    pub authorize_url: String,
    pub port: u16,
    pub open_browser: bool,
    pub login_timeout: Duration,
}

impl ServerOptions {
    pub fn new(client_id: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            redirect_uri,
            authorize_url: AUTHORIZE_URL.to_string(),
            port: DEFAULT_PORT,
            open_browser: true,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }
}

/// What the provider sent back through the browser redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    Authorized {
        code: String,
        realm_id: String,
        state: Option<String>,
    },
    Denied {
        error: String,
    },
}

pub struct LoginServer {
    pub auth_url: String,
    pub actual_port: u16,
    shutdown_flag: Arc<AtomicBool>,
    server: Arc<Server>,
    result_rx: oneshot::Receiver<AuthorizationResult>,
    login_timeout: Duration,
}

impl LoginServer {
    /// Waits for the single redirect, bounded by the login timeout.
    pub async fn wait_for_authorization(self) -> Result<AuthorizationResult, AppError> {
        match tokio::time::timeout(self.login_timeout, self.result_rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(AppError::Io(io::Error::other(
                "login server stopped before authorization completed",
            ))),
            Err(_) => {
                shutdown(&self.shutdown_flag, &self.server);
                Err(AppError::Timeout(self.login_timeout.as_secs()))
            }
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown_flag: self.shutdown_flag.clone(),
            server: self.server.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown_flag: Arc<AtomicBool>,
    server: Arc<Server>,
}

impl ShutdownHandle {
    pub fn cancel(&self) {
        shutdown(&self.shutdown_flag, &self.server);
    }

    /// Stops the listener once the returned guard goes out of scope, including
    /// when the future holding it is dropped mid-await.
    pub fn on_drop(self) -> ShutdownGuard {
        ShutdownGuard(self)
    }
}

pub struct ShutdownGuard(ShutdownHandle);

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

fn shutdown(shutdown_flag: &AtomicBool, server: &Server) {
    shutdown_flag.store(true, Ordering::SeqCst);
    server.unblock();
}

/// Binds the local listener, then opens the authorization page in the
/// default browser. The listener runs on its own thread until one relevant
/// redirect arrives or it is cancelled.
pub fn run_login_server(opts: ServerOptions) -> Result<LoginServer, AppError> {
    let server = Server::http(format!("127.0.0.1:{}", opts.port))
        .map_err(|e| AppError::Io(io::Error::new(io::ErrorKind::AddrInUse, e)))?;

    let actual_port = server
        .server_addr()
        .to_ip()
        .map(|addr| addr.port())
        .unwrap_or(opts.port);
    let server = Arc::new(server);
    let shutdown_flag = Arc::new(AtomicBool::new(false));

    let state = generate_state();
    let auth_url = authorization_url(&opts, &state)?;

    let (result_tx, result_rx) = oneshot::channel();
    let server_clone = server.clone();
    let shutdown_flag_clone = shutdown_flag.clone();

    // Detached: it exits on its own after the first relevant redirect or
    // once unblocked by `shutdown`.
    thread::spawn(move || {
        let mut result_tx = Some(result_tx);
        for request in server_clone.incoming_requests() {
            if shutdown_flag_clone.load(Ordering::SeqCst) {
                break;
            }

            match handle_request(request) {
                Ok(Some(result)) => {
                    if let Some(tx) = result_tx.take() {
                        let _ = tx.send(result);
                    }
                    thread::sleep(SHUTDOWN_GRACE);
                    shutdown(&shutdown_flag_clone, &server_clone);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("Error handling request: {e}");
                }
            }
        }
        log::debug!("Local callback listener stopped");
    });

    if opts.open_browser {
        if let Err(e) = webbrowser::open(&auth_url) {
            log::warn!("Failed to open browser: {e}");
        }
    }

    Ok(LoginServer {
        auth_url,
        actual_port,
        shutdown_flag,
        server,
        result_rx,
        login_timeout: opts.login_timeout,
    })
}

/// Builds the Intuit consent URL for the accounting scope.
pub fn authorization_url(opts: &ServerOptions, state: &str) -> Result<String, AppError> {
    let mut auth_url = Url::parse(&opts.authorize_url).map_err(|e| {
        AppError::Configuration(format!("invalid authorize URL {}: {e}", opts.authorize_url))
    })?;

    auth_url
        .query_pairs_mut()
        .append_pair("client_id", &opts.client_id)
        .append_pair("scope", ACCOUNTING_SCOPE)
        .append_pair("redirect_uri", &opts.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("access_type", "offline")
        .append_pair("state", state);

    Ok(auth_url.to_string())
}

/// Correlation value only; this flow never checks it on the way back.
fn generate_state() -> String {
    format!("qbo_items_{}", chrono::Utc::now().timestamp())
}

/// Extracts the authorization outcome from a redirect target such as
/// `/callback?code=..&realmId=..`. Requests that carry neither a code and
/// realm nor an error yield `None`.
pub fn parse_callback(target: &str) -> Option<AuthorizationResult> {
    let parsed_url = Url::parse(&format!("http://localhost{target}")).ok()?;

    let mut code = None;
    let mut realm_id = None;
    let mut state = None;
    let mut error = None;

    for (key, value) in parsed_url.query_pairs() {
        let slot = match key.as_ref() {
            "code" => &mut code,
            "realmId" => &mut realm_id,
            "state" => &mut state,
            "error" => &mut error,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    match (code, realm_id, error) {
        (Some(code), Some(realm_id), _) => Some(AuthorizationResult::Authorized {
            code,
            realm_id,
            state,
        }),
        (_, _, Some(error)) => Some(AuthorizationResult::Denied { error }),
        _ => None,
    }
}

fn handle_request(request: Request) -> io::Result<Option<AuthorizationResult>> {
    // Only the browser's GET redirect counts; anything else gets the waiting page.
    let result = if *request.method() == Method::Get {
        parse_callback(request.url())
    } else {
        None
    };

    let response = match &result {
        Some(AuthorizationResult::Authorized { .. }) => html_response(200, SUCCESS_PAGE.to_string()),
        Some(AuthorizationResult::Denied { error }) => html_response(
            400,
            format!(
                r#"<html><body style="font-family: Arial; text-align: center; padding: 50px;">
<h1 style="color: red;">&#10060; ERROR</h1>
<p>Authorization failed: {}</p>
</body></html>"#,
                html_escape::encode_text(error)
            ),
        ),
        None => {
            log::debug!(
                "Ignoring {} request without authorization data: {}",
                request.method(),
                request.url()
            );
            html_response(200, WAITING_PAGE.to_string())
        }
    };

    request.respond(response)?;
    Ok(result)
}

fn html_response(status: u16, body: String) -> Response<Cursor<Vec<u8>>> {
    let response = Response::from_string(body).with_status_code(status);
    match Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

const SUCCESS_PAGE: &str = r#"<html><body style="font-family: Arial; text-align: center; padding: 50px;">
<h1 style="color: green;">&#9989; SUCCESS!</h1>
<p>Authorization completed successfully.</p>
<p>You can close this window and return to your terminal.</p>
<script>setTimeout(() => window.close(), 3000);</script>
</body></html>"#;

const WAITING_PAGE: &str =
    "<html><body><h1>QuickBooks Authorization</h1><p>Waiting for authorization...</p></body></html>";
