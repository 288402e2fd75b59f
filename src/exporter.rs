use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::{
    exchange_authorization_code, run_login_server, AuthorizationResult, ServerOptions,
};
use crate::config::ClientCredentials;
use crate::error::AppError;
use crate::items::{export_batch, normalize, ExportPaths, ExportSummary, QboClient};

#[derive(Debug, Clone)]
pub struct ExporterOptions {
    pub credentials: ClientCredentials,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
    pub port: u16,
    pub open_browser: bool,
    pub login_timeout: Duration,
    pub page_size: u32,
    pub output_dir: PathBuf,
}

#[derive(Debug)]
pub struct ExportReport {
    pub paths: ExportPaths,
    pub summary: ExportSummary,
    /// Set when pagination stopped on an error; the files hold the pages
    /// fetched before it.
    pub fetch_error: Option<AppError>,
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(50));
    println!("{title}");
    println!("{}", "=".repeat(50));
}

/// Runs the whole flow: browser consent, token exchange, item download and
/// export.
pub async fn run(opts: &ExporterOptions) -> Result<ExportReport, AppError> {
    banner("STEP 1: GETTING AUTHORIZATION");
    let (code, realm_id) = authorize(opts).await?;
    println!("Authorization successful!");
    println!("Company ID: {realm_id}");

    banner("STEP 2: GETTING ACCESS TOKEN");
    let http = reqwest::Client::new();
    let tokens = exchange_authorization_code(
        &http,
        &opts.token_url,
        &opts.credentials,
        &code,
        &opts.redirect_uri,
    )
    .await?;
    println!("Access token obtained!");

    banner("STEP 3: DOWNLOADING ALL ITEMS");
    let client = QboClient::new(http, &opts.api_base, &realm_id, &tokens.access_token);
    let report = fetch_and_export(&client, opts.page_size, &opts.output_dir).await?;

    print_summary(&report);
    Ok(report)
}

/// Runs the flow until it finishes or `cancel` resolves, whichever comes
/// first. Cancelling drops the in-flight step; an open listener is shut down
/// with it.
pub async fn run_until<C>(opts: &ExporterOptions, cancel: C) -> Result<ExportReport, AppError>
where
    C: Future<Output = ()>,
{
    tokio::select! {
        result = run(opts) => result,
        _ = cancel => Err(AppError::Cancelled),
    }
}

async fn authorize(opts: &ExporterOptions) -> Result<(String, String), AppError> {
    let server_opts = ServerOptions {
        authorize_url: opts.authorize_url.clone(),
        port: opts.port,
        open_browser: opts.open_browser,
        login_timeout: opts.login_timeout,
        ..ServerOptions::new(
            opts.credentials.client_id.clone(),
            opts.redirect_uri.clone(),
        )
    };

    let server = run_login_server(server_opts)?;
    let _listener = server.shutdown_handle().on_drop();
    println!(
        "Listening for the redirect on http://localhost:{}.",
        server.actual_port
    );
    println!("If your browser did not open, copy this URL:\n   {}", server.auth_url);
    println!("\nWaiting for authorization...");

    let result = server.wait_for_authorization().await?;

    match result {
        AuthorizationResult::Authorized { code, realm_id, .. } => Ok((code, realm_id)),
        AuthorizationResult::Denied { error } => Err(AppError::AuthorizationDenied(error)),
    }
}

/// Downloads every item, normalizes and writes both export files. A query
/// failure mid-way still exports what was fetched.
pub async fn fetch_and_export(
    client: &QboClient,
    page_size: u32,
    output_dir: &Path,
) -> Result<ExportReport, AppError> {
    let fetch = client
        .fetch_all_items(page_size, |start, count| {
            println!("Fetched {count} items starting from position {start}");
        })
        .await;

    if let Some(e) = &fetch.error {
        eprintln!("API Error: {e}");
    }
    println!("Downloaded {} total items", fetch.items.len());

    banner("STEP 4: PROCESSING AND SAVING DATA");
    let records = normalize(fetch.items);
    let paths = export_batch(output_dir, &records)?;
    println!("Files saved:");
    println!("   CSV: {}", paths.csv.display());
    println!("   JSON: {}", paths.json.display());

    Ok(ExportReport {
        paths,
        summary: ExportSummary::from_records(&records),
        fetch_error: fetch.error,
    })
}

pub fn print_summary(report: &ExportReport) {
    let summary = &report.summary;
    banner("SUMMARY");
    println!("Total Items: {}", summary.total);
    println!("Active Items: {}", summary.active);
    println!("Inactive Items: {}", summary.inactive);
    println!("\nItems by Type:");
    for (item_type, count) in &summary.by_type {
        println!("   {item_type}: {count}");
    }

    let csv_name = report
        .paths
        .csv
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("\nNEXT STEPS:");
    println!("1. Open {csv_name} in a spreadsheet");
    println!("2. Use the 'QBO_ID' column for mapping");
    println!("3. Match item names between the two systems");
}
