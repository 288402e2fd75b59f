use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use qbo_connect::auth::{AUTHORIZE_URL, TOKEN_URL};
use qbo_connect::config::ClientCredentials;
use qbo_connect::exporter::{self, ExporterOptions};
use qbo_connect::items::{DEFAULT_API_BASE, DEFAULT_PAGE_SIZE};
use qbo_connect::AppError;

/// Download every QuickBooks Online item to CSV and JSON.
#[derive(Debug, Parser)]
#[command(name = "qbo-items", version)]
struct Cli {
    /// OAuth client ID (prompted when absent)
    #[arg(long, env = "QBO_CLIENT_ID", hide_env_values = true)]
    client_id: Option<String>,

    /// OAuth client secret (prompted when absent)
    #[arg(long, env = "QBO_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Redirect URI registered for the app; must forward to --port
    #[arg(long, env = "QBO_REDIRECT_URI", default_value = "http://localhost:8080/callback")]
    redirect_uri: String,

    /// Local port for the redirect listener
    #[arg(long, default_value_t = 8080)]
    port: u16,

    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// Seconds to wait for the browser authorization
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,

    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Print the authorization URL without opening a browser
    #[arg(long)]
    no_browser: bool,
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn value_or_prompt(value: Option<String>, label: &str) -> io::Result<String> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) => Ok(v),
        None => prompt(label),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    println!("{}", "=".repeat(60));
    println!("    QUICKBOOKS ONLINE ITEMS EXTRACTOR");
    println!("{}", "=".repeat(60));
    println!();

    let client_id = value_or_prompt(cli.client_id, "Client ID")?;
    let client_secret = value_or_prompt(cli.client_secret, "Client Secret")?;
    if client_id.is_empty() || client_secret.is_empty() {
        eprintln!("Error: Both Client ID and Client Secret are required");
        std::process::exit(1);
    }

    let opts = ExporterOptions {
        credentials: ClientCredentials {
            client_id,
            client_secret,
        },
        redirect_uri: cli.redirect_uri,
        authorize_url: AUTHORIZE_URL.to_string(),
        token_url: TOKEN_URL.to_string(),
        api_base: cli.api_base,
        port: cli.port,
        open_browser: !cli.no_browser,
        login_timeout: Duration::from_secs(cli.timeout_secs),
        page_size: cli.page_size,
        output_dir: cli.output_dir,
    };

    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            log::warn!("Could not listen for Ctrl-C; the export cannot be interrupted");
            std::future::pending::<()>().await;
        }
    };

    match exporter::run_until(&opts, interrupted).await {
        Ok(report) => {
            if report.fetch_error.is_some() {
                eprintln!("\nExport is incomplete: the item download stopped early.");
                std::process::exit(1);
            }
            println!("\nCOMPLETE! Your QuickBooks items are ready for mapping.");
            Ok(())
        }
        Err(AppError::Cancelled) => {
            eprintln!("\nProcess cancelled by user");
            std::process::exit(130);
        }
        Err(e) => {
            eprintln!("\nError: {e}");
            if matches!(e, AppError::VendorRejection { .. } | AppError::AuthorizationDenied(_)) {
                eprintln!("Please check your credentials and try again.");
            }
            std::process::exit(1);
        }
    }
}
