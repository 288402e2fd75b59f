use anyhow::Context;
use qbo_connect::callback::{router, CallbackState};
use qbo_connect::config::{CallbackConfig, ServiceSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = CallbackConfig::from_env();
    if let Err(e) = &config {
        // Keep serving health checks; /callback reports the problem per request.
        log::error!("{e}");
    }
    let settings = ServiceSettings::from_env();

    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let app = router(CallbackState::new(config, http));

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    log::info!("QuickBooks callback service listening on {}", settings.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
