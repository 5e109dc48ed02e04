use anyhow::Context;
use clap::Parser;
use pdfgen::{
    setup_logging, AppState, CdpClient, Cli, Config, HealthProber, Metrics, RenderService, TabPool,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose).map_err(|e| anyhow::anyhow!("{e}"))?;

    info!("Starting pdfgen v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;

    // Resolve the browser websocket endpoint from the DevTools HTTP API.
    let ws_url = discover_websocket_url(&config.cdp_host).await?;
    info!("Connecting to browser at {}", ws_url);

    let client = Arc::new(CdpClient::connect(&ws_url).await?);
    let pool = Arc::new(TabPool::new(client.clone(), &config).await?);
    info!("Tab pool ready ({} tabs)", pool.size());

    let service = Arc::new(RenderService::new(
        client.clone(),
        pool.clone(),
        config.clone(),
        Arc::new(Metrics::new()),
    ));
    let prober = Arc::new(HealthProber::new(client));

    let state = AppState { service, prober };

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel(1);
    let _shutdown_handler = setup_shutdown_handler(shutdown_tx.clone());

    let result = tokio::select! {
        result = pdfgen::server::serve(state, &config.bind_addr) => {
            info!("Server stopped");
            result
        }
        _ = shutdown_rx.recv() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    info!("Shutting down...");
    pool.shutdown().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        std::process::exit(1);
    }

    info!("pdfgen stopped");
    Ok(())
}

async fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        let config_content = tokio::fs::read_to_string(config_path)
            .await
            .with_context(|| format!("reading config file {}", config_path.display()))?;
        serde_json::from_str(&config_content)?
    } else {
        Config::default()
    };

    // Override with CLI arguments
    if let Some(bind) = &args.bind {
        config.bind_addr = bind.clone();
    }

    if let Some(cdp_host) = &args.cdp_host {
        config.cdp_host = cdp_host.clone();
    }

    if let Some(pool_size) = args.pool_size {
        config.pool_size = pool_size;
    }

    if let Some(timeout) = args.timeout {
        config.overall_timeout = Duration::from_secs(timeout);
    }

    validate_config(&config)?;

    info!("Configuration loaded successfully");
    info!("Pool size: {}", config.pool_size);
    info!("Overall timeout: {:?}", config.overall_timeout);
    info!("Maximum PDF size: {} bytes", config.max_size);

    Ok(config)
}

fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.pool_size == 0 {
        anyhow::bail!("Pool size must be greater than 0");
    }

    if config.overall_timeout.is_zero() {
        anyhow::bail!("Overall timeout must be greater than 0");
    }

    if config.max_size == 0 {
        anyhow::bail!("Maximum PDF size must be greater than 0");
    }

    if config.loading_selector.is_empty() {
        anyhow::bail!("Loading selector must not be empty");
    }

    Ok(())
}

/// Ask the DevTools HTTP API for the browser-level websocket endpoint.
async fn discover_websocket_url(cdp_host: &str) -> anyhow::Result<String> {
    let version_url = format!("{}/json/version", cdp_host.trim_end_matches('/'));
    let response: serde_json::Value = reqwest::get(&version_url)
        .await
        .with_context(|| format!("querying {version_url}"))?
        .json()
        .await?;

    response["webSocketDebuggerUrl"]
        .as_str()
        .map(str::to_string)
        .context("DevTools version response missing webSocketDebuggerUrl")
}

fn setup_shutdown_handler(
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .expect("Failed to create SIGINT handler");
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to create SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }

        let _ = shutdown_tx.send(());
    })
}
