use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdfgen")]
#[command(about = "URL to PDF rendering service backed by headless Chrome")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Address to bind the HTTP server to")]
    pub bind: Option<String>,

    #[arg(long, help = "Base URL of the Chrome DevTools endpoint")]
    pub cdp_host: Option<String>,

    #[arg(long, help = "Number of pooled browser tabs")]
    pub pool_size: Option<usize>,

    #[arg(long, help = "Overall request timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

pub fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    Ok(())
}
