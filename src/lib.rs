//! # pdfgen
//!
//! A URL-to-PDF rendering service backed by headless Chrome. One shared
//! DevTools websocket carries all protocol traffic; a fixed pool of
//! pre-created tabs serves requests concurrently, and every request runs
//! under a single overall deadline threaded through each pipeline stage.
//!
//! ## Pipeline
//!
//! A request moves through acquire → navigate → load-wait → status check →
//! cooperative poll → print → capture. The load budget is soft (an
//! unfinished page is printed anyway, flagged `load_timed_out`); the status,
//! print, and overall budgets are hard failures. Pages can hold off printing
//! by exposing `input.pdfloading[value='loading']` markers, which are polled
//! until they clear or the load budget runs out.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfgen::{CdpClient, Config, Metrics, RenderRequest, RenderService, TabPool};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let client = Arc::new(CdpClient::connect("ws://localhost:9222/devtools/browser/abc").await?);
//!     let pool = Arc::new(TabPool::new(client.clone(), &config).await?);
//!     let service = RenderService::new(client, pool, config, Arc::new(Metrics::new()));
//!
//!     let request = RenderRequest {
//!         url: "https://example.com".to_string(),
//!         ..Default::default()
//!     };
//!     let result = service.render(request).await?;
//!     println!("PDF captured: {} bytes", result.pdf.len());
//!     Ok(())
//! }
//! ```
//!
//! ## HTTP Usage
//!
//! ```bash
//! curl -X POST localhost:8080/ -d '{"url": "https://example.com"}'
//! ```

/// Configuration and request/result types
pub mod config;

/// Error types and error handling utilities
pub mod error;

/// Correlating DevTools protocol client over one shared websocket
pub mod cdp;

/// Fixed-size pool of pre-created browser tabs
pub mod pool;

/// Render job controller driving the URL-to-PDF pipeline
pub mod render;

/// Size-bounded PDF capture decoding
pub mod capture;

/// Browser health probing
pub mod health;

/// HTTP front end
pub mod server;

/// Command-line interface
pub mod cli;

/// Performance metrics handles
pub mod metrics;

/// Utility functions and helpers
pub mod utils;

#[cfg(test)]
mod tests;

pub use capture::*;
pub use cdp::*;
pub use cli::*;
pub use config::*;
pub use error::*;
pub use health::*;
pub use metrics::*;
pub use pool::*;
pub use render::*;
pub use server::*;
pub use utils::*;
