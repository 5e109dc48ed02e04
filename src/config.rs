//! Configuration management with serde serialization/deserialization
//!
//! This module provides all configuration structures for the PDF service,
//! including pool sizing, default timeouts, and the render request/result
//! types that flow through the pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Main configuration structure for the PDF service
///
/// Controls the tab pool size, the browser endpoint, and the default
/// per-request limits applied when a request leaves a field unset.
///
/// # Examples
///
/// ```rust
/// use pdfgen::Config;
///
/// // Use default configuration
/// let config = Config::default();
///
/// // Create custom configuration
/// let config = Config {
///     pool_size: 4,
///     cdp_host: "http://localhost:9222".to_string(),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Number of browser tabs to create at startup (default: 10)
    ///
    /// This bounds the number of render jobs in flight; further requests
    /// queue until a tab frees up.
    pub pool_size: usize,

    /// Base URL of Chromium's remote-debugging JSON API (default: http://localhost:9222)
    pub cdp_host: String,

    /// Address the HTTP server binds to (default: 0.0.0.0:8080)
    pub bind_addr: String,

    /// Default ceiling across an entire render job (default: 120 seconds)
    pub overall_timeout: Duration,

    /// Default budget for page load plus cooperative loading (default: 30 seconds)
    ///
    /// Exhausting it is soft: the job prints anyway and flags
    /// `load_timed_out` on the result.
    pub load_timeout: Duration,

    /// Default budget for the main request's status to arrive (default: 5 seconds)
    pub status_timeout: Duration,

    /// Default budget for the print call itself (default: 10 seconds)
    pub print_timeout: Duration,

    /// Default maximum decoded PDF size in bytes (default: 20 MiB)
    pub max_size: u64,

    /// DOM selector matching cooperative-loading markers that are still
    /// pending (default: `input.pdfloading[value='loading']`)
    ///
    /// A page opts in by carrying such elements; the pipeline holds the
    /// print until none match or the load budget runs out.
    pub loading_selector: String,

    /// Interval between cooperative-loading polls (default: 250 ms)
    pub poll_interval: Duration,

    /// Bound on the reset navigation performed when a tab is returned to
    /// the pool (default: 5 seconds)
    pub reset_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_size: 10,
            cdp_host: "http://localhost:9222".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            overall_timeout: Duration::from_secs(120),
            load_timeout: Duration::from_secs(30),
            status_timeout: Duration::from_secs(5),
            print_timeout: Duration::from_secs(10),
            max_size: 20 * 1024 * 1024,
            loading_selector: "input.pdfloading[value='loading']".to_string(),
            poll_interval: Duration::from_millis(250),
            reset_timeout: Duration::from_secs(5),
        }
    }
}

/// A single render job's inputs
///
/// Unset limits fall back to the corresponding [`Config`] defaults when the
/// job runs. `options` is forwarded verbatim to `Page.printToPDF`.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Trace id attached to every log line this job emits
    pub id: String,
    pub url: String,
    pub max_size: Option<u64>,
    pub timeout: Option<Duration>,
    pub load_timeout: Option<Duration>,
    pub status_timeout: Option<Duration>,
    pub print_timeout: Option<Duration>,
    pub options: Map<String, Value>,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: String::new(),
            max_size: None,
            timeout: None,
            load_timeout: None,
            status_timeout: None,
            print_timeout: None,
            options: Map::new(),
        }
    }
}

/// A successful render
///
/// Failures are reported as [`crate::RenderError`] instead; a result never
/// carries both a document and an error.
#[derive(Debug)]
pub struct RenderResult {
    pub request_id: String,
    pub url: String,
    /// The decoded PDF document
    pub pdf: Vec<u8>,
    /// True when the load budget ran out and the page was printed anyway
    pub load_timed_out: bool,
    pub duration: Duration,
    /// Pool index of the tab that served this job
    pub tab: usize,
}
