use crate::{CdpClient, RenderError};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Liveness probe for the shared browser connection
///
/// Issues one cheap `Browser.getVersion` round trip through the protocol
/// client. Health checks never take a tab from the pool, so they cannot
/// compete with render jobs for capacity.
pub struct HealthProber {
    client: Arc<CdpClient>,
}

/// What the browser reported about itself on the last successful probe
#[derive(Debug, Clone)]
pub struct BrowserVersion {
    pub product: String,
    pub protocol_version: String,
}

impl HealthProber {
    pub fn new(client: Arc<CdpClient>) -> Self {
        Self { client }
    }

    /// One round trip; any failure (timeout, protocol error, dropped
    /// connection) maps to `Unhealthy`.
    pub async fn probe(&self, timeout: Duration) -> Result<BrowserVersion, RenderError> {
        let resp = self
            .client
            .call(None, "Browser.getVersion", json!({}), timeout)
            .await
            .map_err(|e| {
                warn!("Health probe failed: {}", e);
                RenderError::Unhealthy(e.to_string())
            })?;

        let version = BrowserVersion {
            product: resp
                .get("product")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            protocol_version: resp
                .get("protocolVersion")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        };
        debug!("Health probe OK: {}", version.product);
        Ok(version)
    }
}
