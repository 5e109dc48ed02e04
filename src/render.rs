//! Render job controller orchestrating the URL-to-PDF pipeline
//!
//! One `render` call drives a single request through
//! acquire → navigate → load-wait → status check → cooperative poll →
//! print → capture, with one overall deadline threaded through every stage.
//! The borrowed tab is released back to the pool on every exit path.

use crate::{
    capture, validate_url, CdpClient, Config, EventStream, Metrics, RenderError, RenderRequest,
    RenderResult, Session, Stage, TabPool,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Bound on individual protocol round trips that have no stage budget of
/// their own (frame tree, navigate response).
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request deadline, threaded through each stage so a stage-local
/// wait can never outlive the request.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    total: Duration,
}

impl Deadline {
    fn after(total: Duration) -> Self {
        Self {
            at: Instant::now() + total,
            total,
        }
    }

    fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    fn cap(&self, stage: Duration) -> Duration {
        stage.min(self.remaining())
    }

    fn expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// Effective per-request limits after falling back to config defaults.
struct Limits {
    overall: Duration,
    load: Duration,
    status: Duration,
    print: Duration,
    max_size: u64,
}

/// The rendering service shared by all inbound requests
///
/// # Examples
///
/// ```rust,no_run
/// use pdfgen::{CdpClient, Config, Metrics, RenderRequest, RenderService, TabPool};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let client = Arc::new(CdpClient::connect("ws://localhost:9222/devtools/browser/abc").await?);
///     let pool = Arc::new(TabPool::new(client.clone(), &config).await?);
///     let service = RenderService::new(client, pool, config, Arc::new(Metrics::new()));
///
///     let request = RenderRequest {
///         url: "https://example.com".to_string(),
///         ..Default::default()
///     };
///     let result = service.render(request).await?;
///     println!("PDF captured: {} bytes", result.pdf.len());
///     Ok(())
/// }
/// ```
pub struct RenderService {
    client: Arc<CdpClient>,
    pool: Arc<TabPool>,
    config: Config,
    metrics: Arc<Metrics>,
}

impl RenderService {
    pub fn new(
        client: Arc<CdpClient>,
        pool: Arc<TabPool>,
        config: Config,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            client,
            pool,
            config,
            metrics,
        }
    }

    pub fn pool(&self) -> &Arc<TabPool> {
        &self.pool
    }

    pub fn client(&self) -> &Arc<CdpClient> {
        &self.client
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Render one request to a PDF.
    ///
    /// Every failure is returned as a typed [`RenderError`]; the borrowed
    /// tab has always been returned to the pool by the time this resolves.
    pub async fn render(&self, request: RenderRequest) -> Result<RenderResult, RenderError> {
        let started = Instant::now();
        let result = self.render_inner(&request, started).await;

        match &result {
            Ok(res) => {
                self.metrics.record_render(started.elapsed(), true);
                self.metrics.record_pdf_size(res.pdf.len());
                info!(
                    "[{}] PDF generated for {} ({} bytes, load_timed_out={})",
                    request.id,
                    request.url,
                    res.pdf.len(),
                    res.load_timed_out
                );
            }
            Err(e) => {
                self.metrics.record_render(started.elapsed(), false);
                warn!("[{}] Render failed for {}: {}", request.id, request.url, e);
            }
        }

        result
    }

    async fn render_inner(
        &self,
        request: &RenderRequest,
        started: Instant,
    ) -> Result<RenderResult, RenderError> {
        validate_url(&request.url)?;

        let limits = self.resolve_limits(request);
        let deadline = Deadline::after(limits.overall);

        // ACQUIRING
        let session = self
            .pool
            .acquire(deadline.remaining())
            .await
            .map_err(|e| match e {
                RenderError::AcquireTimeout(_) => RenderError::AcquireTimeout(limits.overall),
                other => other,
            })?;
        let tab = session.tab().id;
        self.metrics
            .record_pool_usage(self.pool.size() - self.pool.available().await, self.pool.size());

        let outcome = self.drive(&session, request, &limits, deadline).await;

        // Release on every path before the result is delivered.
        self.pool.release(session).await;

        let (pdf, load_timed_out) = outcome?;
        Ok(RenderResult {
            request_id: request.id.clone(),
            url: request.url.clone(),
            pdf,
            load_timed_out,
            duration: started.elapsed(),
            tab,
        })
    }

    async fn drive(
        &self,
        session: &Session,
        request: &RenderRequest,
        limits: &Limits,
        deadline: Deadline,
    ) -> Result<(Vec<u8>, bool), RenderError> {
        let trace = &request.id;

        // NAVIGATING
        check(deadline, Stage::Navigating)?;
        let ftree = session
            .call("Page.getFrameTree", json!({}), deadline.cap(CALL_TIMEOUT))
            .await
            .map_err(|e| staged(deadline, Stage::Navigating, e))?;
        let frame_id = ftree["frameTree"]["frame"]["id"]
            .as_str()
            .ok_or_else(|| RenderError::Protocol {
                method: "Page.getFrameTree".to_string(),
                message: "response missing main frame id".to_string(),
            })?
            .to_string();

        // Subscribe before navigating: Network.requestWillBeSent arrives
        // before the Page.navigate response does.
        let load_events = session.subscribe(&["Page.loadEventFired"]);
        let watcher = FrameWatcher::new(session, frame_id.clone());

        debug!(
            "[{}] Navigating frame {} to {}",
            trace, frame_id, request.url
        );
        let nav = session
            .call(
                "Page.navigate",
                json!({ "url": request.url, "frameId": frame_id }),
                deadline.cap(CALL_TIMEOUT),
            )
            .await
            .map_err(|e| staged(deadline, Stage::Navigating, e))?;
        if let Some(err_text) = nav.get("errorText").and_then(Value::as_str) {
            return Err(RenderError::Navigation {
                message: format!("Main URL failed to load: {err_text}"),
                url: Some(request.url.clone()),
                code: None,
            });
        }

        // LOAD_WAIT. The budget is shared with the cooperative loop below
        // and exhausting it is soft: the page is printed anyway.
        let load_deadline = Deadline::after(deadline.cap(limits.load));

        let load_timed_out = if self.wait_for_load(load_events, session, load_deadline).await {
            debug!("[{}] Page finished loading", trace);

            // Status check: the response should already be buffered long
            // before the load event fires.
            check(deadline, Stage::StatusWait)?;
            let response = tokio::time::timeout(
                deadline.cap(limits.status),
                watcher.response(),
            )
            .await
            .map_err(|_| {
                staged(
                    deadline,
                    Stage::StatusWait,
                    RenderError::StatusTimeout(limits.status),
                )
            })?
            .ok_or_else(|| {
                RenderError::ConnectionFailed(
                    "CDP connection closed while waiting for main request status".to_string(),
                )
            })?;

            let status = response["status"].as_u64().unwrap_or(0) as u16;
            debug!("[{}] Main request status received ({})", trace, status);
            if !(200..300).contains(&status) && status != 304 {
                return Err(RenderError::Navigation {
                    message: format!("Main URL failed to load: HTTP status {status}"),
                    url: response["url"]
                        .as_str()
                        .map(str::to_string)
                        .or_else(|| Some(request.url.clone())),
                    code: Some(status),
                });
            }

            !self
                .wait_for_markers(session, trace, load_deadline, deadline)
                .await?
        } else {
            debug!("[{}] Page load timed out; printing anyway", trace);
            true
        };

        // PRINTING
        check(deadline, Stage::Printing)?;
        debug!(
            "[{}] Printing with {} option(s), budget {:?}",
            trace,
            request.options.len(),
            limits.print
        );
        let printed = session
            .call(
                "Page.printToPDF",
                Value::Object(request.options.clone()),
                deadline.cap(limits.print),
            )
            .await
            .map_err(|e| match e {
                RenderError::CallTimeout { .. } => staged(
                    deadline,
                    Stage::Printing,
                    RenderError::PrintTimeout(limits.print),
                ),
                other => other,
            })?;
        let data = printed["data"].as_str().ok_or_else(|| RenderError::Protocol {
            method: "Page.printToPDF".to_string(),
            message: "response missing document data".to_string(),
        })?;

        // CAPTURING
        check(deadline, Stage::Capturing)?;
        let pdf = capture::decode_bounded(data, limits.max_size)?;

        Ok((pdf, load_timed_out))
    }

    /// True if the tab's load event fired within the load budget.
    async fn wait_for_load(
        &self,
        mut events: EventStream,
        session: &Session,
        load_deadline: Deadline,
    ) -> bool {
        let session_id = session.tab().session_id.as_str();
        loop {
            let remaining = load_deadline.remaining();
            if remaining.is_zero() {
                return false;
            }
            match tokio::time::timeout(remaining, events.next()).await {
                // All tabs share the connection, so filter for our session.
                Ok(Some(msg)) => {
                    if msg.get("sessionId").and_then(Value::as_str) == Some(session_id) {
                        return true;
                    }
                }
                Ok(None) => return false,
                Err(_) => return false,
            }
        }
    }

    /// Poll the cooperative-loading markers until none remain.
    ///
    /// Returns `Ok(true)` when the page is ready, `Ok(false)` when the load
    /// budget ran out first (soft timeout). Protocol failures other than a
    /// budget-capped call timeout are hard errors.
    async fn wait_for_markers(
        &self,
        session: &Session,
        trace: &str,
        load_deadline: Deadline,
        deadline: Deadline,
    ) -> Result<bool, RenderError> {
        let mut first = true;
        loop {
            let remaining = load_deadline.remaining();
            if remaining.is_zero() {
                debug!("[{}] Cooperative loading timed out", trace);
                return Ok(false);
            }

            match self.query_markers(session, remaining).await {
                Ok(0) => {
                    if first {
                        debug!("[{}] No cooperative loading used", trace);
                    } else {
                        debug!("[{}] Cooperative loading complete", trace);
                    }
                    return Ok(true);
                }
                Ok(n) => {
                    debug!("[{}] {} loading marker(s) still pending", trace, n);
                }
                Err(RenderError::CallTimeout { .. }) => {
                    debug!("[{}] Cooperative loading timed out", trace);
                    return Ok(false);
                }
                Err(e) => return Err(staged(deadline, Stage::LoadWait, e)),
            }

            first = false;
            sleep(self.config.poll_interval.min(load_deadline.remaining())).await;
        }
    }

    /// Count of elements still matching the pending-marker selector.
    async fn query_markers(
        &self,
        session: &Session,
        budget: Duration,
    ) -> Result<usize, RenderError> {
        let doc = session.call("DOM.getDocument", json!({}), budget).await?;
        let node_id = doc["root"]["nodeId"]
            .as_u64()
            .ok_or_else(|| RenderError::Protocol {
                method: "DOM.getDocument".to_string(),
                message: "response missing root node".to_string(),
            })?;

        let query = session
            .call(
                "DOM.querySelectorAll",
                json!({ "nodeId": node_id, "selector": self.config.loading_selector }),
                budget,
            )
            .await?;
        Ok(query["nodeIds"].as_array().map_or(0, |ids| ids.len()))
    }

    fn resolve_limits(&self, request: &RenderRequest) -> Limits {
        Limits {
            overall: request.timeout.unwrap_or(self.config.overall_timeout),
            load: request.load_timeout.unwrap_or(self.config.load_timeout),
            status: request.status_timeout.unwrap_or(self.config.status_timeout),
            print: request.print_timeout.unwrap_or(self.config.print_timeout),
            max_size: request.max_size.unwrap_or(self.config.max_size),
        }
    }
}

/// Fail with a stage-tagged overall timeout if the request deadline is gone.
fn check(deadline: Deadline, stage: Stage) -> Result<(), RenderError> {
    if deadline.expired() {
        Err(RenderError::Overall {
            stage,
            timeout: deadline.total,
        })
    } else {
        Ok(())
    }
}

/// Re-tag a stage-local timeout as an overall timeout when the request
/// deadline, not the stage budget, is what actually expired.
fn staged(deadline: Deadline, stage: Stage, err: RenderError) -> RenderError {
    if deadline.expired() && err.is_timeout() {
        RenderError::Overall {
            stage,
            timeout: deadline.total,
        }
    } else {
        err
    }
}

/// Watches network events to recover the HTTP response of a frame's main
/// request.
///
/// Must be created before `Page.navigate` is sent so the
/// `Network.requestWillBeSent` event is not missed; the stream buffers
/// until awaited. Redirect legs share the request id, so the first
/// `Network.responseReceived` for it is the one that counts.
struct FrameWatcher {
    events: EventStream,
    frame_id: String,
}

impl FrameWatcher {
    fn new(session: &Session, frame_id: String) -> Self {
        Self {
            events: session.subscribe(&["Network.requestWillBeSent", "Network.responseReceived"]),
            frame_id,
        }
    }

    /// The main request's response payload, or `None` if the connection
    /// closed first.
    async fn response(mut self) -> Option<Value> {
        let mut request_id: Option<String> = None;
        while let Some(msg) = self.events.next().await {
            let params = &msg["params"];
            match msg.get("method").and_then(Value::as_str) {
                Some("Network.requestWillBeSent") if request_id.is_none() => {
                    if params.get("frameId").and_then(Value::as_str)
                        == Some(self.frame_id.as_str())
                    {
                        request_id = params
                            .get("requestId")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                    }
                }
                Some("Network.responseReceived") => {
                    if let Some(rid) = &request_id {
                        if params.get("requestId").and_then(Value::as_str)
                            == Some(rid.as_str())
                        {
                            return params.get("response").cloned();
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }
}
