//! Tab pool bounding concurrent browser usage
//!
//! A fixed set of browser tabs is created at startup and handed out one per
//! render job. Waiters queue in FIFO order; a tab returned to the pool is
//! reset to a blank document first so no DOM state leaks between jobs.

use crate::{CdpClient, Config, EventStream, RenderError};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// One browser page attached in flatten mode, the unit of concurrency
#[derive(Debug, Clone)]
pub struct Tab {
    /// Pool index, stable for the process lifetime
    pub id: usize,
    pub target_id: String,
    pub session_id: String,
}

/// A job's exclusive lease on one tab
///
/// Created by [`TabPool::acquire`] and consumed by [`TabPool::release`];
/// at most one live session exists per tab.
pub struct Session {
    tab: Tab,
    client: Arc<CdpClient>,
    permit: OwnedSemaphorePermit,
}

impl Session {
    pub fn tab(&self) -> &Tab {
        &self.tab
    }

    /// Issue a protocol call against this session's tab.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, RenderError> {
        self.client
            .call(Some(&self.tab.session_id), method, params, timeout)
            .await
    }

    /// Subscribe to events on the shared connection.
    pub fn subscribe(&self, methods: &[&str]) -> EventStream {
        self.client.subscribe(methods)
    }
}

/// Fixed-size pool of reusable browser tabs
///
/// The pool never grows or shrinks after construction. Acquisition is
/// FIFO-fair via the tokio semaphore's waiter queue.
pub struct TabPool {
    client: Arc<CdpClient>,
    free: Mutex<VecDeque<Tab>>,
    semaphore: Arc<Semaphore>,
    size: usize,
    reset_timeout: Duration,
}

const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

impl TabPool {
    /// Create `config.pool_size` tabs up front and enable the protocol
    /// domains the render pipeline relies on.
    pub async fn new(client: Arc<CdpClient>, config: &Config) -> Result<Self, RenderError> {
        let mut free = VecDeque::with_capacity(config.pool_size);
        for id in 0..config.pool_size {
            let tab = Self::create_tab(&client, id).await?;
            free.push_back(tab);
        }
        info!("Tab pool initialized with {} tabs", config.pool_size);

        Ok(Self {
            client,
            free: Mutex::new(free),
            semaphore: Arc::new(Semaphore::new(config.pool_size)),
            size: config.pool_size,
            reset_timeout: config.reset_timeout,
        })
    }

    async fn create_tab(client: &Arc<CdpClient>, id: usize) -> Result<Tab, RenderError> {
        let created = client
            .call(
                None,
                "Target.createTarget",
                json!({ "url": "about:blank" }),
                SETUP_TIMEOUT,
            )
            .await?;
        let target_id = created
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| RenderError::Protocol {
                method: "Target.createTarget".to_string(),
                message: "response missing targetId".to_string(),
            })?
            .to_string();

        let attached = client
            .call(
                None,
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
                SETUP_TIMEOUT,
            )
            .await?;
        let session_id = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| RenderError::Protocol {
                method: "Target.attachToTarget".to_string(),
                message: "response missing sessionId".to_string(),
            })?
            .to_string();

        // Load and network events are needed by every render job.
        client
            .call(Some(&session_id), "Page.enable", json!({}), SETUP_TIMEOUT)
            .await?;
        client
            .call(Some(&session_id), "Network.enable", json!({}), SETUP_TIMEOUT)
            .await?;

        debug!("Tab {} ready (target {}, session {})", id, target_id, session_id);
        Ok(Tab {
            id,
            target_id,
            session_id,
        })
    }

    /// Borrow a tab, waiting at most `deadline` for one to become free.
    ///
    /// Blocks only the calling job; waiters are served in FIFO order.
    pub async fn acquire(&self, deadline: Duration) -> Result<Session, RenderError> {
        let permit = tokio::time::timeout(deadline, self.semaphore.clone().acquire_owned())
            .await
            .map_err(|_| RenderError::AcquireTimeout(deadline))?
            .map_err(|_| RenderError::ConnectionFailed("tab pool is shut down".to_string()))?;

        let tab = self
            .free
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| RenderError::ConnectionFailed(
                "tab pool free list empty while permit held".to_string(),
            ))?;

        debug!("Tab {} acquired", tab.id);
        Ok(Session {
            tab,
            client: self.client.clone(),
            permit,
        })
    }

    /// Return a tab to the pool.
    ///
    /// The tab is reset-navigated to `about:blank` first so leftover DOM
    /// state (e.g. stale `pdfloading` markers) cannot poison the next
    /// job's cooperative-load check, and the blank page's own load event
    /// is consumed here so the next job cannot mistake it for its page's
    /// completion. The reset is best effort and bounded.
    pub async fn release(&self, session: Session) {
        let Session {
            tab,
            client,
            permit,
        } = session;

        // Subscribe before navigating or the blank page's load event can
        // slip past unobserved.
        let mut load_events = client.subscribe(&["Page.loadEventFired"]);
        let reset = client
            .call(
                Some(&tab.session_id),
                "Page.navigate",
                json!({ "url": "about:blank" }),
                self.reset_timeout,
            )
            .await;
        match reset {
            Ok(_) => self.drain_reset_load(&mut load_events, &tab).await,
            Err(e) => warn!("Reset navigation failed for tab {}: {}", tab.id, e),
        }

        debug!("Tab {} released", tab.id);
        // The tab must be back on the free list before the permit wakes a
        // waiter, or an acquirer could find the list empty.
        self.free.lock().await.push_back(tab);
        drop(permit);
    }

    /// Wait out the blank page's load event so a stale `loadEventFired`
    /// on this session cannot leak into the next job's load wait.
    async fn drain_reset_load(&self, events: &mut EventStream, tab: &Tab) {
        let drained = tokio::time::timeout(self.reset_timeout, async {
            while let Some(msg) = events.next().await {
                if msg.get("sessionId").and_then(Value::as_str) == Some(tab.session_id.as_str()) {
                    break;
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Blank page load event did not arrive for tab {}", tab.id);
            return;
        }

        // Anything still queued on this stream predates the handout too.
        while events.try_next().is_some() {}
    }

    /// Number of tabs currently free.
    pub async fn available(&self) -> usize {
        self.free.lock().await.len()
    }

    /// Configured pool size N.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Close every target, waiting briefly for in-flight jobs to finish.
    pub async fn shutdown(&self) {
        info!("Shutting down tab pool...");

        let mut retries = 0;
        while retries < 10 {
            if self.free.lock().await.len() == self.size {
                break;
            }
            sleep(Duration::from_millis(100)).await;
            retries += 1;
        }

        let tabs: Vec<Tab> = self.free.lock().await.drain(..).collect();
        for tab in tabs {
            let closed = self
                .client
                .call(
                    None,
                    "Target.closeTarget",
                    json!({ "targetId": tab.target_id }),
                    SETUP_TIMEOUT,
                )
                .await;
            if let Err(e) = closed {
                warn!("Failed to close tab {}: {}", tab.id, e);
            }
        }

        info!("Tab pool shutdown complete");
    }
}
