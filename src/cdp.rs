//! Chrome DevTools Protocol client
//!
//! This module provides the single multiplexed channel to the browser's
//! remote-debugging endpoint. All render jobs share one websocket; calls are
//! correlated back to their callers by numeric id, and unsolicited protocol
//! events fan out to subscribers.

use crate::RenderError;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Subscribers to methods not tied to a call id. The `"*"` key receives
/// every event.
type Subscriptions = Mutex<HashMap<String, Vec<mpsc::UnboundedSender<Value>>>>;

struct PendingCall {
    method: String,
    tx: oneshot::Sender<Result<Value, RenderError>>,
}

/// Multiplexing client for the browser's remote-debugging connection
///
/// Cheap to clone via `Arc`; every render job, the pool, and the health
/// prober share one instance. The correlation table and the subscription
/// registry are the only state touched by concurrent jobs.
///
/// # Examples
///
/// ```rust,no_run
/// use pdfgen::CdpClient;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = CdpClient::connect("ws://localhost:9222/devtools/browser/abc").await?;
///     let version = client
///         .call(None, "Browser.getVersion", serde_json::json!({}), Duration::from_secs(5))
///         .await?;
///     println!("{}", version["product"]);
///     Ok(())
/// }
/// ```
pub struct CdpClient {
    outbound: mpsc::UnboundedSender<String>,
    pending: Arc<DashMap<u64, PendingCall>>,
    subscriptions: Arc<Subscriptions>,
    next_id: AtomicU64,
    closed: Arc<AtomicBool>,
}

impl CdpClient {
    /// Connect to the browser-level websocket endpoint.
    pub async fn connect(ws_url: &str) -> Result<Self, RenderError> {
        let (ws, _) = connect_async(ws_url)
            .await
            .map_err(|e| RenderError::ConnectionFailed(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

        // Writer: outbound frames to the socket.
        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        });

        // Reader: socket frames into the dispatch loop. Dropping `in_tx`
        // on exit is what signals connection failure downstream.
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if in_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("CDP websocket read error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self::from_parts(out_tx, in_rx))
    }

    /// Build a client over raw text-frame channels.
    ///
    /// `connect` wires these to a real websocket; tests wire them to a
    /// scripted browser. Closing the inbound channel is equivalent to the
    /// connection dropping.
    pub fn from_parts(
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        let pending: Arc<DashMap<u64, PendingCall>> = Arc::new(DashMap::new());
        let subscriptions: Arc<Subscriptions> = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        Self::spawn_dispatch(
            inbound,
            pending.clone(),
            subscriptions.clone(),
            closed.clone(),
        );

        Self {
            outbound,
            pending,
            subscriptions,
            next_id: AtomicU64::new(1),
            closed,
        }
    }

    fn spawn_dispatch(
        mut inbound: mpsc::UnboundedReceiver<String>,
        pending: Arc<DashMap<u64, PendingCall>>,
        subscriptions: Arc<Subscriptions>,
        closed: Arc<AtomicBool>,
    ) {
        tokio::spawn(async move {
            while let Some(text) = inbound.recv().await {
                let msg: Value = match serde_json::from_str(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("Discarding unparseable CDP frame: {}", e);
                        continue;
                    }
                };

                // Responses carry an id; events carry a method. A frame is
                // one or the other.
                if let Some(id) = msg.get("id").and_then(Value::as_u64) {
                    if let Some((_, call)) = pending.remove(&id) {
                        let outcome = match msg.get("error") {
                            Some(err) => Err(RenderError::Protocol {
                                method: call.method,
                                message: err
                                    .get("message")
                                    .and_then(Value::as_str)
                                    .unwrap_or("unknown error")
                                    .to_string(),
                            }),
                            None => Ok(msg.get("result").cloned().unwrap_or(Value::Null)),
                        };
                        let _ = call.tx.send(outcome);
                    }
                    continue;
                }

                if let Some(method) = msg.get("method").and_then(Value::as_str) {
                    let mut subs = subscriptions.lock().unwrap();
                    let method = method.to_string();
                    for key in [method.as_str(), "*"] {
                        if let Some(senders) = subs.get_mut(key) {
                            // Dropped receivers unsubscribe themselves here.
                            senders.retain(|tx| tx.send(msg.clone()).is_ok());
                        }
                    }
                    subs.retain(|_, senders| !senders.is_empty());
                }
            }

            // Connection gone: fail every in-flight call exactly once and
            // end all event streams.
            closed.store(true, Ordering::SeqCst);
            let ids: Vec<u64> = pending.iter().map(|entry| *entry.key()).collect();
            for id in ids {
                if let Some((_, call)) = pending.remove(&id) {
                    let _ = call.tx.send(Err(RenderError::ConnectionFailed(
                        "CDP connection closed with call in flight".to_string(),
                    )));
                }
            }
            subscriptions.lock().unwrap().clear();
            debug!("CDP dispatch loop stopped");
        });
    }

    /// Send a protocol call and wait for its correlated response.
    ///
    /// `session_id` targets a specific tab (flatten-mode session); `None`
    /// addresses the browser itself. On deadline the pending entry is
    /// removed and `CallTimeout` returned; the engine-side call is not
    /// cancelled.
    pub async fn call(
        &self,
        session_id: Option<&str>,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, RenderError> {
        if self.is_closed() {
            return Err(RenderError::ConnectionFailed(
                "CDP connection is closed".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            id,
            PendingCall {
                method: method.to_string(),
                tx,
            },
        );

        let mut frame = json!({ "id": id, "method": method, "params": params });
        if let Some(sid) = session_id {
            frame["sessionId"] = json!(sid);
        }

        if self.outbound.send(frame.to_string()).is_err() {
            self.pending.remove(&id);
            return Err(RenderError::ConnectionFailed(
                "CDP connection is closed".to_string(),
            ));
        }

        // The dispatch loop may have drained the table between the closed
        // check above and the insert; a call landing in that window would
        // otherwise wait out its full deadline.
        if self.is_closed() {
            self.pending.remove(&id);
            return Err(RenderError::ConnectionFailed(
                "CDP connection is closed".to_string(),
            ));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without resolving: dispatch loop died between
            // our insert and its drain.
            Ok(Err(_)) => Err(RenderError::ConnectionFailed(
                "CDP connection closed with call in flight".to_string(),
            )),
            Err(_) => {
                self.pending.remove(&id);
                Err(RenderError::CallTimeout {
                    method: method.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Subscribe to one or more event methods (or `"*"` for everything).
    ///
    /// The stream is unbounded and buffers from the moment of subscription,
    /// so callers may subscribe before triggering the event and collect it
    /// later. It ends when the connection closes or the stream is dropped.
    pub fn subscribe(&self, methods: &[&str]) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.is_closed() {
            let mut subs = self.subscriptions.lock().unwrap();
            for method in methods {
                subs.entry(method.to_string()).or_default().push(tx.clone());
            }
        }
        EventStream { rx }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of calls currently awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

/// A live sequence of event payloads for one subscription
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<Value>,
}

impl EventStream {
    /// Next event, or `None` once the connection has closed.
    pub async fn next(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Next already-queued event, without waiting.
    pub fn try_next(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }
}
