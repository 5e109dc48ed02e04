#[cfg(test)]
mod integration_tests {
    use crate::{
        CdpClient, Config, HealthProber, Metrics, RenderError, RenderRequest, RenderService,
        TabPool,
    };
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Behavior knobs for the scripted browser on the far side of the
    /// channel pair.
    #[derive(Clone)]
    struct BrowserScript {
        /// HTTP status reported for the main request
        status: u16,
        /// Base64 payload returned by Page.printToPDF
        pdf_data: String,
        /// Delay before the print response is sent
        print_delay: Duration,
        /// Whether Page.loadEventFired is emitted after navigation
        load_event: bool,
        /// Delay before the blank reset page fires its load event
        blank_load_delay: Duration,
        /// Number of marker queries that still report pending markers
        marker_polls: u64,
        /// errorText included in the Page.navigate response
        navigate_error: Option<String>,
    }

    impl Default for BrowserScript {
        fn default() -> Self {
            Self {
                status: 200,
                pdf_data: STANDARD.encode(b"%PDF-1.4 fake document"),
                print_delay: Duration::ZERO,
                load_event: true,
                blank_load_delay: Duration::ZERO,
                marker_polls: 0,
                navigate_error: None,
            }
        }
    }

    /// Spawn a scripted browser and return a client wired to it.
    ///
    /// The browser answers the protocol calls the pipeline issues, emitting
    /// network and load events after each non-blank navigation.
    fn spawn_browser(script: BrowserScript) -> CdpClient {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            let mut next_target = 0usize;
            let mut marker_queries = 0u64;

            while let Some(frame) = out_rx.recv().await {
                let msg: Value = serde_json::from_str(&frame).unwrap();
                let id = msg["id"].as_u64().unwrap();
                let method = msg["method"].as_str().unwrap().to_string();
                let session = msg
                    .get("sessionId")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let reply =
                    |result: Value| json!({ "id": id, "result": result }).to_string();

                match method.as_str() {
                    "Target.createTarget" => {
                        next_target += 1;
                        let _ = in_tx
                            .send(reply(json!({ "targetId": format!("target-{next_target}") })));
                    }
                    "Target.attachToTarget" => {
                        let target_id = msg["params"]["targetId"].as_str().unwrap();
                        let _ = in_tx
                            .send(reply(json!({ "sessionId": format!("session-{target_id}") })));
                    }
                    "Page.enable" | "Network.enable" | "Target.closeTarget" => {
                        let _ = in_tx.send(reply(json!({})));
                    }
                    "Page.getFrameTree" => {
                        let sid = session.as_deref().unwrap();
                        let _ = in_tx.send(reply(
                            json!({ "frameTree": { "frame": { "id": format!("frame-{sid}") } } }),
                        ));
                    }
                    "Page.navigate" => {
                        let url = msg["params"]["url"].as_str().unwrap_or("").to_string();
                        let sid = session.clone().unwrap();
                        let frame_id = format!("frame-{sid}");

                        let mut result = json!({ "frameId": frame_id.clone() });
                        if url != "about:blank" {
                            if let Some(err) = &script.navigate_error {
                                result["errorText"] = json!(err);
                            }
                        }
                        let _ = in_tx.send(reply(result));

                        // The blank reset page fires its own load event,
                        // like a real browser does.
                        if url == "about:blank" {
                            let event = json!({
                                "method": "Page.loadEventFired",
                                "params": {},
                                "sessionId": sid.clone(),
                            })
                            .to_string();
                            if script.blank_load_delay.is_zero() {
                                let _ = in_tx.send(event);
                            } else {
                                let tx = in_tx.clone();
                                let delay = script.blank_load_delay;
                                tokio::spawn(async move {
                                    tokio::time::sleep(delay).await;
                                    let _ = tx.send(event);
                                });
                            }
                        }

                        if url != "about:blank" && script.navigate_error.is_none() {
                            let _ = in_tx.send(
                                json!({
                                    "method": "Network.requestWillBeSent",
                                    "params": { "frameId": frame_id, "requestId": format!("req-{sid}") },
                                    "sessionId": sid.clone(),
                                })
                                .to_string(),
                            );
                            let _ = in_tx.send(
                                json!({
                                    "method": "Network.responseReceived",
                                    "params": {
                                        "requestId": format!("req-{sid}"),
                                        "response": { "status": script.status, "url": url },
                                    },
                                    "sessionId": sid.clone(),
                                })
                                .to_string(),
                            );
                            if script.load_event {
                                let _ = in_tx.send(
                                    json!({
                                        "method": "Page.loadEventFired",
                                        "params": {},
                                        "sessionId": sid,
                                    })
                                    .to_string(),
                                );
                            }
                        }
                    }
                    "DOM.getDocument" => {
                        let _ = in_tx.send(reply(json!({ "root": { "nodeId": 1 } })));
                    }
                    "DOM.querySelectorAll" => {
                        marker_queries += 1;
                        let node_ids: Vec<u32> = if marker_queries > script.marker_polls {
                            vec![]
                        } else {
                            vec![2, 3]
                        };
                        let _ = in_tx.send(reply(json!({ "nodeIds": node_ids })));
                    }
                    "Page.printToPDF" => {
                        if !script.print_delay.is_zero() {
                            tokio::time::sleep(script.print_delay).await;
                        }
                        let _ = in_tx.send(reply(json!({ "data": script.pdf_data })));
                    }
                    "Browser.getVersion" => {
                        let _ = in_tx.send(reply(
                            json!({ "product": "FakeChrome/1.0", "protocolVersion": "1.3" }),
                        ));
                    }
                    _ => {
                        let _ = in_tx.send(reply(json!({})));
                    }
                }
            }
        });

        CdpClient::from_parts(out_tx, in_rx)
    }

    async fn service_with(script: BrowserScript, config: Config) -> Arc<RenderService> {
        let client = Arc::new(spawn_browser(script));
        let pool = Arc::new(TabPool::new(client.clone(), &config).await.unwrap());
        Arc::new(RenderService::new(
            client,
            pool,
            config,
            Arc::new(Metrics::new()),
        ))
    }

    fn small_config(pool_size: usize) -> Config {
        Config {
            pool_size,
            load_timeout: Duration::from_secs(2),
            status_timeout: Duration::from_secs(1),
            print_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(20),
            reset_timeout: Duration::from_secs(1),
            ..Default::default()
        }
    }

    fn request_for(url: &str) -> RenderRequest {
        RenderRequest {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.overall_timeout, Duration::from_secs(120));
        assert_eq!(config.load_timeout, Duration::from_secs(30));
        assert_eq!(config.status_timeout, Duration::from_secs(5));
        assert_eq!(config.print_timeout, Duration::from_secs(10));
        assert_eq!(config.max_size, 20 * 1024 * 1024);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.loading_selector, "input.pdfloading[value='loading']");
    }

    #[test]
    fn test_render_request_default() {
        let request = RenderRequest::default();
        assert!(!request.id.is_empty());
        assert!(request.url.is_empty());
        assert!(request.max_size.is_none());
        assert!(request.timeout.is_none());
        assert!(request.options.is_empty());
    }

    #[tokio::test]
    async fn test_call_correlation_out_of_order() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let client = Arc::new(CdpClient::from_parts(out_tx, in_rx));

        let responder = tokio::spawn(async move {
            let first: Value = serde_json::from_str(&out_rx.recv().await.unwrap()).unwrap();
            let second: Value = serde_json::from_str(&out_rx.recv().await.unwrap()).unwrap();
            // Answer the second call before the first.
            in_tx
                .send(json!({ "id": second["id"], "result": { "tag": "second" } }).to_string())
                .unwrap();
            in_tx
                .send(json!({ "id": first["id"], "result": { "tag": "first" } }).to_string())
                .unwrap();
            // Keep the connection open until both responses are consumed.
            tokio::time::sleep(Duration::from_millis(200)).await;
            drop(in_tx);
        });

        let c = client.clone();
        let first = tokio::spawn(async move {
            c.call(None, "First.method", json!({}), Duration::from_secs(1))
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = client
            .call(None, "Second.method", json!({}), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(second["tag"], "second");
        let first = first.await.unwrap().unwrap();
        assert_eq!(first["tag"], "first");
        assert_eq!(client.in_flight(), 0);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_call_timeout_clears_pending() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let client = CdpClient::from_parts(out_tx, in_rx);

        // Swallow the frame and never answer.
        let responder = tokio::spawn(async move {
            let _ = out_rx.recv().await;
            tokio::time::sleep(Duration::from_millis(200)).await;
            drop(in_tx);
        });

        let result = client
            .call(None, "Slow.method", json!({}), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(RenderError::CallTimeout { .. })));
        assert_eq!(client.in_flight(), 0);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_drop_fails_calls() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let client = CdpClient::from_parts(out_tx, in_rx);

        // Receive the call, then drop the connection with it in flight.
        tokio::spawn(async move {
            let _ = out_rx.recv().await;
            drop(in_tx);
        });

        let result = client
            .call(None, "Any.method", json!({}), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(RenderError::ConnectionFailed(_))));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(client.is_closed());

        // Fail fast once closed, no deadline wait.
        let result = client
            .call(None, "Any.method", json!({}), Duration::from_secs(60))
            .await;
        assert!(matches!(result, Err(RenderError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_event_fanout_and_order() {
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let client = CdpClient::from_parts(out_tx, in_rx);

        let mut on_a = client.subscribe(&["Event.a"]);
        let mut on_all = client.subscribe(&["*"]);

        in_tx
            .send(json!({ "method": "Event.a", "params": { "n": 1 } }).to_string())
            .unwrap();
        in_tx
            .send(json!({ "method": "Event.b", "params": { "n": 2 } }).to_string())
            .unwrap();
        in_tx
            .send(json!({ "method": "Event.a", "params": { "n": 3 } }).to_string())
            .unwrap();

        assert_eq!(on_a.next().await.unwrap()["params"]["n"], 1);
        assert_eq!(on_a.next().await.unwrap()["params"]["n"], 3);
        assert_eq!(on_all.next().await.unwrap()["params"]["n"], 1);
        assert_eq!(on_all.next().await.unwrap()["params"]["n"], 2);
        assert_eq!(on_all.next().await.unwrap()["params"]["n"], 3);

        // Streams end when the connection goes away.
        drop(in_tx);
        assert!(on_a.next().await.is_none());
        assert!(on_all.next().await.is_none());
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let client = Arc::new(spawn_browser(BrowserScript::default()));
        let pool = Arc::new(TabPool::new(client, &small_config(2)).await.unwrap());
        assert_eq!(pool.size(), 2);
        assert_eq!(pool.available().await, 2);

        let first = pool.acquire(Duration::from_secs(1)).await.unwrap();
        let second = pool.acquire(Duration::from_secs(1)).await.unwrap();
        assert_ne!(first.tab().id, second.tab().id);
        assert_eq!(pool.available().await, 0);

        let denied = pool.acquire(Duration::from_millis(50)).await;
        assert!(matches!(denied, Err(RenderError::AcquireTimeout(_))));

        pool.release(first).await;
        pool.release(second).await;
        assert_eq!(pool.available().await, 2);
    }

    #[tokio::test]
    async fn test_pool_waiter_wakes_on_release() {
        let client = Arc::new(spawn_browser(BrowserScript::default()));
        let pool = Arc::new(TabPool::new(client, &small_config(1)).await.unwrap());

        let held = pool.acquire(Duration::from_secs(1)).await.unwrap();
        let held_id = held.tab().id;

        let waiter_pool = pool.clone();
        let waiter =
            tokio::spawn(async move { waiter_pool.acquire(Duration::from_secs(2)).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        pool.release(held).await;

        let session = waiter.await.unwrap().unwrap();
        assert_eq!(session.tab().id, held_id);
        pool.release(session).await;
    }

    #[tokio::test]
    async fn test_render_success() {
        let service = service_with(BrowserScript::default(), small_config(1)).await;
        let result = service.render(request_for("http://example.com/page")).await.unwrap();

        assert_eq!(result.url, "http://example.com/page");
        assert_eq!(result.pdf, b"%PDF-1.4 fake document");
        assert!(!result.load_timed_out);
        assert_eq!(result.tab, 0);
        assert_eq!(service.pool().available().await, 1);
    }

    #[tokio::test]
    async fn test_render_concurrent_sessions_do_not_cross() {
        let service = service_with(BrowserScript::default(), small_config(2)).await;

        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.render(request_for("http://example.com/a")).await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.render(request_for("http://example.com/b")).await })
        };

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert_eq!(a.url, "http://example.com/a");
        assert_eq!(b.url, "http://example.com/b");
        assert_ne!(a.tab, b.tab);
        assert_eq!(service.pool().available().await, 2);
    }

    #[tokio::test]
    async fn test_render_rejects_invalid_url() {
        let service = service_with(BrowserScript::default(), small_config(1)).await;
        let result = service.render(request_for("ftp://example.com/file")).await;
        assert!(matches!(result, Err(RenderError::InvalidUrl(_))));
        assert_eq!(service.pool().available().await, 1);
    }

    #[tokio::test]
    async fn test_render_size_limit() {
        let script = BrowserScript {
            pdf_data: STANDARD.encode(vec![0u8; 2048]),
            ..Default::default()
        };
        let service = service_with(script, small_config(1)).await;

        let mut request = request_for("http://example.com");
        request.max_size = Some(100);
        let err = service.render(request).await.unwrap_err();

        match err {
            RenderError::SizeExceeded { size, max_size } => {
                assert_eq!(size, 2048);
                assert_eq!(max_size, 100);
            }
            other => panic!("expected SizeExceeded, got {other:?}"),
        }
        assert_eq!(service.pool().available().await, 1);
    }

    #[tokio::test]
    async fn test_render_print_timeout_returns_tab() {
        let script = BrowserScript {
            print_delay: Duration::from_millis(300),
            ..Default::default()
        };
        let service = service_with(script, small_config(1)).await;

        let mut request = request_for("http://example.com");
        request.print_timeout = Some(Duration::from_millis(50));
        let err = service.render(request).await.unwrap_err();
        assert!(matches!(err, RenderError::PrintTimeout(_)));

        // The tab survives the failure and serves the next job.
        assert_eq!(service.pool().available().await, 1);
        let result = service.render(request_for("http://example.com/next")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_render_navigation_error() {
        let script = BrowserScript {
            navigate_error: Some("net::ERR_NAME_NOT_RESOLVED".to_string()),
            ..Default::default()
        };
        let service = service_with(script, small_config(1)).await;

        let err = service.render(request_for("http://no-such-host.example")).await.unwrap_err();
        match err {
            RenderError::Navigation { message, url, code } => {
                assert!(message.contains("net::ERR_NAME_NOT_RESOLVED"));
                assert_eq!(url.as_deref(), Some("http://no-such-host.example"));
                assert!(code.is_none());
            }
            other => panic!("expected Navigation, got {other:?}"),
        }
        assert_eq!(service.pool().available().await, 1);
    }

    #[tokio::test]
    async fn test_render_bad_status() {
        let script = BrowserScript {
            status: 500,
            ..Default::default()
        };
        let service = service_with(script, small_config(1)).await;

        let err = service.render(request_for("http://example.com/broken")).await.unwrap_err();
        match err {
            RenderError::Navigation { code, .. } => assert_eq!(code, Some(500)),
            other => panic!("expected Navigation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_render_not_modified_is_success() {
        let script = BrowserScript {
            status: 304,
            ..Default::default()
        };
        let service = service_with(script, small_config(1)).await;
        let result = service.render(request_for("http://example.com/cached")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_render_waits_for_markers() {
        let script = BrowserScript {
            marker_polls: 2,
            ..Default::default()
        };
        let service = service_with(script, small_config(1)).await;
        let result = service.render(request_for("http://example.com/slow-widget")).await.unwrap();
        assert!(!result.load_timed_out);
    }

    #[tokio::test]
    async fn test_render_marker_budget_is_soft() {
        let script = BrowserScript {
            marker_polls: u64::MAX,
            ..Default::default()
        };
        let service = service_with(script, small_config(1)).await;

        let mut request = request_for("http://example.com/stuck-widget");
        request.load_timeout = Some(Duration::from_millis(150));
        let result = service.render(request).await.unwrap();

        // Markers never cleared, but the page is printed anyway.
        assert!(result.load_timed_out);
        assert_eq!(result.pdf, b"%PDF-1.4 fake document");
    }

    #[tokio::test]
    async fn test_render_missing_load_event_is_soft() {
        let script = BrowserScript {
            load_event: false,
            ..Default::default()
        };
        let service = service_with(script, small_config(1)).await;

        let mut request = request_for("http://example.com/never-loads");
        request.load_timeout = Some(Duration::from_millis(150));
        let result = service.render(request).await.unwrap();

        assert!(result.load_timed_out);
        assert!(!result.pdf.is_empty());
    }

    #[tokio::test]
    async fn test_render_overall_deadline() {
        let script = BrowserScript {
            load_event: false,
            print_delay: Duration::from_millis(100),
            ..Default::default()
        };
        let service = service_with(script, small_config(1)).await;

        let mut request = request_for("http://example.com/slow");
        request.timeout = Some(Duration::from_millis(100));
        let err = service.render(request).await.unwrap_err();

        match err {
            RenderError::Overall { timeout, .. } => {
                assert_eq!(timeout, Duration::from_millis(100));
            }
            other => panic!("expected Overall, got {other:?}"),
        }
        assert_eq!(service.pool().available().await, 1);
    }

    #[tokio::test]
    async fn test_release_drains_stale_blank_load_event() {
        // The pages themselves never fire load; the blank reset page does,
        // a beat after the reset navigation completes. The second job on
        // the tab must not credit that event as its own page's load.
        let script = BrowserScript {
            load_event: false,
            blank_load_delay: Duration::from_millis(30),
            ..Default::default()
        };
        let service = service_with(script, small_config(1)).await;

        for url in ["http://example.com/first", "http://example.com/second"] {
            let mut request = request_for(url);
            request.load_timeout = Some(Duration::from_millis(150));
            let result = service.render(request).await.unwrap();
            assert!(
                result.load_timed_out,
                "stale blank-page load event credited to {url}"
            );
        }
    }

    #[tokio::test]
    async fn test_render_acquire_timeout_when_pool_busy() {
        let service = service_with(BrowserScript::default(), small_config(1)).await;
        let held = service.pool().acquire(Duration::from_secs(1)).await.unwrap();

        let mut request = request_for("http://example.com");
        request.timeout = Some(Duration::from_millis(100));
        let err = service.render(request).await.unwrap_err();

        assert_eq!(err.echo(), Some(("timeout", json!(0.1))));
        assert!(matches!(err, RenderError::AcquireTimeout(t) if t == Duration::from_millis(100)));
        service.pool().release(held).await;
    }

    #[tokio::test]
    async fn test_call_fails_fast_when_connection_drops_mid_call() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let client = Arc::new(CdpClient::from_parts(out_tx, in_rx));

        // Tear the connection down while the call is in flight; the call
        // must resolve promptly, never wait out its own deadline.
        tokio::spawn(async move {
            let _ = out_rx.recv().await;
            drop(in_tx);
        });

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            client.call(None, "Any.method", json!({}), Duration::from_secs(60)),
        )
        .await
        .expect("call outlived the dropped connection");
        assert!(matches!(result, Err(RenderError::ConnectionFailed(_))));
        assert_eq!(client.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_health_probe() {
        let client = Arc::new(spawn_browser(BrowserScript::default()));
        let prober = HealthProber::new(client);
        let version = prober.probe(Duration::from_secs(1)).await.unwrap();
        assert_eq!(version.product, "FakeChrome/1.0");
        assert_eq!(version.protocol_version, "1.3");
    }

    #[tokio::test]
    async fn test_health_probe_unhealthy_on_dead_connection() {
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        drop(in_tx);
        let client = Arc::new(CdpClient::from_parts(out_tx, in_rx));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let prober = HealthProber::new(client);
        let err = prober.probe(Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, RenderError::Unhealthy(_)));
    }

    #[test]
    fn test_error_echo_fields() {
        let err = RenderError::SizeExceeded {
            size: 2048,
            max_size: 100,
        };
        assert_eq!(err.echo(), Some(("max_size", json!(100))));

        let err = RenderError::PrintTimeout(Duration::from_secs(10));
        assert_eq!(err.echo(), Some(("print_timeout", json!(10.0))));

        let err = RenderError::StatusTimeout(Duration::from_secs(5));
        assert_eq!(err.echo(), Some(("status_timeout", json!(5.0))));

        let err = RenderError::AcquireTimeout(Duration::from_secs(120));
        assert_eq!(err.echo(), Some(("timeout", json!(120.0))));

        let err = RenderError::InvalidUrl("ftp://x".to_string());
        assert_eq!(err.echo(), None);
    }

    #[test]
    fn test_error_status_mapping() {
        use axum::http::StatusCode;

        let cases = [
            (
                RenderError::InvalidUrl("ftp://x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                RenderError::SizeExceeded {
                    size: 10,
                    max_size: 1,
                },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                RenderError::Navigation {
                    message: "Main URL failed to load: HTTP status 500".to_string(),
                    url: Some("http://example.com".to_string()),
                    code: Some(500),
                },
                StatusCode::FAILED_DEPENDENCY,
            ),
            (
                RenderError::PrintTimeout(Duration::from_secs(10)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                RenderError::StatusTimeout(Duration::from_secs(5)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                RenderError::AcquireTimeout(Duration::from_secs(120)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                RenderError::ConnectionFailed("gone".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                RenderError::Unhealthy("gone".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = crate::server::error_response("http://example.com", &err);
            assert_eq!(response.status(), expected, "wrong status for {err:?}");
        }
    }
}
