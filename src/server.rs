//! HTTP front end: `POST /` renders a PDF, `GET /healthcheck/` probes the
//! browser connection.

use crate::{HealthProber, RenderError, RenderRequest, RenderService};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RenderService>,
    pub prober: Arc<HealthProber>,
}

/// Request body for `POST /`. Timeouts are given in seconds and override
/// the configured defaults for this request only; `options` is passed
/// through verbatim as `Page.printToPDF` parameters.
#[derive(Debug, Deserialize)]
pub struct RenderBody {
    pub url: String,
    pub max_size: Option<u64>,
    pub timeout: Option<f64>,
    pub load_timeout: Option<f64>,
    pub status_timeout: Option<f64>,
    pub print_timeout: Option<f64>,
    #[serde(default)]
    pub options: Map<String, Value>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(render))
        .route("/healthcheck/", get(healthcheck))
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn render(
    State(state): State<AppState>,
    body: Result<Json<RenderBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Invalid request body: {rejection}") })),
            )
                .into_response();
        }
    };

    let url = body.url.clone();
    let request = match to_request(body) {
        Ok(request) => request,
        Err(message) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message, "url": url })),
            )
                .into_response();
        }
    };

    match state.service.render(request).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "url": result.url,
                "pdf": STANDARD.encode(&result.pdf),
                "load_timed_out": result.load_timed_out,
            })),
        )
            .into_response(),
        Err(e) => error_response(&url, &e),
    }
}

async fn healthcheck(State(state): State<AppState>) -> Response {
    match state.prober.probe(HEALTH_TIMEOUT).await {
        Ok(version) => {
            debug!(
                "Health check passed: {} (protocol {})",
                version.product, version.protocol_version
            );
            (StatusCode::OK, "OK").into_response()
        }
        Err(e) => {
            warn!("Health check failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Unhealthy").into_response()
        }
    }
}

fn to_request(body: RenderBody) -> Result<RenderRequest, String> {
    Ok(RenderRequest {
        url: body.url,
        max_size: body.max_size,
        timeout: secs(body.timeout, "timeout")?,
        load_timeout: secs(body.load_timeout, "load_timeout")?,
        status_timeout: secs(body.status_timeout, "status_timeout")?,
        print_timeout: secs(body.print_timeout, "print_timeout")?,
        options: body.options,
        ..Default::default()
    })
}

fn secs(value: Option<f64>, field: &str) -> Result<Option<Duration>, String> {
    match value {
        None => Ok(None),
        Some(v) if v.is_finite() && v > 0.0 => Ok(Some(Duration::from_secs_f64(v))),
        Some(v) => Err(format!("{field} must be a positive number, got {v}")),
    }
}

/// Map a render failure to its HTTP status and JSON payload. Every payload
/// carries `error` and `url`; timeouts and the size limit echo back the
/// offending limit so callers can tell which one fired.
pub(crate) fn error_response(url: &str, err: &RenderError) -> Response {
    let status = match err {
        RenderError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        RenderError::SizeExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        RenderError::Navigation { .. } => StatusCode::FAILED_DEPENDENCY,
        RenderError::AcquireTimeout(_)
        | RenderError::CallTimeout { .. }
        | RenderError::PrintTimeout(_)
        | RenderError::StatusTimeout(_)
        | RenderError::Overall { .. } => StatusCode::GATEWAY_TIMEOUT,
        RenderError::ConnectionFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut payload = Map::new();
    payload.insert("error".to_string(), Value::String(err.to_string()));
    payload.insert("url".to_string(), Value::String(url.to_string()));

    if let RenderError::Navigation {
        url: failed_url,
        code,
        ..
    } = err
    {
        if let Some(failed_url) = failed_url {
            payload.insert(
                "failed_url".to_string(),
                Value::String(failed_url.clone()),
            );
        }
        if let Some(code) = code {
            payload.insert("status_code".to_string(), json!(code));
        }
    }

    if let Some((key, value)) = err.echo() {
        payload.insert(key.to_string(), value);
    }

    (status, Json(Value::Object(payload))).into_response()
}
