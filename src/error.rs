use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Pipeline stage a render job was in when a failure occurred.
///
/// Used to tag overall-timeout errors so callers can tell which part of
/// the pipeline ate the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Navigating,
    LoadWait,
    StatusWait,
    Printing,
    Capturing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Navigating => write!(f, "navigating"),
            Stage::LoadWait => write!(f, "waiting for load"),
            Stage::StatusWait => write!(f, "waiting for status"),
            Stage::Printing => write!(f, "printing"),
            Stage::Capturing => write!(f, "capturing"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Browser connection failed: {0}")]
    ConnectionFailed(String),

    #[error("No browser tab became free within {0:?}")]
    AcquireTimeout(Duration),

    #[error("Call to {method} timed out after {timeout:?}")]
    CallTimeout { method: String, timeout: Duration },

    #[error("PDF print timed out after {0:?}")]
    PrintTimeout(Duration),

    #[error("Timed out waiting for main request status after {0:?}")]
    StatusTimeout(Duration),

    #[error("{message}")]
    Navigation {
        message: String,
        url: Option<String>,
        code: Option<u16>,
    },

    #[error("Browser returned an error for {method}: {message}")]
    Protocol { method: String, message: String },

    #[error("PDF exceeded maximum size")]
    SizeExceeded { size: usize, max_size: u64 },

    #[error("Request timed out after {timeout:?} while {stage}")]
    Overall { stage: Stage, timeout: Duration },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Browser unhealthy: {0}")]
    Unhealthy(String),
}

impl RenderError {
    /// Whether this error is a deadline expiry of some kind.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            RenderError::AcquireTimeout(_)
                | RenderError::CallTimeout { .. }
                | RenderError::PrintTimeout(_)
                | RenderError::StatusTimeout(_)
                | RenderError::Overall { .. }
        )
    }

    /// The limit field (name and configured value) this error echoes back
    /// in the HTTP error payload, if any.
    pub fn echo(&self) -> Option<(&'static str, Value)> {
        match self {
            RenderError::SizeExceeded { max_size, .. } => Some(("max_size", json!(max_size))),
            RenderError::PrintTimeout(t) => Some(("print_timeout", json!(t.as_secs_f64()))),
            RenderError::StatusTimeout(t) => Some(("status_timeout", json!(t.as_secs_f64()))),
            RenderError::AcquireTimeout(t) | RenderError::Overall { timeout: t, .. } => {
                Some(("timeout", json!(t.as_secs_f64())))
            }
            _ => None,
        }
    }
}
