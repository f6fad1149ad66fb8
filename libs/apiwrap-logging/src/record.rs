//! Per-request access records.

use http::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::Level;

/// One structured record per completed request.
///
/// Built by the finishing middleware after the response is ready and emitted
/// through [`crate::LogService::request`]. The `uri` is stored as received;
/// redaction happens at emission time.
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub status: u16,
    pub method: String,
    pub uri: String,
    pub reason: String,
    pub ms: u64,
    /// Error-reporting token, present when the request was reported upstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollbar: Option<String>,
    /// Handler-supplied extra payload, merged into the record verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl RequestRecord {
    #[must_use]
    pub fn new(
        status: StatusCode,
        method: impl Into<String>,
        uri: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            status: status.as_u16(),
            method: method.into(),
            uri: uri.into(),
            reason: status.canonical_reason().unwrap_or("unknown").to_owned(),
            ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            rollbar: None,
            extra: None,
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    #[must_use]
    pub fn with_rollbar(mut self, token: impl Into<String>) -> Self {
        self.rollbar = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Severity routing: server errors are the loudest the `tracing`
    /// hierarchy offers, client errors warn, everything else is info.
    #[must_use]
    pub fn severity(&self) -> Level {
        if self.status >= 500 {
            Level::ERROR
        } else if self.status >= 400 {
            Level::WARN
        } else {
            Level::INFO
        }
    }
}
