//! Upstream error reporting.
//!
//! Unexpected failures are pushed to a Rollbar-compatible collector. The
//! returned occurrence token is surfaced to the client (`X-Rollbar-Token`
//! header and `error.rollbar` field) so a support ticket can be matched to
//! the collector item. Reporting is strictly best-effort: a failed report is
//! logged and the response proceeds unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ROLLBAR_ENDPOINT: &str = "https://api.rollbar.com/api/1/item/";

/// What gets sent upstream for one failed request.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEvent {
    pub message: String,
    pub classification: &'static str,
    pub status: u16,
    pub method: String,
    pub uri: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// Occurrence token handed back by the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportToken(pub String);

impl std::fmt::Display for ReportToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("collector rejected the report with status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed collector response: {0}")]
    Malformed(String),
}

/// Seam for the collector client; tests and embedders supply their own.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn report(&self, event: &ReportEvent) -> Result<ReportToken, ReportError>;
}

/// Reports to the Rollbar item API.
pub struct RollbarReporter {
    client: reqwest::Client,
    access_token: String,
    endpoint: String,
    environment: String,
}

impl RollbarReporter {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.into(),
            endpoint: ROLLBAR_ENDPOINT.to_owned(),
            environment: "production".to_owned(),
        }
    }

    /// Point at a different collector, e.g. a mock in tests.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ItemResponse {
    result: ItemResult,
}

#[derive(Debug, Deserialize)]
struct ItemResult {
    uuid: String,
}

#[async_trait]
impl ErrorReporter for RollbarReporter {
    async fn report(&self, event: &ReportEvent) -> Result<ReportToken, ReportError> {
        let level = if event.status >= 500 { "error" } else { "warning" };
        let payload = serde_json::json!({
            "access_token": self.access_token,
            "data": {
                "environment": self.environment,
                "level": level,
                "body": {
                    "message": {
                        "body": event.message,
                        "classification": event.classification,
                        "status": event.status,
                    }
                },
                "request": {
                    "url": event.uri,
                    "method": event.method,
                    "id": event.request_id,
                },
                "custom": event.extra,
            }
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Status(status.as_u16()));
        }

        let parsed: ItemResponse = response
            .json()
            .await
            .map_err(|e| ReportError::Malformed(e.to_string()))?;
        Ok(ReportToken(parsed.result.uuid))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    fn event() -> ReportEvent {
        ReportEvent {
            message: "rejected sql query".to_owned(),
            classification: "database",
            status: 500,
            method: "GET".to_owned(),
            uri: "/users".to_owned(),
            request_id: "req-1".to_owned(),
            extra: None,
        }
    }

    #[tokio::test]
    async fn posts_the_item_and_returns_the_uuid() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/1/item/")
                    .json_body_includes(r#"{"access_token": "tok", "data": {"level": "error"}}"#);
                then.status(200)
                    .json_body(serde_json::json!({"result": {"uuid": "occ-123"}}));
            })
            .await;

        let reporter = RollbarReporter::new("tok")
            .with_endpoint(server.url("/api/1/item/"));
        let token = reporter.report(&event()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(token, ReportToken("occ-123".to_owned()));
    }

    #[tokio::test]
    async fn client_errors_report_at_warning_level() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/1/item/")
                    .json_body_includes(r#"{"data": {"level": "warning"}}"#);
                then.status(200)
                    .json_body(serde_json::json!({"result": {"uuid": "occ-9"}}));
            })
            .await;

        let reporter = RollbarReporter::new("tok")
            .with_endpoint(server.url("/api/1/item/"));
        let mut warn_event = event();
        warn_event.status = 422;
        reporter.report(&warn_event).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn collector_rejection_surfaces_the_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/1/item/");
                then.status(403);
            })
            .await;

        let reporter = RollbarReporter::new("bad")
            .with_endpoint(server.url("/api/1/item/"));
        let err = reporter.report(&event()).await.unwrap_err();
        assert!(matches!(err, ReportError::Status(403)));
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/1/item/");
                then.status(200).body("not json");
            })
            .await;

        let reporter = RollbarReporter::new("tok")
            .with_endpoint(server.url("/api/1/item/"));
        let err = reporter.report(&event()).await.unwrap_err();
        assert!(matches!(err, ReportError::Malformed(_)));
    }
}
