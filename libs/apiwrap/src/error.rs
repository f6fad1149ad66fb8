//! The request error taxonomy and its wire shape.
//!
//! Handlers return [`WebError`]; the finishing middleware turns it into the
//! `{"error": {...}}` payload, decides whether it is reported upstream, and
//! renders it in the negotiated format. The classification also drives the
//! access-log severity and the reporting policy: only `database`, `internal`
//! and server-side `http` errors are unexpected.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WebError {
    /// A required query argument was absent.
    #[error("Missing required argument `{name}`")]
    MissingArgument { name: String },

    /// Client-supplied data failed validation. `context` lists the offending
    /// field paths when they are known.
    #[error("{message}")]
    Validation {
        message: String,
        context: Vec<String>,
    },

    /// A handler precondition the client can fix. Renders as 400, never
    /// reported.
    #[error("{message}")]
    Assertion { message: String },

    /// The database rejected a query. The raw driver message stays out of
    /// the response body.
    #[error("rejected sql query")]
    Database { detail: String },

    /// A plain HTTP status raised directly, e.g. 404 or 401.
    #[error("{}", reason.as_deref().unwrap_or("http error"))]
    Http {
        status: StatusCode,
        reason: Option<String>,
    },

    /// Anything unexpected. Always 500, always reported.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebError {
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn validation_fields(message: impl Into<String>, context: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            context,
        }
    }

    /// A typed-argument failure, phrased uniformly:
    /// `` Invalid value 10 (int): must be string (at value) ``.
    pub fn invalid_value(value: &str, got: &str, want: &str, field: &str) -> Self {
        Self::Validation {
            message: format!("Invalid value {value} ({got}): must be {want} (at {field})"),
            context: vec![field.to_owned()],
        }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    pub fn database(detail: impl Into<String>) -> Self {
        Self::Database {
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn http(status: StatusCode) -> Self {
        Self::Http {
            status,
            reason: None,
        }
    }

    pub fn http_reason(status: StatusCode, reason: impl Into<String>) -> Self {
        Self::Http {
            status,
            reason: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingArgument { .. } | Self::Validation { .. } | Self::Assertion { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Database { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http { status, .. } => *status,
        }
    }

    #[must_use]
    pub fn classification(&self) -> &'static str {
        match self {
            Self::MissingArgument { .. } => "missing_argument",
            Self::Validation { .. } => "validation",
            Self::Assertion { .. } => "assertion",
            Self::Database { .. } => "database",
            Self::Http { .. } => "http",
            Self::Internal(_) => "internal",
        }
    }

    /// Expected errors are the client's fault; they are logged at warn and
    /// never reported upstream.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        self.status().is_client_error()
    }

    /// Message shown to people, safe to embed in an error page.
    #[must_use]
    pub fn for_human(&self) -> String {
        match self {
            Self::Validation { message, context } if !context.is_empty() => {
                format!("Please review the following fields: {}", context.join(", "))
            }
            Self::Database { .. } | Self::Internal(_) => {
                "There was an internal error. We have been notified and will look into it."
                    .to_owned()
            }
            Self::Http { status, reason } => reason.clone().unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_owned()
            }),
            other => other.to_string(),
        }
    }

    /// Message for machine consumers; may carry detail the human message
    /// elides, but never database internals.
    #[must_use]
    pub fn for_robot(&self) -> String {
        match self {
            Self::Database { .. } => "rejected sql query".to_owned(),
            Self::Internal(err) => err.to_string(),
            Self::Http { status, .. } => format!("http {}", status.as_u16()),
            other => other.to_string(),
        }
    }

    /// The error chain, outermost first, for the traceback log record.
    #[must_use]
    pub fn chain(&self) -> Vec<String> {
        match self {
            Self::Internal(err) => err.chain().map(ToString::to_string).collect(),
            Self::Database { detail } => vec![self.to_string(), detail.clone()],
            other => vec![other.to_string()],
        }
    }
}

/// Snapshot of a [`WebError`] carried through response extensions so the
/// finishing middleware can log, report and re-render it after the handler
/// has already been consumed.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub classification: &'static str,
    pub status: StatusCode,
    pub for_human: String,
    pub for_robot: String,
    pub context: Vec<String>,
    pub expected: bool,
    pub chain: Vec<String>,
}

impl ErrorInfo {
    /// Stand-in for responses that carry an error status but were not
    /// produced through [`WebError`], e.g. the router's own 404 and 405.
    #[must_use]
    pub fn synthesized(status: StatusCode) -> Self {
        let err = WebError::http(status);
        Self::from(&err)
    }
}

impl From<&WebError> for ErrorInfo {
    fn from(err: &WebError) -> Self {
        let context = match err {
            WebError::Validation { context, .. } => context.clone(),
            _ => Vec::new(),
        };
        Self {
            classification: err.classification(),
            status: err.status(),
            for_human: err.for_human(),
            for_robot: err.for_robot(),
            context,
            expected: err.is_expected(),
            chain: err.chain(),
        }
    }
}

/// Wire shape of the `error` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub for_human: String,
    pub for_robot: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,
    /// Error-reporting token, present when the failure was reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollbar: Option<String>,
}

/// Top-level error body: `{"error": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorPayload,
}

impl ErrorBody {
    #[must_use]
    pub fn from_info(info: &ErrorInfo, rollbar: Option<String>) -> Self {
        Self {
            error: ErrorPayload {
                for_human: info.for_human.clone(),
                for_robot: info.for_robot.clone(),
                context: if info.context.is_empty() {
                    None
                } else {
                    Some(info.context.clone())
                },
                rollbar,
            },
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let info = ErrorInfo::from(&self);
        let body = ErrorBody::from_info(&info, None);
        let mut response = (info.status, axum::Json(body)).into_response();
        response.extensions_mut().insert(info);
        response
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn missing_argument_message_names_the_argument() {
        let err = WebError::missing_argument("id");
        assert_eq!(err.to_string(), "Missing required argument `id`");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.is_expected());
    }

    #[test]
    fn invalid_value_message_is_uniform() {
        let err = WebError::invalid_value("10", "int", "string", "value");
        assert_eq!(
            err.for_human(),
            "Invalid value 10 (int): must be string (at value)"
        );
    }

    #[test]
    fn validation_context_redirects_the_human_message() {
        let err = WebError::validation_fields("bad", vec!["name".to_owned(), "age".to_owned()]);
        assert_eq!(
            err.for_human(),
            "Please review the following fields: name, age"
        );
        assert_eq!(err.for_robot(), "bad");
    }

    #[test]
    fn database_detail_never_reaches_the_payload() {
        let err = WebError::database("syntax error near SELECT");
        assert_eq!(err.for_robot(), "rejected sql query");
        assert!(!err.for_human().contains("SELECT"));
        assert!(!err.is_expected());
        assert!(err.chain().iter().any(|l| l.contains("SELECT")));
    }

    #[test]
    fn internal_errors_expose_the_anyhow_chain() {
        let root = anyhow::anyhow!("connection refused");
        let err = WebError::Internal(root.context("loading profile"));
        let chain = err.chain();
        assert_eq!(chain, vec!["loading profile", "connection refused"]);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn http_client_errors_are_expected_server_errors_are_not() {
        assert!(WebError::http(StatusCode::NOT_FOUND).is_expected());
        assert!(!WebError::http(StatusCode::BAD_GATEWAY).is_expected());
    }

    #[test]
    fn into_response_stashes_error_info() {
        let response = WebError::assertion("never gonna happen").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let info = response.extensions().get::<ErrorInfo>().unwrap();
        assert_eq!(info.classification, "assertion");
        assert_eq!(info.for_human, "never gonna happen");
    }

    #[test]
    fn empty_context_is_omitted_from_json() {
        let info = ErrorInfo::from(&WebError::validation("nope"));
        let body = ErrorBody::from_info(&info, None);
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"for_human\":\"nope\""));
        assert!(!json.contains("context"));
        assert!(!json.contains("rollbar"));
    }
}
