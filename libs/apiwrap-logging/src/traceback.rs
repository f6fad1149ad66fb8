//! Error-chain records for unexpected failures.

use serde::Serialize;

/// A captured error chain, emitted alongside (not instead of) the access
/// record when a request fails unexpectedly. Also used for secondary
/// failures of the reporting path itself.
#[derive(Debug, Clone, Serialize)]
pub struct TracebackRecord {
    /// One line per error in the source chain, outermost first.
    pub traceback: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollbar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl TracebackRecord {
    /// Capture the full `source` chain of an error, outermost first.
    #[must_use]
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut traceback = Vec::new();
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
        while let Some(e) = current {
            traceback.push(e.to_string());
            current = e.source();
        }
        Self {
            traceback,
            rollbar: None,
            context: None,
        }
    }

    /// Build from pre-formatted chain lines (e.g. an `anyhow` chain).
    #[must_use]
    pub fn from_chain(traceback: Vec<String>) -> Self {
        Self {
            traceback,
            rollbar: None,
            context: None,
        }
    }

    #[must_use]
    pub fn with_rollbar(mut self, token: impl Into<String>) -> Self {
        self.rollbar = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "root cause")
        }
    }

    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "outer failure")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn walks_the_source_chain() {
        let tb = TracebackRecord::from_error(&Outer(Inner));
        assert_eq!(tb.traceback, vec!["outer failure", "root cause"]);
    }

    #[test]
    fn serializes_chain_and_context() {
        let tb = TracebackRecord::from_chain(vec!["boom".to_owned()])
            .with_context(serde_json::json!({"request": "abc"}));
        let json = serde_json::to_string(&tb).unwrap();
        assert!(json.contains("\"traceback\":[\"boom\"]"));
        assert!(json.contains("\"request\":\"abc\""));
        assert!(!json.contains("rollbar"));
    }
}
