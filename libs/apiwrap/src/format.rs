//! Response format negotiation.
//!
//! Clients pick a representation either by path suffix (`/users.json`) or by
//! `Accept` header; the suffix wins. When neither says anything the caller
//! decides the default (successes render JSON, error pages render HTML).

use http::{HeaderMap, header};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Html,
    Text,
}

impl ResponseFormat {
    /// Value for the `Content-Type` header of a rendered response.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Html => "text/html; charset=utf-8",
            Self::Text => "text/plain; charset=utf-8",
        }
    }

    /// Extension used in template paths (`html/...`, `json/...`, `txt/...`).
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
            Self::Text => "txt",
        }
    }

    /// The format explicitly requested by path suffix or `Accept` header,
    /// or `None` when the client expressed no preference.
    #[must_use]
    pub fn negotiate(path: &str, headers: &HeaderMap) -> Option<Self> {
        if let Some(fmt) = Self::from_path(path) {
            return Some(fmt);
        }
        headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::from_accept)
    }

    fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.ends_with(".json") {
            Some(Self::Json)
        } else if trimmed.ends_with(".html") {
            Some(Self::Html)
        } else if trimmed.ends_with(".txt") {
            Some(Self::Text)
        } else {
            None
        }
    }

    fn from_accept(accept: &str) -> Option<Self> {
        // First recognized media type wins; wildcard expresses no preference.
        for part in accept.split(',') {
            let media = part.split(';').next().unwrap_or("").trim();
            match media {
                "application/json" | "text/json" => return Some(Self::Json),
                "text/html" | "application/xhtml+xml" => return Some(Self::Html),
                "text/plain" => return Some(Self::Text),
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use http::HeaderValue;

    fn accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn path_suffix_wins_over_accept() {
        let fmt = ResponseFormat::negotiate("/users.json", &accept("text/html"));
        assert_eq!(fmt, Some(ResponseFormat::Json));
    }

    #[test]
    fn accept_header_is_consulted_in_order() {
        assert_eq!(
            ResponseFormat::negotiate("/users", &accept("text/html,application/json;q=0.9")),
            Some(ResponseFormat::Html)
        );
        assert_eq!(
            ResponseFormat::negotiate("/users", &accept("application/json")),
            Some(ResponseFormat::Json)
        );
        assert_eq!(
            ResponseFormat::negotiate("/users", &accept("text/plain")),
            Some(ResponseFormat::Text)
        );
    }

    #[test]
    fn wildcard_and_absence_mean_no_preference() {
        assert_eq!(ResponseFormat::negotiate("/users", &accept("*/*")), None);
        assert_eq!(ResponseFormat::negotiate("/users", &HeaderMap::new()), None);
    }

    #[test]
    fn trailing_slash_does_not_hide_the_suffix() {
        assert_eq!(
            ResponseFormat::negotiate("/report.txt/", &HeaderMap::new()),
            Some(ResponseFormat::Text)
        );
    }
}
