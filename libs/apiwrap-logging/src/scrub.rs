//! Redaction of secret-bearing key/value pairs.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Matches `key=value` pairs whose key mentions a secret-ish word.
/// The value runs until the next `&` or whitespace.
static FILTER_SECRETS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)([\w-]*(?:secret|token|auth|password)[\w-]*)=([^&\s]+)")
        .expect("secret filter regex")
});

/// Replace the value of any secret-bearing `key=value` pair with `[secret]`.
///
/// Applied to request URIs and serialized extra payloads before they reach
/// the log sink, so access records never leak credentials passed in query
/// strings.
#[must_use]
pub fn scrub(input: &str) -> Cow<'_, str> {
    FILTER_SECRETS.replace_all(input, "${1}=[secret]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_token_values() {
        assert_eq!(
            scrub("/api?access_token=abc123&x=1"),
            "/api?access_token=[secret]&x=1"
        );
    }

    #[test]
    fn redacts_all_secret_keys() {
        let scrubbed = scrub("secret=a&my_password=b&auth=c&plain=d");
        assert_eq!(scrubbed, "secret=[secret]&my_password=[secret]&auth=[secret]&plain=d");
    }

    #[test]
    fn is_case_insensitive() {
        assert_eq!(scrub("API_TOKEN=xyz"), "API_TOKEN=[secret]");
    }

    #[test]
    fn leaves_clean_input_alone() {
        let input = "/users?page=2&limit=50";
        assert!(matches!(scrub(input), Cow::Borrowed(_)));
    }

    #[test]
    fn stops_at_pair_boundary() {
        assert_eq!(
            scrub("token=abc def=1"),
            "token=[secret] def=1"
        );
    }
}
