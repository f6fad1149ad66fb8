//! Filesystem templates for HTML and text representations.
//!
//! Templates live under a configured root, organized by format:
//! `html/users_get_many.html`, `txt/errors/404.txt`. Substitution is plain
//! string replacement of `{{path.to.field}}` markers from the shaped payload,
//! plus `{{json}}` for the whole payload pretty-printed. No template engine,
//! no logic in templates.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::envelope::Cardinality;
use crate::format::ResponseFormat;

/// Addresses one template file relative to the store root.
#[derive(Debug, Clone, Copy)]
pub enum TemplateKey<'a> {
    /// `{format}/{resource}_{method}_{one|many}.{format}`
    Success {
        format: ResponseFormat,
        resource: &'a str,
        method: &'a str,
        cardinality: Cardinality,
    },
    /// `{format}/errors/{status}.{format}`
    Error {
        format: ResponseFormat,
        status: StatusCode,
    },
}

impl TemplateKey<'_> {
    #[must_use]
    pub fn relative_path(&self) -> String {
        match self {
            Self::Success {
                format,
                resource,
                method,
                cardinality,
            } => {
                let ext = format.extension();
                format!(
                    "{ext}/{resource}_{method}_{card}.{ext}",
                    method = method.to_lowercase(),
                    card = cardinality.as_str()
                )
            }
            Self::Error { format, status } => {
                let ext = format.extension();
                format!("{ext}/errors/{status}.{ext}", status = status.as_u16())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found at {0}")]
    NotFound(String),
    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Loads and fills templates from a directory tree.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
    error_template: Option<String>,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            error_template: None,
        }
    }

    /// A single template (path relative to the root) used for every error
    /// page, tried before the per-status convention.
    #[must_use]
    pub fn with_error_template(mut self, name: impl Into<String>) -> Self {
        self.error_template = Some(name.into());
        self
    }

    /// # Errors
    ///
    /// `NotFound` when no file exists at the key's path, `Io` on any other
    /// read failure.
    pub fn render(&self, key: &TemplateKey<'_>, payload: &Value) -> Result<String, TemplateError> {
        self.render_file(&key.relative_path(), payload)
    }

    /// Render an error payload: the configured `error_template` first, then
    /// the per-status convention path.
    ///
    /// # Errors
    ///
    /// `NotFound` when neither file exists.
    pub fn render_error(
        &self,
        format: ResponseFormat,
        status: StatusCode,
        payload: &Value,
    ) -> Result<String, TemplateError> {
        let payload = with_status_var(payload, status);
        if let Some(name) = &self.error_template {
            match self.render_file(name, &payload) {
                Err(TemplateError::NotFound(_)) => {}
                other => return other,
            }
        }
        self.render(&TemplateKey::Error { format, status }, &payload)
    }

    fn render_file(&self, relative: &str, payload: &Value) -> Result<String, TemplateError> {
        let path = self.root.join(relative);
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TemplateError::NotFound(relative.to_owned()));
            }
            Err(source) => {
                return Err(TemplateError::Io {
                    path: relative.to_owned(),
                    source,
                });
            }
        };
        Ok(fill(&source, payload))
    }
}

/// Replace `{{var}}` markers with values from the payload. Nested fields are
/// addressed with dots; `{{json}}` expands to the whole payload.
#[must_use]
pub fn fill(source: &str, payload: &Value) -> String {
    let mut vars = BTreeMap::new();
    flatten(String::new(), payload, &mut vars);

    let mut out = source.to_owned();
    for (key, value) in &vars {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out.replace(
        "{{json}}",
        &serde_json::to_string_pretty(payload).unwrap_or_default(),
    )
}

fn flatten(prefix: String, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(path, child, out);
            }
        }
        // Arrays are only reachable through {{json}}.
        Value::Array(_) => {}
        Value::String(s) => {
            out.insert(prefix, s.clone());
        }
        other => {
            out.insert(prefix, other.to_string());
        }
    }
}

fn with_status_var(payload: &Value, status: StatusCode) -> Value {
    let mut payload = payload.clone();
    if let Value::Object(map) = &mut payload {
        map.entry("status".to_owned())
            .or_insert_with(|| Value::from(status.as_u16()));
    }
    payload
}

/// The built-in error page used when no template directory is configured or
/// no error template matches. Shows the human message and the full payload
/// for debugging.
#[must_use]
pub fn default_error_page(status: StatusCode, for_human: &str, payload: &Value) -> String {
    let pretty = serde_json::to_string_pretty(payload).unwrap_or_default();
    format!(
        "<html>\n<head><title>{code} {reason}</title></head>\n<body>\n<h1>{code}</h1>\n<pre>{human}</pre>\n<pre>{json}</pre>\n</body>\n</html>\n",
        code = status.as_u16(),
        reason = status.canonical_reason().unwrap_or(""),
        human = escape_html(for_human),
        json = escape_html(&pretty),
    )
}

/// Plain-text counterpart of [`default_error_page`].
#[must_use]
pub fn default_error_text(status: StatusCode, for_human: &str, payload: &Value) -> String {
    let pretty = serde_json::to_string_pretty(payload).unwrap_or_default();
    format!("{code} {for_human}\n\n{pretty}\n", code = status.as_u16())
}

#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, TemplateStore) {
        let dir = tempfile::tempdir().unwrap();
        for (relative, content) in files {
            let path = dir.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            let mut file = fs::File::create(path).unwrap();
            file.write_all(content.as_bytes()).unwrap();
        }
        let store = TemplateStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn success_keys_follow_the_convention() {
        let key = TemplateKey::Success {
            format: ResponseFormat::Html,
            resource: "users",
            method: "GET",
            cardinality: Cardinality::Many,
        };
        assert_eq!(key.relative_path(), "html/users_get_many.html");
    }

    #[test]
    fn error_keys_follow_the_convention() {
        let key = TemplateKey::Error {
            format: ResponseFormat::Text,
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(key.relative_path(), "txt/errors/404.txt");
    }

    #[test]
    fn fill_substitutes_nested_fields() {
        let payload = json!({"user": {"name": "ada"}, "meta": {"total": 3}});
        let out = fill("hi {{user.name}}, {{meta.total}} results", &payload);
        assert_eq!(out, "hi ada, 3 results");
    }

    #[test]
    fn fill_leaves_unknown_markers_alone() {
        assert_eq!(fill("{{nope}}", &json!({})), "{{nope}}");
    }

    #[test]
    fn renders_a_success_template_from_disk() {
        let (_dir, store) = store_with(&[(
            "html/users_get_one.html",
            "<p>{{users.name}}</p>",
        )]);
        let key = TemplateKey::Success {
            format: ResponseFormat::Html,
            resource: "users",
            method: "get",
            cardinality: Cardinality::One,
        };
        let out = store.render(&key, &json!({"users": {"name": "ada"}})).unwrap();
        assert_eq!(out, "<p>ada</p>");
    }

    #[test]
    fn missing_template_is_not_found() {
        let (_dir, store) = store_with(&[]);
        let key = TemplateKey::Error {
            format: ResponseFormat::Html,
            status: StatusCode::NOT_FOUND,
        };
        let err = store.render(&key, &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(p) if p == "html/errors/404.html"));
    }

    #[test]
    fn configured_error_template_wins_over_convention() {
        let (_dir, store) = store_with(&[
            ("custom.html", "custom {{status}}"),
            ("html/errors/500.html", "convention"),
        ]);
        let store = store.with_error_template("custom.html");
        let out = store
            .render_error(
                ResponseFormat::Html,
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({}),
            )
            .unwrap();
        assert_eq!(out, "custom 500");
    }

    #[test]
    fn falls_back_to_convention_when_custom_is_missing() {
        let (_dir, store) = store_with(&[("html/errors/404.html", "gone")]);
        let store = store.with_error_template("custom.html");
        let out = store
            .render_error(ResponseFormat::Html, StatusCode::NOT_FOUND, &json!({}))
            .unwrap();
        assert_eq!(out, "gone");
    }

    #[test]
    fn default_page_escapes_and_embeds_the_payload() {
        let payload = json!({"error": {"for_human": "nope"}, "uri": "/x"});
        let page = default_error_page(StatusCode::BAD_REQUEST, "<nope>", &payload);
        assert!(page.contains("<h1>400</h1>"));
        assert!(page.contains("<pre>&lt;nope&gt;</pre>"));
        assert!(page.contains("&quot;uri&quot;"));
    }
}
