//! Response body shaping.
//!
//! JSON bodies leaving the service all carry a `meta` object with the final
//! status and the request id. Lists additionally get wrapped under their
//! resource name with a `meta.total` count. A `meta.status` already present
//! in the body wins and is promoted to the response status line.

use http::StatusCode;
use serde_json::{Map, Value, json};

/// Whether the handler produced one thing or a collection. Drives template
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::One => "one",
            Self::Many => "many",
        }
    }
}

#[derive(Debug)]
pub struct Shaped {
    pub status: StatusCode,
    pub body: Value,
    pub cardinality: Cardinality,
}

/// Shape a handler body into the response envelope.
///
/// Arrays become `{"<resource>": [...], "meta": {"total": n, ...}}`; objects
/// get `meta` injected in place. Scalars pass through untouched.
#[must_use]
pub fn shape(body: Value, resource: &str, status: StatusCode, request_id: &str) -> Shaped {
    match body {
        Value::Array(items) => {
            let total = items.len();
            let mut map = Map::new();
            map.insert(resource.to_owned(), Value::Array(items));
            map.insert("meta".to_owned(), json!({ "total": total }));
            Shaped {
                status: inject_meta(&mut map, status, request_id),
                body: Value::Object(map),
                cardinality: Cardinality::Many,
            }
        }
        Value::Object(mut map) => Shaped {
            status: inject_meta(&mut map, status, request_id),
            body: Value::Object(map),
            cardinality: Cardinality::One,
        },
        other => Shaped {
            status,
            body: other,
            cardinality: Cardinality::One,
        },
    }
}

/// Ensure `meta.status` and `meta.request` are set; return the status the
/// response should carry (the body's own `meta.status` when present and
/// valid).
fn inject_meta(map: &mut Map<String, Value>, status: StatusCode, request_id: &str) -> StatusCode {
    let meta = map
        .entry("meta".to_owned())
        .or_insert_with(|| Value::Object(Map::new()));

    let Value::Object(meta) = meta else {
        // A non-object `meta` is the handler's own; leave it be.
        return status;
    };

    let effective = meta
        .get("status")
        .and_then(declared_status)
        .unwrap_or(status);

    meta.insert("status".to_owned(), json!(effective.as_u16()));
    meta.insert("request".to_owned(), json!(request_id));
    effective
}

fn declared_status(value: &Value) -> Option<StatusCode> {
    let code = match value {
        Value::Number(n) => u16::try_from(n.as_u64()?).ok()?,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    StatusCode::from_u16(code).ok()
}
