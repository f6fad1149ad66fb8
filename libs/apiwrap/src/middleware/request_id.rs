//! Request identification.
//!
//! Every request carries an `X-Request-Id`: the client's own value when it
//! sent one, otherwise a fresh UUIDv4. The id is echoed on the response,
//! stamped into the envelope's `meta.request`, and attached to the request
//! span, so one identifier ties the access log, the error report and the
//! client's copy of the response together.

use http::{HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[must_use]
pub fn header() -> HeaderName {
    HeaderName::from_static(REQUEST_ID_HEADER)
}

/// Generates a UUIDv4 id. `SetRequestIdLayer` only calls this when the
/// request did not bring its own, which gives echo semantics for free.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// The request id as currently stamped on the headers.
#[must_use]
pub fn from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
}
