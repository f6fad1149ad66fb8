//! Route tagging via response extensions.
//!
//! Routes declare metadata the finishing middleware reads after the handler
//! has run: the resource name for envelopes and templates, access-log
//! exemptions, and handler-supplied log payloads. [`tag_response`] attaches a
//! value to every response passing through a route subtree without touching
//! handler signatures; handlers can still override it by inserting their own.

use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::{Request, Response};
use tower::{Layer, Service};

/// The resource name used for list envelopes and template lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource(Cow<'static, str>);

impl Resource {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Marks a response as exempt from access logging (health checks and the
/// like).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessLogExempt;

/// Extra structured payload a handler wants merged into its access record.
#[derive(Debug, Clone)]
pub struct LogPayload(pub serde_json::Value);

/// Layer that inserts `value` into the extensions of every response, unless
/// the handler already inserted one of the same type.
pub fn tag_response<T>(value: T) -> TagLayer<T>
where
    T: Clone + Send + Sync + 'static,
{
    TagLayer { value }
}

#[derive(Debug, Clone)]
pub struct TagLayer<T> {
    value: T,
}

impl<S, T: Clone> Layer<S> for TagLayer<T> {
    type Service = TagService<S, T>;

    fn layer(&self, inner: S) -> Self::Service {
        TagService {
            inner,
            value: self.value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TagService<S, T> {
    inner: S,
    value: T,
}

impl<S, T, ReqBody, ResBody> Service<Request<ReqBody>> for TagService<S, T>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let value = self.value.clone();
        let future = self.inner.call(req);
        Box::pin(async move {
            let mut response = future.await?;
            if response.extensions().get::<T>().is_none() {
                response.extensions_mut().insert(value);
            }
            Ok(response)
        })
    }
}
