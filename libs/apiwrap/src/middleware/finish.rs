//! The finishing middleware.
//!
//! Runs outside every route: it opens the request span, and once the handler
//! is done it shapes the body into the response envelope, renders it in the
//! negotiated format, reports unexpected failures, fixes up headers and
//! emits the access record. Handlers stay thin; everything a response must
//! carry on the way out lives here.

use std::sync::Arc;
use std::time::Instant;

use apiwrap_logging::{RequestRecord, TracebackRecord};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::response::Parts;
use http::{HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use serde_json::{Value, json};
use tracing::Instrument;

use crate::envelope::{self, Shaped};
use crate::error::{ErrorBody, ErrorInfo};
use crate::format::ResponseFormat;
use crate::middleware::request_id;
use crate::reporting::ReportEvent;
use crate::tag::{AccessLogExempt, LogPayload, Resource};
use crate::templates::{self, TemplateError, TemplateKey};
use crate::wrap::WrapState;

const ROLLBAR_TOKEN_HEADER: &str = "x-rollbar-token";

pub(crate) struct FinishContext {
    started: Instant,
    method: Method,
    uri: Uri,
    requested: Option<ResponseFormat>,
    request_id: String,
}

pub(crate) async fn finish(
    State(state): State<Arc<WrapState>>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let requested = ResponseFormat::negotiate(uri.path(), req.headers());
    let request_id = request_id::from_headers(req.headers())
        .unwrap_or_default()
        .to_owned();

    let span = tracing::info_span!(
        "request",
        method = %method,
        path = %uri.path(),
        request_id = %request_id,
    );
    let response = next.run(req).instrument(span).await;

    let ctx = FinishContext {
        started,
        method,
        uri,
        requested,
        request_id,
    };
    state.finalize(response, ctx).await
}

impl WrapState {
    pub(crate) async fn finalize(&self, response: Response, ctx: FinishContext) -> Response {
        let (mut parts, body) = response.into_parts();

        let mut error = parts.extensions.remove::<ErrorInfo>();
        if error.is_none()
            && (parts.status.is_client_error() || parts.status.is_server_error())
        {
            // Responses that bypassed the error type, e.g. the router's own
            // 404 and 405.
            error = Some(ErrorInfo::synthesized(parts.status));
        }

        // Non-JSON successes (static files, streams) pass through untouched.
        if error.is_none() && !is_json(&parts.headers) {
            parts.headers.remove(header::SERVER);
            self.log_request(&parts, &ctx, None, None);
            return Response::from_parts(parts, body);
        }

        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .unwrap_or_default();

        let mut rollbar = None;
        if let Some(info) = &error {
            if !info.expected {
                rollbar = self.report_and_trace(info, &ctx).await;
            }
        }

        let resource = parts.extensions.get::<Resource>().map_or_else(
            || self.settings.default_resource.clone(),
            |r| r.as_str().to_owned(),
        );

        let payload = match &error {
            Some(info) => {
                let mut value = serde_json::to_value(ErrorBody::from_info(info, rollbar.clone()))
                    .unwrap_or_else(|_| json!({}));
                if let Value::Object(map) = &mut value {
                    map.insert("uri".to_owned(), json!(ctx.uri.to_string()));
                }
                value
            }
            None => match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => value,
                Err(_) => {
                    // Declared JSON but not parseable; leave it alone.
                    parts.headers.remove(header::SERVER);
                    self.log_request(&parts, &ctx, None, None);
                    return Response::from_parts(parts, Body::from(bytes));
                }
            },
        };

        let shaped = envelope::shape(payload, &resource, parts.status, &ctx.request_id);
        parts.status = shaped.status;

        let format = ctx.requested.unwrap_or(if error.is_some() {
            ResponseFormat::Html
        } else {
            ResponseFormat::Json
        });
        let rendered = match format {
            ResponseFormat::Json => serde_json::to_string(&shaped.body).unwrap_or_default(),
            ResponseFormat::Html | ResponseFormat::Text => {
                self.render_page(format, &shaped, error.as_ref(), &resource, &ctx)
            }
        };

        parts.headers.remove(header::SERVER);
        parts.headers.remove(header::CONTENT_LENGTH);
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(format.content_type()),
        );
        if parts.status == StatusCode::UNAUTHORIZED {
            parts.headers.insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=Restricted"),
            );
        }
        if let Some(token) = &rollbar {
            if let Ok(value) = HeaderValue::from_str(token) {
                parts
                    .headers
                    .insert(HeaderName::from_static(ROLLBAR_TOKEN_HEADER), value);
            }
        }

        self.log_request(&parts, &ctx, error.as_ref(), rollbar.as_deref());
        Response::from_parts(parts, Body::from(rendered))
    }

    /// Emit the traceback record and, when a reporter is configured, push the
    /// failure upstream. Reporting failures are themselves logged, never
    /// surfaced.
    async fn report_and_trace(&self, info: &ErrorInfo, ctx: &FinishContext) -> Option<String> {
        let mut record = TracebackRecord::from_chain(info.chain.clone()).with_context(json!({
            "request": ctx.request_id,
            "uri": ctx.uri.to_string(),
        }));

        let mut token = None;
        if let Some(reporter) = &self.reporter {
            let event = ReportEvent {
                message: info.for_robot.clone(),
                classification: info.classification,
                status: info.status.as_u16(),
                method: ctx.method.to_string(),
                uri: ctx.uri.to_string(),
                request_id: ctx.request_id.clone(),
                extra: None,
            };
            match reporter.report(&event).await {
                Ok(t) => {
                    record = record.with_rollbar(t.0.clone());
                    token = Some(t.0);
                }
                Err(err) => {
                    self.logger.traceback(&TracebackRecord::from_error(&err).with_context(
                        json!({"request": ctx.request_id, "stage": "error-reporting"}),
                    ));
                }
            }
        }

        self.logger.traceback(&record);
        token
    }

    fn render_page(
        &self,
        format: ResponseFormat,
        shaped: &Shaped,
        error: Option<&ErrorInfo>,
        resource: &str,
        ctx: &FinishContext,
    ) -> String {
        match error {
            Some(info) => {
                if let Some(store) = &self.templates {
                    match store.render_error(format, shaped.status, &shaped.body) {
                        Ok(page) => return page,
                        Err(TemplateError::NotFound(_)) => {}
                        Err(err) => {
                            self.logger.traceback(
                                &TracebackRecord::from_error(&err)
                                    .with_context(json!({"request": ctx.request_id})),
                            );
                        }
                    }
                }
                match format {
                    ResponseFormat::Text => {
                        templates::default_error_text(shaped.status, &info.for_human, &shaped.body)
                    }
                    _ => {
                        templates::default_error_page(shaped.status, &info.for_human, &shaped.body)
                    }
                }
            }
            None => {
                let method = ctx.method.as_str().to_lowercase();
                let key = TemplateKey::Success {
                    format,
                    resource,
                    method: &method,
                    cardinality: shaped.cardinality,
                };
                match &self.templates {
                    Some(store) => match store.render(&key, &shaped.body) {
                        Ok(page) => page,
                        Err(err) => {
                            if let TemplateError::Io { .. } = &err {
                                self.logger.traceback(
                                    &TracebackRecord::from_error(&err)
                                        .with_context(json!({"request": ctx.request_id})),
                                );
                            }
                            err.to_string()
                        }
                    },
                    None => TemplateError::NotFound(key.relative_path()).to_string(),
                }
            }
        }
    }

    fn log_request(
        &self,
        parts: &Parts,
        ctx: &FinishContext,
        error: Option<&ErrorInfo>,
        rollbar: Option<&str>,
    ) {
        if parts.extensions.get::<AccessLogExempt>().is_some() || parts.status.is_redirection() {
            return;
        }

        let mut record = RequestRecord::new(
            parts.status,
            ctx.method.as_str(),
            ctx.uri.to_string(),
            ctx.started.elapsed(),
        );
        if let Some(info) = error {
            record = record.with_reason(info.for_human.clone());
        }
        if let Some(token) = rollbar {
            record = record.with_rollbar(token);
        }
        if let Some(LogPayload(extra)) = parts.extensions.get::<LogPayload>() {
            record = record.with_extra(extra.clone());
        }
        self.logger.request(&record);
    }
}

fn is_json(headers: &http::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            let media = ct.split(';').next().unwrap_or("").trim();
            media == "application/json" || media.ends_with("+json")
        })
}
