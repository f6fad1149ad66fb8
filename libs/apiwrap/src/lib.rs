//! Request wrapping layer for axum services.
//!
//! `apiwrap` takes care of everything a JSON API response should carry on
//! the way out so handlers do not have to: a consistent error payload with
//! human and machine messages, a response envelope with request metadata,
//! format negotiation (JSON, HTML via filesystem templates, plain text),
//! request-id stamping and echo, access logging with secret redaction, and
//! best-effort reporting of unexpected failures to a Rollbar-compatible
//! collector.
//!
//! ```no_run
//! use apiwrap::{Params, Resource, Settings, WebError, Wrap, tag_response};
//! use apiwrap_logging::LogService;
//! use axum::{Json, Router, routing::get};
//!
//! async fn list_users(params: Params) -> Result<Json<serde_json::Value>, WebError> {
//!     let _page = params.integer("page")?;
//!     Ok(Json(serde_json::json!([{"name": "ada"}])))
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::from_env()?;
//! let logger = LogService::init(&settings.log)?;
//! let users = Router::new()
//!     .route("/users", get(list_users))
//!     .layer(tag_response(Resource::new("users")));
//! let app = Wrap::new(settings, logger)?.apply(users);
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod format;
pub mod middleware;
pub mod params;
pub mod reporting;
pub mod tag;
pub mod templates;
pub mod wrap;

pub use config::{ConfigError, Settings};
pub use envelope::Cardinality;
pub use error::{ErrorBody, ErrorInfo, ErrorPayload, WebError};
pub use format::ResponseFormat;
pub use params::Params;
pub use reporting::{ErrorReporter, ReportError, ReportEvent, ReportToken, RollbarReporter};
pub use tag::{AccessLogExempt, LogPayload, Resource, tag_response};
pub use templates::{TemplateError, TemplateStore};
pub use wrap::Wrap;
