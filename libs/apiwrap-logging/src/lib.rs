//! Structured request logging for apiwrap
//!
//! This crate provides the logging half of the wrapping layer:
//! - one structured access record per completed request (`RequestRecord`),
//!   routed by severity (>= 500 error, >= 400 warn, else info)
//! - full error-chain records for unexpected failures (`TracebackRecord`)
//! - redaction of secret-bearing query pairs before emission (`scrub`)
//! - an explicitly constructed subscriber service (`LogService`) initialized
//!   once at process startup and torn down at shutdown
//!
//! Records are emitted as structured `tracing` events; the subscriber
//! installed by [`LogService::init`] renders them as JSON lines on stdout
//! (or pretty human output in debug mode, or a rotated file sink).

pub mod record;
pub mod scrub;
pub mod service;
pub mod traceback;

pub use record::RequestRecord;
pub use scrub::scrub;
pub use service::{LogFormat, LogInitError, LogService, LogSettings};
pub use traceback::TracebackRecord;
