//! The logging service: subscriber setup and record emission.
//!
//! The subscriber is installed by an explicitly constructed [`LogService`]
//! rather than ambient module-level setup, so ownership of the sink (and its
//! flush-on-drop guard) is visible at the process entry point.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::record::RequestRecord;
use crate::scrub::scrub;
use crate::traceback::TracebackRecord;

/// Output shape of the log stream.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Structured JSON lines, one per record.
    #[default]
    Json,
    /// Human-oriented multi-line output for local debugging.
    Pretty,
}

/// Settings for [`LogService::init`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogSettings {
    /// Level filter directive, e.g. `info` or `apiwrap=debug`.
    pub level: String,
    pub format: LogFormat,
    /// When set, records go to a daily-rotated file in this directory
    /// instead of stdout.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::default(),
            directory: None,
            file_prefix: "access.log".to_owned(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("invalid level filter: {0}")]
    Filter(String),
    #[error("failed to install subscriber: {0}")]
    Subscriber(String),
}

/// Owns the installed subscriber's sink guard and emits the structured
/// records defined in this crate. Construct once at startup with
/// [`LogService::init`]; call [`LogService::shutdown`] (or drop) at process
/// end to flush the non-blocking writer.
pub struct LogService {
    guard: Option<WorkerGuard>,
}

impl LogService {
    /// Install the global subscriber according to `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the level directive does not parse or a global
    /// subscriber is already installed.
    pub fn init(settings: &LogSettings) -> Result<Self, LogInitError> {
        let filter = EnvFilter::try_new(&settings.level)
            .map_err(|e| LogInitError::Filter(e.to_string()))?;

        let (make_writer, guard) = match &settings.directory {
            Some(dir) => {
                let appender = tracing_appender::rolling::daily(dir, &settings.file_prefix);
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                (BoxMakeWriter::new(non_blocking), Some(guard))
            }
            None => (BoxMakeWriter::new(std::io::stdout), None),
        };

        let fmt_layer = match settings.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(make_writer)
                .boxed(),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| LogInitError::Subscriber(e.to_string()))?;

        Ok(Self { guard })
    }

    /// A service that installs nothing and emits into whatever subscriber is
    /// already active. Useful in tests and embedded setups where the host
    /// application owns the subscriber.
    #[must_use]
    pub fn disabled() -> Self {
        Self { guard: None }
    }

    /// Emit one access record, routed by severity, secrets scrubbed.
    pub fn request(&self, record: &RequestRecord) {
        let uri = scrub(&record.uri);
        let extra = record
            .extra
            .as_ref()
            .map(|v| scrub(&v.to_string()).into_owned());

        match record.severity() {
            Level::ERROR => tracing::error!(
                target: "apiwrap::access",
                status = record.status,
                method = %record.method,
                uri = %uri,
                reason = %record.reason,
                ms = record.ms,
                rollbar = record.rollbar.as_deref(),
                extra = extra.as_deref(),
                "request"
            ),
            Level::WARN => tracing::warn!(
                target: "apiwrap::access",
                status = record.status,
                method = %record.method,
                uri = %uri,
                reason = %record.reason,
                ms = record.ms,
                rollbar = record.rollbar.as_deref(),
                extra = extra.as_deref(),
                "request"
            ),
            _ => tracing::info!(
                target: "apiwrap::access",
                status = record.status,
                method = %record.method,
                uri = %uri,
                reason = %record.reason,
                ms = record.ms,
                rollbar = record.rollbar.as_deref(),
                extra = extra.as_deref(),
                "request"
            ),
        }
    }

    /// Emit a full error-chain record at error level.
    pub fn traceback(&self, record: &TracebackRecord) {
        let context = record
            .context
            .as_ref()
            .map(|v| scrub(&v.to_string()).into_owned());

        tracing::error!(
            target: "apiwrap::traceback",
            traceback = ?record.traceback,
            rollbar = record.rollbar.as_deref(),
            context = context.as_deref(),
            "traceback"
        );
    }

    /// Flush and release the sink. Dropping the service has the same effect.
    pub fn shutdown(self) {
        drop(self.guard);
    }
}
