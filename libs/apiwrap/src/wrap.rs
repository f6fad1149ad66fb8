//! Wiring: attach the whole layer stack to a router.

use std::sync::Arc;

use apiwrap_logging::LogService;
use axum::Router;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

use crate::config::{ConfigError, Settings};
use crate::middleware::finish;
use crate::middleware::request_id::{self, MakeReqId};
use crate::reporting::{ErrorReporter, RollbarReporter};
use crate::templates::TemplateStore;

pub(crate) struct WrapState {
    pub(crate) settings: Settings,
    pub(crate) templates: Option<TemplateStore>,
    pub(crate) reporter: Option<Arc<dyn ErrorReporter>>,
    pub(crate) logger: LogService,
}

/// Builder for the wrapping stack. Construct with validated [`Settings`] and
/// a [`LogService`], then [`apply`](Wrap::apply) it to the application
/// router.
pub struct Wrap {
    settings: Settings,
    reporter: Option<Arc<dyn ErrorReporter>>,
    logger: LogService,
}

impl Wrap {
    /// # Errors
    ///
    /// Returns an error when the settings do not validate.
    pub fn new(settings: Settings, logger: LogService) -> Result<Self, ConfigError> {
        settings.validate()?;
        let reporter = settings
            .rollbar_access_token
            .as_ref()
            .map(|token| Arc::new(RollbarReporter::new(token.clone())) as Arc<dyn ErrorReporter>);
        Ok(Self {
            settings,
            reporter,
            logger,
        })
    }

    /// Replace the reporter built from settings (or install one when no
    /// access token was configured).
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Wrap `router` with the full stack: request-id stamping and echo on
    /// the outside, the finishing middleware inside it.
    #[must_use]
    pub fn apply(self, router: Router) -> Router {
        let templates = self.settings.template_path.as_ref().map(|root| {
            let mut store = TemplateStore::new(root);
            if let Some(name) = &self.settings.error_template {
                store = store.with_error_template(name.clone());
            }
            store
        });
        let state = Arc::new(WrapState {
            settings: self.settings,
            templates,
            reporter: self.reporter,
            logger: self.logger,
        });

        let header = request_id::header();
        router
            .layer(axum::middleware::from_fn_with_state(state, finish::finish))
            .layer(PropagateRequestIdLayer::new(header.clone()))
            .layer(SetRequestIdLayer::new(header, MakeReqId))
    }
}
