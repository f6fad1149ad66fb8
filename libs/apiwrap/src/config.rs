//! Settings layering: in-code defaults, then environment.
//!
//! Everything can be set through `APIWRAP_*` variables (nested fields with
//! `__`, e.g. `APIWRAP_LOG__LEVEL=debug`). A few short legacy variables are
//! honored on top: `DEBUG`, `LOGLVL` and `ROLLBAR_TOKEN`.

use std::path::PathBuf;

use apiwrap_logging::{LogFormat, LogSettings};
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Pretty logs and local-development behavior.
    pub debug: bool,
    /// Resource name for list envelopes when the route carries no
    /// [`crate::tag::Resource`] tag.
    pub default_resource: String,
    /// Template (relative to `template_path`) rendered for every error page.
    pub error_template: Option<String>,
    /// Root of the template tree. Unset disables template rendering.
    pub template_path: Option<PathBuf>,
    /// Enables the built-in Rollbar reporter when set.
    pub rollbar_access_token: Option<String>,
    pub log: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            default_resource: "results".to_owned(),
            error_template: None,
            template_path: None,
            rollbar_access_token: None,
            log: LogSettings::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`error_template` requires `template_path` to be set")]
    ErrorTemplateWithoutPath,
    #[error("failed to load settings: {0}")]
    Extract(#[from] Box<figment::Error>),
}

impl Settings {
    /// Load settings from the environment on top of defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable fails to deserialize or the result
    /// does not [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("APIWRAP_").split("__"))
            .extract()
            .map_err(Box::new)?;

        // Legacy short names, kept for drop-in compatibility.
        if let Ok(value) = std::env::var("DEBUG") {
            settings.debug = value.eq_ignore_ascii_case("true") || value == "1";
        }
        if settings.debug {
            settings.log.format = LogFormat::Pretty;
            settings.log.level = "debug".to_owned();
        }
        if let Ok(value) = std::env::var("LOGLVL") {
            settings.log.level = value.to_lowercase();
        }
        if let Ok(value) = std::env::var("ROLLBAR_TOKEN") {
            if !value.is_empty() {
                settings.rollbar_access_token = Some(value);
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// `ErrorTemplateWithoutPath` when `error_template` is set without a
    /// `template_path` to resolve it against.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.error_template.is_some() && self.template_path.is_none() {
            return Err(ConfigError::ErrorTemplateWithoutPath);
        }
        Ok(())
    }
}
