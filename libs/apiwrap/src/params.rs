//! Typed access to query arguments.
//!
//! Failures come back as [`WebError`] values so a `?` in the handler produces
//! the standard error payload with the exact argument name in the message.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use http::Uri;
use http::request::Parts;

use crate::error::WebError;

/// Parsed query-string arguments. Repeated keys keep the last value.
#[derive(Debug, Clone, Default)]
pub struct Params(HashMap<String, String>);

impl Params {
    #[must_use]
    pub fn from_uri(uri: &Uri) -> Self {
        let map = uri
            .query()
            .and_then(|q| serde_urlencoded::from_str::<HashMap<String, String>>(q).ok())
            .unwrap_or_default();
        Self(map)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// # Errors
    ///
    /// `MissingArgument` when the argument is absent.
    pub fn required(&self, name: &str) -> Result<&str, WebError> {
        self.get(name)
            .ok_or_else(|| WebError::missing_argument(name))
    }

    /// A required argument that must not look like a number.
    ///
    /// # Errors
    ///
    /// `MissingArgument` when absent; `Validation` when the value parses as
    /// an integer or float.
    pub fn string(&self, name: &str) -> Result<&str, WebError> {
        let value = self.required(name)?;
        if value.parse::<i64>().is_ok() {
            Err(WebError::invalid_value(value, "int", "string", name))
        } else if value.parse::<f64>().is_ok() {
            Err(WebError::invalid_value(value, "float", "string", name))
        } else {
            Ok(value)
        }
    }

    /// # Errors
    ///
    /// `MissingArgument` when absent; `Validation` when the value is not an
    /// integer.
    pub fn integer(&self, name: &str) -> Result<i64, WebError> {
        let value = self.required(name)?;
        value
            .parse()
            .map_err(|_| WebError::invalid_value(value, "string", "int", name))
    }

    /// # Errors
    ///
    /// `MissingArgument` when absent; `Validation` when the value is not one
    /// of `true`/`false`/`1`/`0`.
    pub fn boolean(&self, name: &str) -> Result<bool, WebError> {
        let value = self.required(name)?;
        match value {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(WebError::invalid_value(value, "string", "boolean", name)),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Params {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_uri(&parts.uri))
    }
}
