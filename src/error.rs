//! Error types for datasource settings.
//!
//! This module defines all error types using `thiserror`. Each variant names the
//! datasource it belongs to so that a failing entry can be identified at startup.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasourceError {
    #[error(
        "Error configuring data source '{datasource}'. No driver is available to provide a default URL or driver"
    )]
    NoDriverAvailable { datasource: String },

    #[error(
        "Error configuring data source '{datasource}'. No URL specified and driver '{driver}' has no in-memory default"
    )]
    MissingUrl { datasource: String, driver: String },

    #[error("Data source '{datasource}' uses driver '{driver}' which is not supported by this build")]
    UnsupportedDriver { datasource: String, driver: String },

    #[error("Invalid pool property '{key}={value}' for data source '{datasource}': {reason}")]
    InvalidPoolProperty {
        datasource: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid property: {message}")]
    InvalidProperty { message: String },

    #[error("Pool configuration error: {0}")]
    Pool(#[from] sqlx::Error),
}

impl DatasourceError {
    /// Create a no driver available error.
    pub fn no_driver_available(datasource: impl Into<String>) -> Self {
        Self::NoDriverAvailable {
            datasource: datasource.into(),
        }
    }

    /// Create a missing URL error.
    pub fn missing_url(datasource: impl Into<String>, driver: impl Into<String>) -> Self {
        Self::MissingUrl {
            datasource: datasource.into(),
            driver: driver.into(),
        }
    }

    /// Create an unsupported driver error.
    pub fn unsupported_driver(datasource: impl Into<String>, driver: impl Into<String>) -> Self {
        Self::UnsupportedDriver {
            datasource: datasource.into(),
            driver: driver.into(),
        }
    }

    /// Create an invalid pool property error.
    pub fn invalid_pool_property(
        datasource: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidPoolProperty {
            datasource: datasource.into(),
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid property error.
    pub fn invalid_property(message: impl Into<String>) -> Self {
        Self::InvalidProperty {
            message: message.into(),
        }
    }

    /// Name of the datasource this error belongs to, if any.
    pub fn datasource(&self) -> Option<&str> {
        match self {
            Self::NoDriverAvailable { datasource }
            | Self::MissingUrl { datasource, .. }
            | Self::UnsupportedDriver { datasource, .. }
            | Self::InvalidPoolProperty { datasource, .. } => Some(datasource),
            Self::InvalidProperty { .. } | Self::Pool(_) => None,
        }
    }
}

/// Result type alias for datasource operations.
pub type DatasourceResult<T> = Result<T, DatasourceError>;
