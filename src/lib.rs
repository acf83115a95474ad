//! Datasource Settings Library
//!
//! This library resolves the effective settings of named datasources (driver,
//! URL, username, password, validation query), synthesizing in-memory defaults
//! from the drivers available in the build, and maps them onto sqlx pools.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod resolver;

pub use config::{Config, Datasources};
pub use error::{DatasourceError, DatasourceResult};
pub use models::{DatasourceConfiguration, Setting};
pub use resolver::SettingsResolver;
