//! Data models for datasource settings.
//!
//! This module re-exports all model types used throughout the crate.

pub mod datasource;
pub mod driver;
pub mod settings;

// Re-export commonly used types
pub use datasource::{DatasourceConfiguration, DatasourceSummary};
pub use driver::{DatabaseType, DriverCatalog, DriverDescriptor};
pub use settings::{EffectiveSettings, RawSettings, Setting};
