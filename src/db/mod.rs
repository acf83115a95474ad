//! Pool adapter.
//!
//! This module maps resolved datasource settings onto sqlx connection pools:
//! - Database-specific lazy pools
//! - Pool tuning and validation query macros

#[macro_use]
pub mod macros;
pub mod pool;

pub use pool::{DatasourcePools, DbPool, create_pool};
