//! Connection pool construction.
//!
//! This module maps a resolved [`DatasourceConfiguration`] onto the native
//! sqlx pool of its backend (MySqlPool, PgPool, SqlitePool). Pools connect
//! lazily: building one performs no I/O.

use crate::config::Datasources;
use crate::error::{DatasourceError, DatasourceResult};
use crate::models::{DatabaseType, DatasourceConfiguration};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[cfg(feature = "mysql")]
use sqlx::{MySqlPool, mysql::MySqlConnectOptions, mysql::MySqlPoolOptions};
#[cfg(feature = "postgres")]
use sqlx::{PgPool, postgres::PgConnectOptions, postgres::PgPoolOptions};
#[cfg(feature = "sqlite")]
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions};
#[cfg(any(feature = "sqlite", feature = "postgres", feature = "mysql"))]
use std::str::FromStr;

#[cfg(not(any(feature = "sqlite", feature = "postgres", feature = "mysql")))]
compile_error!("at least one of the `sqlite`, `postgres` or `mysql` features must be enabled");

/// Database-specific connection pool (avoids AnyPool limitations).
#[derive(Debug, Clone)]
pub enum DbPool {
    #[cfg(feature = "mysql")]
    MySql(MySqlPool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
}

impl DbPool {
    /// Close the connection pool.
    pub async fn close(&self) {
        match self {
            #[cfg(feature = "mysql")]
            DbPool::MySql(pool) => pool.close().await,
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => pool.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::SQLite(pool) => pool.close().await,
        }
    }

    /// Get the database type for this pool.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "mysql")]
            DbPool::MySql(_) => DatabaseType::MySQL,
            #[cfg(feature = "postgres")]
            DbPool::Postgres(_) => DatabaseType::PostgreSQL,
            #[cfg(feature = "sqlite")]
            DbPool::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Number of connections currently held by the pool.
    pub fn size(&self) -> u32 {
        match self {
            #[cfg(feature = "mysql")]
            DbPool::MySql(pool) => pool.size(),
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => pool.size(),
            #[cfg(feature = "sqlite")]
            DbPool::SQLite(pool) => pool.size(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            #[cfg(feature = "mysql")]
            DbPool::MySql(pool) => pool.is_closed(),
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => pool.is_closed(),
            #[cfg(feature = "sqlite")]
            DbPool::SQLite(pool) => pool.is_closed(),
        }
    }
}

/// Build the pool for a datasource from its effective settings.
///
/// Must be called within a Tokio runtime; sqlx spawns the pool's maintenance
/// task on construction.
pub fn create_pool(config: &DatasourceConfiguration) -> DatasourceResult<DbPool> {
    let name = config.name();
    let driver = config.driver_class_name();
    let db_type = DatabaseType::from_driver_name(driver)
        .ok_or_else(|| DatasourceError::unsupported_driver(name, driver))?;

    let tuning = config.pool_options()?;
    for key in &tuning.unrecognized {
        warn!(datasource = %name, key = %key, "Pool property not used by sqlx pools");
    }

    let validation_query = Some(config.validation_query()).filter(|q| !q.trim().is_empty());

    debug!(
        datasource = %name,
        db_type = %db_type,
        max_connections = tuning.max_connections_or_default(),
        validation = validation_query.is_some(),
        "Creating pool"
    );

    let pool = match db_type {
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => {
            let mut options = SqliteConnectOptions::from_str(config.url())?;
            let tuning = if config.configured_url().is_none() {
                // synthesized in-memory database, dropped with its last connection
                options = options.create_if_missing(true);
                tuning.kept_alive()
            } else {
                tuning.clone()
            };
            for (key, value) in config.db_properties() {
                options = options.pragma(key.clone(), std::borrow::Cow::Owned(value.clone()));
            }
            DbPool::SQLite(lazy_pool!(
                SqlitePoolOptions::new(),
                options,
                &tuning,
                validation_query
            ))
        }
        #[cfg(feature = "postgres")]
        DatabaseType::PostgreSQL => {
            let mut options = PgConnectOptions::from_str(config.url())?;
            if !config.username().is_empty() {
                options = options.username(config.username());
            }
            if !config.password().is_empty() {
                options = options.password(config.password());
            }
            if !config.db_properties().is_empty() {
                options = options.options(config.db_properties().iter());
            }
            DbPool::Postgres(lazy_pool!(
                PgPoolOptions::new(),
                options,
                &tuning,
                validation_query
            ))
        }
        #[cfg(feature = "mysql")]
        DatabaseType::MySQL => {
            let mut options = MySqlConnectOptions::from_str(config.url())?.charset("utf8mb4");
            if !config.username().is_empty() {
                options = options.username(config.username());
            }
            if !config.password().is_empty() {
                options = options.password(config.password());
            }
            if !config.db_properties().is_empty() {
                warn!(
                    datasource = %name,
                    "Connection properties are not supported for MySQL and are ignored"
                );
            }
            DbPool::MySql(lazy_pool!(
                MySqlPoolOptions::new(),
                options,
                &tuning,
                validation_query
            ))
        }
        #[allow(unreachable_patterns)]
        _ => return Err(DatasourceError::unsupported_driver(name, driver)),
    };

    info!(datasource = %name, db_type = %db_type, "Created pool");
    Ok(pool)
}

/// Pools for every datasource of a group, keyed by datasource name.
#[derive(Debug, Clone, Default)]
pub struct DatasourcePools {
    pools: BTreeMap<String, DbPool>,
}

impl DatasourcePools {
    /// Build a pool for each datasource. Fails on the first datasource whose
    /// pool cannot be built.
    pub fn create(datasources: &Datasources) -> DatasourceResult<Self> {
        let pools = datasources
            .iter()
            .map(|ds| Ok::<_, DatasourceError>((ds.name().to_string(), create_pool(ds)?)))
            .collect::<DatasourceResult<_>>()?;
        Ok(Self { pools })
    }

    pub fn get(&self, name: &str) -> Option<&DbPool> {
        self.pools.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Close all pools.
    pub async fn close_all(&self) {
        for (name, pool) in &self.pools {
            info!(datasource = %name, "Closing pool");
            pool.close().await;
        }
    }
}
