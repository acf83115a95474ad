//! Pool construction macros.
//!
//! The sqlx pool options types differ per backend, while the tuning applied to
//! them is the same. This macro expands the shared tuning once per backend
//! with zero runtime overhead.

/// Build a lazily connecting pool from backend pool options, connect options,
/// [`PoolOptions`](crate::config::PoolOptions) and an optional validation query.
///
/// The validation query runs in `before_acquire`, so a connection that fails
/// it is closed and replaced before it is handed out.
///
/// # Example
///
/// ```ignore
/// let pool = lazy_pool!(SqlitePoolOptions::new(), connect_options, &pool_opts, Some("SELECT 1"));
/// ```
#[macro_export]
macro_rules! lazy_pool {
    ($pool_options:expr, $connect_options:expr, $tuning:expr, $validation_query:expr) => {{
        let tuning: &$crate::config::PoolOptions = $tuning;
        let pool_options = $pool_options
            .max_connections(tuning.max_connections_or_default())
            .min_connections(tuning.min_connections_or_default())
            .idle_timeout(tuning.idle_timeout_or_default())
            .acquire_timeout(tuning.acquire_timeout_or_default())
            .max_lifetime(tuning.max_lifetime_or_default())
            .test_before_acquire(tuning.test_before_acquire_or_default());
        let validation_query: Option<&str> = $validation_query;
        let pool_options = match validation_query {
            Some(query) => {
                let query: ::std::sync::Arc<str> = ::std::sync::Arc::from(query);
                pool_options.before_acquire(move |conn, _meta| {
                    let query = ::std::sync::Arc::clone(&query);
                    Box::pin(async move {
                        ::sqlx::Executor::execute(&mut *conn, &*query).await?;
                        Ok::<_, ::sqlx::Error>(true)
                    })
                })
            }
            None => pool_options,
        };
        pool_options.connect_lazy_with($connect_options)
    }};
}

pub use lazy_pool;
