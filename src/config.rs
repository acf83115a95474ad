//! Configuration handling.
//!
//! This module binds datasource properties from CLI arguments and environment
//! variables, groups them per datasource name, and parses pool tuning options.

use crate::error::{DatasourceError, DatasourceResult};
use crate::models::DatasourceConfiguration;
use crate::resolver::SettingsResolver;
use clap::Parser;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

/// Prefix of datasource property keys: `datasources.<name>.<key>`.
pub const DATASOURCES_PREFIX: &str = "datasources";
/// Name of the primary datasource.
pub const PRIMARY_DATASOURCE: &str = "default";

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 0;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;

/// Normalize a property key to snake_case.
///
/// `driverClassName`, `driver-class-name` and `DRIVER_CLASS_NAME` all become
/// `driver_class_name`.
pub fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.trim().chars() {
        if c == '-' || c == '_' || c == ' ' {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
        } else if c.is_ascii_uppercase() {
            if prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Connection pool tuning parsed from pass-through pool properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PoolOptions {
    /// Maximum connections in pool (default: 10)
    pub max_connections: Option<u32>,
    /// Minimum connections in pool (default: 0)
    pub min_connections: Option<u32>,
    /// Idle timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Maximum connection lifetime in seconds (default: 1800)
    pub max_lifetime_secs: Option<u64>,
    /// Whether to ping connections before use (default: true)
    pub test_before_acquire: Option<bool>,
    /// Keys the pool adapter does not interpret
    #[serde(skip)]
    pub unrecognized: Vec<String>,
    /// Hold at least one connection and never expire connections
    #[serde(skip)]
    pub keep_alive: bool,
}

impl PoolOptions {
    /// Parse pool options from normalized property keys.
    ///
    /// Pool property names used by Tomcat-style pools (`max_active`,
    /// `min_idle`, `test_on_borrow`) are accepted as aliases.
    pub fn from_properties(
        datasource: &str,
        properties: &BTreeMap<String, String>,
    ) -> DatasourceResult<Self> {
        let mut opts = Self::default();
        for (key, value) in properties {
            match key.as_str() {
                "max_connections" | "max_active" | "max_size" => {
                    opts.max_connections = Some(parse_number(datasource, key, value)?)
                }
                "min_connections" | "min_idle" => {
                    opts.min_connections = Some(parse_number(datasource, key, value)?)
                }
                "idle_timeout" => {
                    opts.idle_timeout_secs = Some(parse_number(datasource, key, value)?)
                }
                "acquire_timeout" | "connect_timeout" => {
                    opts.acquire_timeout_secs = Some(parse_number(datasource, key, value)?)
                }
                "max_lifetime" => {
                    opts.max_lifetime_secs = Some(parse_number(datasource, key, value)?)
                }
                "test_before_acquire" | "test_on_borrow" => {
                    opts.test_before_acquire = Some(parse_bool(datasource, key, value)?)
                }
                _ => opts.unrecognized.push(key.clone()),
            }
        }
        if let Err(reason) = opts.validate() {
            let (key, value) = if opts.max_connections == Some(0) {
                ("max_connections", 0)
            } else {
                ("min_connections", opts.min_connections_or_default())
            };
            return Err(DatasourceError::invalid_pool_property(
                datasource,
                key,
                value.to_string(),
                reason,
            ));
        }
        Ok(opts)
    }

    /// Get max_connections with default value.
    pub fn max_connections_or_default(&self) -> u32 {
        self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    /// Copy of these options that keeps the pool's connections open for as
    /// long as the pool lives.
    pub fn kept_alive(&self) -> Self {
        Self {
            keep_alive: true,
            ..self.clone()
        }
    }

    /// Get min_connections with default value, at least 1 when kept alive.
    pub fn min_connections_or_default(&self) -> u32 {
        let min = self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS);
        if self.keep_alive { min.max(1) } else { min }
    }

    /// Get idle_timeout with default value, `None` when kept alive.
    pub fn idle_timeout_or_default(&self) -> Option<Duration> {
        (!self.keep_alive).then(|| {
            Duration::from_secs(self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS))
        })
    }

    /// Get acquire_timeout with default value.
    pub fn acquire_timeout_or_default(&self) -> Duration {
        Duration::from_secs(
            self.acquire_timeout_secs
                .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        )
    }

    /// Get max_lifetime with default value, `None` when kept alive.
    pub fn max_lifetime_or_default(&self) -> Option<Duration> {
        (!self.keep_alive).then(|| {
            Duration::from_secs(self.max_lifetime_secs.unwrap_or(DEFAULT_MAX_LIFETIME_SECS))
        })
    }

    /// Get test_before_acquire with default value.
    pub fn test_before_acquire_or_default(&self) -> bool {
        self.test_before_acquire.unwrap_or(true)
    }

    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_connections {
            if max == 0 {
                return Err("max_connections must be greater than 0".to_string());
            }
        }
        let min = self.min_connections_or_default();
        let max = self.max_connections_or_default();
        if min > max {
            return Err(format!(
                "min_connections ({}) cannot exceed max_connections ({})",
                min, max
            ));
        }
        Ok(())
    }
}

/// Split a property list on the commas that start a new `datasources.` key.
/// Commas inside values are kept.
fn split_property_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (idx, _) in list.match_indices(',') {
        let starts_key = list[idx + 1..]
            .trim_start()
            .strip_prefix(DATASOURCES_PREFIX)
            .is_some_and(|rest| rest.starts_with('.'));
        if starts_key {
            parts.push(&list[start..idx]);
            start = idx + 1;
        }
    }
    parts.push(&list[start..]);
    parts
}

fn parse_number<T: std::str::FromStr>(
    datasource: &str,
    key: &str,
    value: &str,
) -> DatasourceResult<T> {
    value.trim().parse().map_err(|_| {
        DatasourceError::invalid_pool_property(
            datasource,
            key,
            value,
            "expected an unsigned integer",
        )
    })
}

fn parse_bool(datasource: &str, key: &str, value: &str) -> DatasourceResult<bool> {
    let value_trimmed = value.trim();
    if value_trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value_trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(DatasourceError::invalid_pool_property(
            datasource,
            key,
            value,
            "expected true or false",
        ))
    }
}

/// A group of named datasources.
#[derive(Debug, Clone, Default)]
pub struct Datasources {
    entries: BTreeMap<String, DatasourceConfiguration>,
}

impl Datasources {
    /// Bind datasources from `datasources.<name>.<key>=value` properties.
    ///
    /// Every name in `names` gets an entry even without properties. Keys
    /// outside the `datasources.` prefix are ignored.
    pub fn from_properties<I, K, V>(
        properties: I,
        names: &[String],
        resolver: &SettingsResolver,
    ) -> DatasourceResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut grouped: BTreeMap<String, Vec<(String, String)>> = names
            .iter()
            .map(|name| (name.clone(), Vec::new()))
            .collect();

        for (key, value) in properties {
            let key = key.as_ref();
            let Some((prefix, scoped)) = key.split_once('.') else {
                warn!(key = %key, "Ignoring property outside datasources prefix");
                continue;
            };
            if !prefix.eq_ignore_ascii_case(DATASOURCES_PREFIX) {
                warn!(key = %key, "Ignoring property outside datasources prefix");
                continue;
            }
            let (name, property) = scoped
                .split_once('.')
                .filter(|(name, property)| !name.is_empty() && !property.is_empty())
                .ok_or_else(|| {
                    DatasourceError::invalid_property(format!(
                        "'{key}' must have the form {DATASOURCES_PREFIX}.<name>.<property>"
                    ))
                })?;
            grouped
                .entry(name.to_string())
                .or_default()
                .push((property.to_string(), value.into()));
        }

        let entries = grouped
            .into_iter()
            .map(|(name, props)| {
                let ds = DatasourceConfiguration::from_properties(
                    name.clone(),
                    props,
                    resolver.clone(),
                )?;
                Ok::<_, DatasourceError>((name, ds))
            })
            .collect::<DatasourceResult<_>>()?;
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&DatasourceConfiguration> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DatasourceConfiguration> {
        self.entries.get_mut(name)
    }

    /// The `default` datasource, if configured.
    pub fn primary(&self) -> Option<&DatasourceConfiguration> {
        self.get(PRIMARY_DATASOURCE)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasourceConfiguration> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Command-line configuration.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "datasource-settings",
    about = "Resolve named datasource settings and map them onto connection pools",
    version,
    author
)]
pub struct Config {
    /// Datasource properties.
    /// Format: "datasources.<name>.<property>=value"
    /// Can be specified multiple times. Several properties may share one
    /// value when each one after a comma starts with "datasources.".
    #[arg(
        short = 'p',
        long = "property",
        value_name = "KEY=VALUE",
        env = "DATASOURCE_PROPERTIES"
    )]
    pub properties: Vec<String>,

    /// Datasource names to configure even without properties.
    /// When nothing is configured the "default" datasource is used.
    #[arg(
        short = 'd',
        long = "datasource",
        value_name = "NAME",
        env = "DATASOURCE_NAMES",
        value_delimiter = ','
    )]
    pub datasources: Vec<String>,

    /// Print the effective settings as JSON
    #[arg(long)]
    pub json: bool,

    /// Build a lazily connecting pool for each datasource
    #[arg(long, env = "DATASOURCE_BUILD_POOLS")]
    pub build_pools: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "DATASOURCE_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DATASOURCE_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            properties: Vec::new(),
            datasources: Vec::new(),
            json: false,
            build_pools: false,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Split every property into key and value.
    pub fn parse_properties(&self) -> DatasourceResult<Vec<(String, String)>> {
        self.properties
            .iter()
            .flat_map(|list| split_property_list(list))
            .map(|p| {
                p.split_once('=')
                    .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                    .filter(|(k, _)| !k.is_empty())
                    .ok_or_else(|| {
                        DatasourceError::invalid_property(format!("expected KEY=VALUE, got '{p}'"))
                    })
            })
            .collect()
    }

    /// Datasource names requested without properties, `default` when nothing
    /// else is configured.
    pub fn datasource_names(&self) -> Vec<String> {
        if self.datasources.is_empty() && self.properties.is_empty() {
            vec![PRIMARY_DATASOURCE.to_string()]
        } else {
            self.datasources.iter().map(|n| n.trim().to_string()).collect()
        }
    }

    /// Bind all configured datasources.
    pub fn bind_datasources(&self, resolver: &SettingsResolver) -> DatasourceResult<Datasources> {
        Datasources::from_properties(self.parse_properties()?, &self.datasource_names(), resolver)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
