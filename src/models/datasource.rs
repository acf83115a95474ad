//! Named datasource configuration.
//!
//! A [`DatasourceConfiguration`] keeps the raw values bound from configuration
//! next to the effective values computed from them. Effective values are
//! resolved once after construction and again whenever a raw value changes
//! through a setter, so every accessor observes the same result a fresh
//! resolution would produce.

use crate::config::{PoolOptions, normalize_key};
use crate::error::DatasourceResult;
use crate::models::{EffectiveSettings, RawSettings, Setting};
use crate::resolver::SettingsResolver;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Property key prefix for connection properties.
pub const DB_PROPERTIES_PREFIX: &str = "db_properties";
/// Property key for the JNDI alias.
pub const JNDI_NAME_KEY: &str = "jndi_name";

#[derive(Clone)]
pub struct DatasourceConfiguration {
    name: String,
    raw: RawSettings,
    jndi_name: Option<String>,
    pool_properties: BTreeMap<String, String>,
    db_properties: BTreeMap<String, String>,
    resolver: SettingsResolver,
    effective: EffectiveSettings,
}

impl DatasourceConfiguration {
    /// Create a datasource with nothing configured beyond its name.
    pub fn new(name: impl Into<String>, resolver: SettingsResolver) -> DatasourceResult<Self> {
        Self::with_settings(name, RawSettings::default(), resolver)
    }

    /// Create a datasource from raw settings.
    pub fn with_settings(
        name: impl Into<String>,
        raw: RawSettings,
        resolver: SettingsResolver,
    ) -> DatasourceResult<Self> {
        Self::build(name.into(), raw, None, BTreeMap::new(), BTreeMap::new(), resolver)
    }

    /// Bind a datasource from `key=value` properties scoped to it.
    ///
    /// Keys may be written in kebab-case, snake_case or camelCase. Besides the
    /// resolved settings this recognizes `jndi-name` and `db-properties.<key>`;
    /// any other key is kept as a pool property.
    pub fn from_properties<I, K, V>(
        name: impl Into<String>,
        properties: I,
        resolver: SettingsResolver,
    ) -> DatasourceResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = RawSettings::default();
        let mut jndi_name = None;
        let mut pool_properties = BTreeMap::new();
        let mut db_properties = BTreeMap::new();

        for (key, value) in properties {
            let key = key.as_ref();
            let value = value.into();
            if let Some((prefix, rest)) = key.split_once('.') {
                if normalize_key(prefix) == DB_PROPERTIES_PREFIX {
                    db_properties.insert(normalize_key(rest), value);
                    continue;
                }
            }
            let normalized = normalize_key(key);
            if let Ok(setting) = normalized.parse::<Setting>() {
                raw.set(setting, Some(value));
            } else if normalized == JNDI_NAME_KEY {
                jndi_name = Some(value);
            } else {
                pool_properties.insert(normalized, value);
            }
        }

        Self::build(name.into(), raw, jndi_name, pool_properties, db_properties, resolver)
    }

    fn build(
        name: String,
        raw: RawSettings,
        jndi_name: Option<String>,
        pool_properties: BTreeMap<String, String>,
        db_properties: BTreeMap<String, String>,
        resolver: SettingsResolver,
    ) -> DatasourceResult<Self> {
        let effective = resolver.resolve_all(&name, &raw)?;
        info!(
            datasource = %name,
            driver = %effective.driver_class_name,
            url = %effective.masked_url(),
            "Configured datasource"
        );
        Ok(Self {
            name,
            raw,
            jndi_name,
            pool_properties,
            db_properties,
            resolver,
            effective,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All effective values.
    pub fn effective(&self) -> &EffectiveSettings {
        &self.effective
    }

    /// All raw values.
    pub fn configured(&self) -> &RawSettings {
        &self.raw
    }

    /// Run resolution for one setting again, bypassing the cached value.
    pub fn resolve(&self, setting: Setting) -> DatasourceResult<String> {
        self.resolver.resolve(&self.name, &self.raw, setting)
    }

    /// The calculated driver name.
    pub fn driver_class_name(&self) -> &str {
        &self.effective.driver_class_name
    }

    /// The configured driver name.
    pub fn configured_driver_class_name(&self) -> Option<&str> {
        self.raw.get(Setting::DriverClassName)
    }

    /// The calculated URL.
    pub fn url(&self) -> &str {
        &self.effective.url
    }

    /// The configured URL.
    pub fn configured_url(&self) -> Option<&str> {
        self.raw.get(Setting::Url)
    }

    /// The calculated username.
    pub fn username(&self) -> &str {
        &self.effective.username
    }

    /// The configured username.
    pub fn configured_username(&self) -> Option<&str> {
        self.raw.get(Setting::Username)
    }

    /// The calculated password.
    pub fn password(&self) -> &str {
        &self.effective.password
    }

    /// The configured password.
    pub fn configured_password(&self) -> Option<&str> {
        self.raw.get(Setting::Password)
    }

    /// The calculated validation query.
    pub fn validation_query(&self) -> &str {
        &self.effective.validation_query
    }

    /// The configured validation query.
    pub fn configured_validation_query(&self) -> Option<&str> {
        self.raw.get(Setting::ValidationQuery)
    }

    pub fn set_driver_class_name(&mut self, value: Option<String>) -> DatasourceResult<()> {
        self.set(Setting::DriverClassName, value)
    }

    pub fn set_url(&mut self, value: Option<String>) -> DatasourceResult<()> {
        self.set(Setting::Url, value)
    }

    pub fn set_username(&mut self, value: Option<String>) -> DatasourceResult<()> {
        self.set(Setting::Username, value)
    }

    pub fn set_password(&mut self, value: Option<String>) -> DatasourceResult<()> {
        self.set(Setting::Password, value)
    }

    pub fn set_validation_query(&mut self, value: Option<String>) -> DatasourceResult<()> {
        self.set(Setting::ValidationQuery, value)
    }

    /// Change a raw value and re-resolve. The previous value is restored when
    /// resolution fails.
    pub fn set(&mut self, setting: Setting, value: Option<String>) -> DatasourceResult<()> {
        let previous = self.raw.set(setting, value);
        match self.resolver.resolve_all(&self.name, &self.raw) {
            Ok(effective) => {
                debug!(datasource = %self.name, setting = %setting, "Updated datasource setting");
                self.effective = effective;
                Ok(())
            }
            Err(e) => {
                self.raw.set(setting, previous);
                Err(e)
            }
        }
    }

    /// The JNDI name.
    pub fn jndi_name(&self) -> Option<&str> {
        self.jndi_name.as_deref()
    }

    pub fn set_jndi_name(&mut self, jndi_name: Option<String>) {
        self.jndi_name = jndi_name;
    }

    /// Pool properties passed through to the pool adapter unchanged.
    pub fn pool_properties(&self) -> &BTreeMap<String, String> {
        &self.pool_properties
    }

    /// Display-safe summary of this datasource.
    pub fn summary(&self) -> DatasourceSummary {
        DatasourceSummary::from(self)
    }

    pub fn set_pool_property(&mut self, key: &str, value: impl Into<String>) {
        self.pool_properties.insert(normalize_key(key), value.into());
    }

    /// Typed view of the pool properties.
    pub fn pool_options(&self) -> DatasourceResult<PoolOptions> {
        PoolOptions::from_properties(&self.name, &self.pool_properties)
    }

    /// Connection properties, keys in under_score form.
    pub fn db_properties(&self) -> &BTreeMap<String, String> {
        &self.db_properties
    }

    pub fn set_db_properties<I, K, V>(&mut self, properties: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.db_properties = properties
            .into_iter()
            .map(|(k, v)| (normalize_key(k.as_ref()), v.into()))
            .collect();
        debug!(
            datasource = %self.name,
            keys = ?self.db_properties.keys().collect::<Vec<_>>(),
            "Set connection properties"
        );
    }
}

/// Datasource information for display (no secrets exposed).
#[derive(Debug, Clone, Serialize)]
pub struct DatasourceSummary {
    pub name: String,
    pub driver_class_name: String,
    /// Credentials masked
    pub url: String,
    pub username: String,
    pub validation_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jndi_name: Option<String>,
    /// Settings that were configured rather than calculated
    pub configured: Vec<Setting>,
    pub pool_properties: BTreeMap<String, String>,
}

impl From<&DatasourceConfiguration> for DatasourceSummary {
    fn from(ds: &DatasourceConfiguration) -> Self {
        Self {
            name: ds.name.clone(),
            driver_class_name: ds.effective.driver_class_name.clone(),
            url: ds.effective.masked_url(),
            username: ds.effective.username.clone(),
            validation_query: ds.effective.validation_query.clone(),
            jndi_name: ds.jndi_name.clone(),
            configured: Setting::ALL
                .into_iter()
                .filter(|s| ds.raw.configured(*s).is_some())
                .collect(),
            pool_properties: ds.pool_properties.clone(),
        }
    }
}

impl fmt::Debug for DatasourceConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasourceConfiguration")
            .field("name", &self.name)
            .field("effective", &self.effective)
            .field("jndi_name", &self.jndi_name)
            .field("pool_properties", &self.pool_properties)
            .field("db_properties", &self.db_properties.keys().collect::<Vec<_>>())
            .finish()
    }
}
