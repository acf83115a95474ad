//! Settings resolution.
//!
//! A configured value always wins. When a value is missing, the resolver
//! derives one from the driver catalog:
//!
//! - the driver is inferred from an explicit URL, or else the first catalog
//!   driver available in this build is selected
//! - the URL is the selected driver's in-memory URL for the datasource name
//! - username, password and validation query fall back to the driver's
//!   defaults only when the URL itself was synthesized. An explicit URL may
//!   point anywhere, so those fields resolve to empty strings instead.

use crate::error::{DatasourceError, DatasourceResult};
use crate::models::{
    DatabaseType, DriverCatalog, DriverDescriptor, EffectiveSettings, RawSettings, Setting,
};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Reports whether a driver can be used in the running program.
pub trait DriverProbe: Send + Sync {
    fn is_available(&self, driver: &str) -> bool;
}

impl<F> DriverProbe for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_available(&self, driver: &str) -> bool {
        self(driver)
    }
}

/// Drivers whose sqlx backend was compiled into this build.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompiledDrivers;

impl CompiledDrivers {
    pub fn names() -> Vec<&'static str> {
        [
            DatabaseType::SQLite,
            DatabaseType::PostgreSQL,
            DatabaseType::MySQL,
        ]
        .into_iter()
        .filter(|db_type| Self::is_compiled(*db_type))
        .map(|db_type| db_type.driver_name())
        .collect()
    }

    fn is_compiled(db_type: DatabaseType) -> bool {
        match db_type {
            DatabaseType::SQLite => cfg!(feature = "sqlite"),
            DatabaseType::PostgreSQL => cfg!(feature = "postgres"),
            DatabaseType::MySQL => cfg!(feature = "mysql"),
        }
    }
}

impl DriverProbe for CompiledDrivers {
    fn is_available(&self, driver: &str) -> bool {
        DatabaseType::from_driver_name(driver).is_some_and(Self::is_compiled)
    }
}

/// A fixed set of available driver names.
#[derive(Debug, Clone, Default)]
pub struct StaticDrivers(HashSet<String>);

impl StaticDrivers {
    pub fn new<I, S>(drivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            drivers
                .into_iter()
                .map(|d| d.into().to_ascii_lowercase())
                .collect(),
        )
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl DriverProbe for StaticDrivers {
    fn is_available(&self, driver: &str) -> bool {
        self.0.contains(&driver.trim().to_ascii_lowercase())
    }
}

/// Computes effective datasource settings from raw settings.
///
/// Cloning is cheap; the catalog and probe are shared.
#[derive(Clone)]
pub struct SettingsResolver {
    catalog: Arc<DriverCatalog>,
    probe: Arc<dyn DriverProbe>,
}

impl SettingsResolver {
    pub fn new(catalog: DriverCatalog, probe: impl DriverProbe + 'static) -> Self {
        Self {
            catalog: Arc::new(catalog),
            probe: Arc::new(probe),
        }
    }

    pub fn catalog(&self) -> &DriverCatalog {
        &self.catalog
    }

    /// First catalog driver that is available, in preference order.
    pub fn first_available(&self) -> Option<&DriverDescriptor> {
        self.catalog
            .iter()
            .find(|d| self.probe.is_available(d.driver_class_name))
    }

    /// Resolve one setting for the named datasource.
    pub fn resolve(
        &self,
        name: &str,
        raw: &RawSettings,
        setting: Setting,
    ) -> DatasourceResult<String> {
        if let Some(value) = raw.configured(setting) {
            return Ok(value.to_string());
        }

        let value = match setting {
            Setting::DriverClassName => self.default_driver(name, raw)?,
            Setting::Url => self.default_url(name, raw)?,
            Setting::Username => self.descriptor_default(name, raw, |d| d.username)?,
            Setting::Password => self.descriptor_default(name, raw, |d| d.password)?,
            Setting::ValidationQuery => {
                self.descriptor_default(name, raw, |d| d.validation_query)?
            }
        };
        debug!(datasource = %name, setting = %setting, "Using calculated default");
        Ok(value)
    }

    /// Resolve every setting for the named datasource.
    pub fn resolve_all(
        &self,
        name: &str,
        raw: &RawSettings,
    ) -> DatasourceResult<EffectiveSettings> {
        Ok(EffectiveSettings {
            driver_class_name: self.resolve(name, raw, Setting::DriverClassName)?,
            url: self.resolve(name, raw, Setting::Url)?,
            username: self.resolve(name, raw, Setting::Username)?,
            password: self.resolve(name, raw, Setting::Password)?,
            validation_query: self.resolve(name, raw, Setting::ValidationQuery)?,
        })
    }

    fn default_driver(&self, name: &str, raw: &RawSettings) -> DatasourceResult<String> {
        if let Some(db_type) = raw
            .configured(Setting::Url)
            .and_then(DatabaseType::from_connection_string)
        {
            return Ok(db_type.driver_name().to_string());
        }
        self.first_available()
            .map(|d| d.driver_class_name.to_string())
            .ok_or_else(|| DatasourceError::no_driver_available(name))
    }

    fn default_url(&self, name: &str, raw: &RawSettings) -> DatasourceResult<String> {
        self.url_driver(name, raw)?
            .map(|d| d.url_for(name))
            .ok_or_else(|| DatasourceError::no_driver_available(name))
    }

    /// Descriptor behind a synthesized URL, `None` when the URL is configured.
    fn url_driver(
        &self,
        name: &str,
        raw: &RawSettings,
    ) -> DatasourceResult<Option<&DriverDescriptor>> {
        if raw.configured(Setting::Url).is_some() {
            return Ok(None);
        }
        match raw.configured(Setting::DriverClassName) {
            Some(driver) => self
                .catalog
                .find(driver)
                .map(Some)
                .ok_or_else(|| DatasourceError::missing_url(name, driver)),
            None => self
                .first_available()
                .map(Some)
                .ok_or_else(|| DatasourceError::no_driver_available(name)),
        }
    }

    fn descriptor_default(
        &self,
        name: &str,
        raw: &RawSettings,
        field: fn(&DriverDescriptor) -> &'static str,
    ) -> DatasourceResult<String> {
        Ok(self
            .url_driver(name, raw)?
            .map(field)
            .unwrap_or_default()
            .to_string())
    }
}

impl Default for SettingsResolver {
    fn default() -> Self {
        Self::new(DriverCatalog::embedded(), CompiledDrivers)
    }
}

impl fmt::Debug for SettingsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsResolver")
            .field("catalog", &self.catalog)
            .field("first_available", &self.first_available().map(|d| d.driver_class_name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMDB: DriverDescriptor = DriverDescriptor {
        driver_class_name: "memdb",
        url_template: "memdb:mem:{name}",
        username: "sa",
        password: "",
        validation_query: "SELECT 1 FROM DUAL",
    };

    fn catalog() -> DriverCatalog {
        DriverCatalog::new(vec![MEMDB, DriverDescriptor::SQLITE])
    }

    fn raw_with(setting: Setting, value: &str) -> RawSettings {
        let mut raw = RawSettings::default();
        raw.set(setting, Some(value.to_string()));
        raw
    }

    #[test]
    fn test_first_available_follows_catalog_order() {
        let resolver = SettingsResolver::new(catalog(), StaticDrivers::new(["memdb", "sqlite"]));
        assert_eq!(resolver.first_available(), Some(&MEMDB));

        let resolver = SettingsResolver::new(catalog(), StaticDrivers::new(["sqlite"]));
        assert_eq!(resolver.first_available(), Some(&DriverDescriptor::SQLITE));
    }

    #[test]
    fn test_defaults_from_selected_driver() {
        let resolver = SettingsResolver::new(catalog(), |d: &str| d == "memdb");
        let settings = resolver.resolve_all("orders", &RawSettings::default()).unwrap();
        assert_eq!(settings.driver_class_name, "memdb");
        assert_eq!(settings.url, "memdb:mem:orders");
        assert_eq!(settings.username, "sa");
        assert_eq!(settings.password, "");
        assert_eq!(settings.validation_query, "SELECT 1 FROM DUAL");
    }

    #[test]
    fn test_no_driver_available() {
        let resolver = SettingsResolver::new(catalog(), StaticDrivers::none());
        for setting in Setting::ALL {
            let err = resolver
                .resolve("default", &RawSettings::default(), setting)
                .unwrap_err();
            assert!(
                matches!(
                    err,
                    DatasourceError::NoDriverAvailable { ref datasource } if datasource == "default"
                ),
                "{setting} should fail with NoDriverAvailable"
            );
        }
    }

    #[test]
    fn test_configured_values_returned_unchanged() {
        let resolver = SettingsResolver::new(catalog(), StaticDrivers::none());
        for setting in Setting::ALL {
            let raw = raw_with(setting, " value with spaces ");
            assert_eq!(
                resolver.resolve("x", &raw, setting).unwrap(),
                " value with spaces "
            );
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let resolver = SettingsResolver::new(catalog(), StaticDrivers::new(["sqlite"]));
        let raw = raw_with(Setting::DriverClassName, "  ");
        assert_eq!(
            resolver.resolve("x", &raw, Setting::DriverClassName).unwrap(),
            "sqlite"
        );
    }

    #[test]
    fn test_configured_url_skips_driver_defaults() {
        let resolver = SettingsResolver::new(catalog(), StaticDrivers::new(["memdb"]));
        let raw = raw_with(Setting::Url, "memdb:tcp://db.internal/orders");
        let settings = resolver.resolve_all("orders", &raw).unwrap();
        assert_eq!(settings.url, "memdb:tcp://db.internal/orders");
        assert_eq!(settings.username, "");
        assert_eq!(settings.password, "");
        assert_eq!(settings.validation_query, "");
    }

    #[test]
    fn test_driver_inferred_from_configured_url() {
        let resolver = SettingsResolver::new(catalog(), StaticDrivers::new(["memdb"]));
        let raw = raw_with(Setting::Url, "postgres://db.internal/orders");
        assert_eq!(
            resolver.resolve("orders", &raw, Setting::DriverClassName).unwrap(),
            "postgres"
        );
    }

    #[test]
    fn test_unrecognized_url_falls_back_to_available_driver() {
        let resolver = SettingsResolver::new(catalog(), StaticDrivers::new(["sqlite"]));
        let raw = raw_with(Setting::Url, "custom://somewhere");
        assert_eq!(
            resolver.resolve("orders", &raw, Setting::DriverClassName).unwrap(),
            "sqlite"
        );

        let resolver = SettingsResolver::new(catalog(), StaticDrivers::none());
        assert!(matches!(
            resolver.resolve("orders", &raw, Setting::DriverClassName),
            Err(DatasourceError::NoDriverAvailable { .. })
        ));
    }

    #[test]
    fn test_configured_driver_selects_catalog_url() {
        // sqlite is configured explicitly, so availability does not matter
        let resolver = SettingsResolver::new(catalog(), StaticDrivers::new(["memdb"]));
        let raw = raw_with(Setting::DriverClassName, "sqlite");
        let settings = resolver.resolve_all("cache", &raw).unwrap();
        assert_eq!(settings.driver_class_name, "sqlite");
        assert_eq!(settings.url, "sqlite:file:cache?mode=memory&cache=shared");
        assert_eq!(settings.validation_query, "SELECT 1");
    }

    #[test]
    fn test_configured_server_driver_without_url() {
        let resolver = SettingsResolver::new(catalog(), StaticDrivers::new(["memdb"]));
        let raw = raw_with(Setting::DriverClassName, "postgres");
        let err = resolver.resolve("orders", &raw, Setting::Url).unwrap_err();
        assert!(matches!(
            err,
            DatasourceError::MissingUrl { ref driver, .. } if driver == "postgres"
        ));
        // the driver itself still resolves
        assert_eq!(
            resolver.resolve("orders", &raw, Setting::DriverClassName).unwrap(),
            "postgres"
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let resolver = SettingsResolver::default();
        let raw = raw_with(Setting::Username, "app");
        let first = resolver.resolve_all("default", &raw).unwrap();
        let second = resolver.resolve_all("default", &raw).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_compiled_drivers_probe() {
        assert!(CompiledDrivers.is_available("sqlite"));
        assert!(CompiledDrivers.is_available("postgresql"));
        assert!(!CompiledDrivers.is_available("oracle"));
        assert_eq!(CompiledDrivers::names(), vec!["sqlite", "postgres", "mysql"]);
    }
}
