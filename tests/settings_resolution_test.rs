use datasource_settings::error::DatasourceError;
use datasource_settings::models::{
    DatasourceConfiguration, DriverCatalog, DriverDescriptor, RawSettings, Setting,
};
use datasource_settings::resolver::{SettingsResolver, StaticDrivers};
use datasource_settings::Datasources;

const EMBEDDED_A: DriverDescriptor = DriverDescriptor {
    driver_class_name: "embedded-a",
    url_template: "embedded-a:mem:{name};close_delay=-1",
    username: "sa",
    password: "",
    validation_query: "SELECT 1",
};

const EMBEDDED_B: DriverDescriptor = DriverDescriptor {
    driver_class_name: "embedded-b",
    url_template: "embedded-b:memory:{name};create=true",
    username: "",
    password: "",
    validation_query: "VALUES 1",
};

fn catalog() -> DriverCatalog {
    DriverCatalog::new(vec![EMBEDDED_A, EMBEDDED_B, DriverDescriptor::SQLITE])
}

fn resolver(available: &[&str]) -> SettingsResolver {
    SettingsResolver::new(catalog(), StaticDrivers::new(available.iter().copied()))
}

fn fully_configured() -> RawSettings {
    RawSettings {
        driver_class_name: Some("postgres".to_string()),
        url: Some("postgres://db.internal:5432/orders".to_string()),
        username: Some("orders_app".to_string()),
        password: Some("s3cret".to_string()),
        validation_query: Some("SELECT version()".to_string()),
    }
}

#[test]
fn test_configured_values_win_for_every_setting() {
    let raw = fully_configured();
    for available in [&[][..], &["embedded-a"][..]] {
        let resolver = resolver(available);
        for setting in Setting::ALL {
            assert_eq!(
                resolver.resolve("orders", &raw, setting).unwrap(),
                raw.get(setting).unwrap(),
                "{setting} must be returned unchanged"
            );
        }
    }
}

#[test]
fn test_name_only_datasource_uses_first_available_driver() {
    let ds =
        DatasourceConfiguration::new("inventory", resolver(&["embedded-b", "sqlite"])).unwrap();
    assert_eq!(ds.driver_class_name(), "embedded-b");
    assert!(ds.url().contains("inventory"));
    assert_eq!(ds.url(), "embedded-b:memory:inventory;create=true");
    assert_eq!(ds.validation_query(), "VALUES 1");
}

#[test]
fn test_each_name_gets_an_isolated_database() {
    let resolver = resolver(&["embedded-a"]);
    let first = DatasourceConfiguration::new("first", resolver.clone()).unwrap();
    let second = DatasourceConfiguration::new("second", resolver).unwrap();
    assert_ne!(first.url(), second.url());
    assert_eq!(first.username(), "sa");
    assert_eq!(second.username(), "sa");
}

#[test]
fn test_no_driver_available_is_fatal() {
    let err = DatasourceConfiguration::new("default", resolver(&[])).unwrap_err();
    assert!(matches!(
        err,
        DatasourceError::NoDriverAvailable { ref datasource } if datasource == "default"
    ));
}

#[test]
fn test_explicit_url_without_driver_leaves_credentials_empty() {
    let raw = RawSettings {
        url: Some("embedded-a:tcp://db.internal/orders".to_string()),
        ..RawSettings::default()
    };
    let ds = DatasourceConfiguration::with_settings("orders", raw, resolver(&["embedded-a"]))
        .unwrap();
    assert_eq!(ds.username(), "");
    assert_eq!(ds.password(), "");
    assert_eq!(ds.validation_query(), "");
    assert_eq!(ds.configured_driver_class_name(), None);
}

#[test]
fn test_explicit_url_needs_no_available_driver_when_recognized() {
    let raw = RawSettings {
        url: Some("postgresql://db.internal/orders".to_string()),
        ..RawSettings::default()
    };
    let ds = DatasourceConfiguration::with_settings("orders", raw, resolver(&[])).unwrap();
    assert_eq!(ds.driver_class_name(), "postgres");
    assert_eq!(ds.url(), "postgresql://db.internal/orders");
}

#[test]
fn test_configured_accessors_ignore_defaulting() {
    let ds = DatasourceConfiguration::new("default", resolver(&["embedded-a"])).unwrap();
    assert_eq!(ds.configured_driver_class_name(), None);
    assert_eq!(ds.configured_url(), None);
    assert_eq!(ds.configured_username(), None);
    assert_eq!(ds.configured_password(), None);
    assert_eq!(ds.configured_validation_query(), None);
    assert_eq!(ds.username(), "sa");
}

#[test]
fn test_cached_values_match_fresh_resolution() {
    let ds = DatasourceConfiguration::from_properties(
        "default",
        [("username", "reporting")],
        resolver(&["embedded-a"]),
    )
    .unwrap();
    for setting in Setting::ALL {
        let first = ds.resolve(setting).unwrap();
        let second = ds.resolve(setting).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, ds.effective().get(setting));
    }
}

#[test]
fn test_resolving_one_datasource_does_not_affect_another() {
    let resolver = resolver(&["embedded-a"]);
    let mut first = DatasourceConfiguration::new("first", resolver.clone()).unwrap();
    let second = DatasourceConfiguration::new("second", resolver).unwrap();
    first
        .set_url(Some("embedded-b:tcp://elsewhere/first".to_string()))
        .unwrap();
    assert_eq!(first.username(), "");
    assert_eq!(second.url(), "embedded-a:mem:second;close_delay=-1");
    assert_eq!(second.username(), "sa");
}

#[test]
fn test_group_binding_with_builtin_catalog() {
    let datasources = Datasources::from_properties(
        [
            ("datasources.default.username", "app"),
            ("datasources.analytics.url", "mysql://warehouse.internal/analytics"),
            ("datasources.analytics.jndiName", "java:comp/env/jdbc/analytics"),
        ],
        &[],
        &SettingsResolver::default(),
    )
    .unwrap();

    let primary = datasources.primary().unwrap();
    assert_eq!(primary.driver_class_name(), "sqlite");
    assert_eq!(primary.username(), "app");

    let analytics = datasources.get("analytics").unwrap();
    assert_eq!(analytics.driver_class_name(), "mysql");
    assert_eq!(analytics.jndi_name(), Some("java:comp/env/jdbc/analytics"));
    assert_eq!(analytics.validation_query(), "");
}
