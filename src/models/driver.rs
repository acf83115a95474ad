//! Driver-related data models.
//!
//! This module defines the database types known to the pool adapter and the
//! ordered catalog of embedded drivers used to synthesize default settings.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

/// Placeholder replaced by the datasource name in a descriptor URL template.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Characters of a datasource name left as-is inside a URL path segment.
const NAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.trim().to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Parse database type from a driver name such as `postgres` or `sqlite`.
    pub fn from_driver_name(driver: &str) -> Option<Self> {
        match driver.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::PostgreSQL),
            "mysql" | "mariadb" => Some(Self::MySQL),
            "sqlite" | "sqlite3" => Some(Self::SQLite),
            _ => None,
        }
    }

    /// Driver name of the sqlx backend serving this database type.
    pub fn driver_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "postgres",
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Whether connections carry a username and password.
    pub fn uses_credentials(&self) -> bool {
        !matches!(self, Self::SQLite)
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A known embedded driver and the defaults it provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverDescriptor {
    pub driver_class_name: &'static str,
    /// In-memory URL with a `{name}` placeholder for the datasource name.
    pub url_template: &'static str,
    pub username: &'static str,
    pub password: &'static str,
    pub validation_query: &'static str,
}

impl DriverDescriptor {
    /// SQLite shared-cache in-memory database, one per datasource name.
    pub const SQLITE: DriverDescriptor = DriverDescriptor {
        driver_class_name: "sqlite",
        url_template: "sqlite:file:{name}?mode=memory&cache=shared",
        username: "",
        password: "",
        validation_query: "SELECT 1",
    };

    /// Build the in-memory URL for the given datasource.
    ///
    /// The name is percent-encoded, so `?`, `#` or `%` in a name cannot leak
    /// into the query part of the URL.
    pub fn url_for(&self, datasource: &str) -> String {
        let name = utf8_percent_encode(datasource, NAME_ENCODE_SET).to_string();
        self.url_template.replace(NAME_PLACEHOLDER, &name)
    }

    /// Check whether this descriptor serves the given driver name.
    pub fn matches(&self, driver: &str) -> bool {
        self.driver_class_name.eq_ignore_ascii_case(driver.trim())
    }
}

/// Ordered list of embedded drivers, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCatalog {
    drivers: Vec<DriverDescriptor>,
}

impl DriverCatalog {
    /// Create a catalog from descriptors in preference order.
    pub fn new(drivers: Vec<DriverDescriptor>) -> Self {
        Self { drivers }
    }

    /// The built-in catalog of embedded drivers.
    pub fn embedded() -> Self {
        Self::new(vec![DriverDescriptor::SQLITE])
    }

    pub fn iter(&self) -> impl Iterator<Item = &DriverDescriptor> {
        self.drivers.iter()
    }

    /// Find the descriptor for a driver name.
    pub fn find(&self, driver: &str) -> Option<&DriverDescriptor> {
        self.drivers.iter().find(|d| d.matches(driver))
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl Default for DriverCatalog {
    fn default() -> Self {
        Self::embedded()
    }
}
