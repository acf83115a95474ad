//! Raw and effective datasource settings.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The datasource fields that have a default when left unconfigured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    DriverClassName,
    Url,
    Username,
    Password,
    ValidationQuery,
}

impl Setting {
    pub const ALL: [Setting; 5] = [
        Setting::DriverClassName,
        Setting::Url,
        Setting::Username,
        Setting::Password,
        Setting::ValidationQuery,
    ];

    /// Property key in normalized snake_case form.
    pub fn key(&self) -> &'static str {
        match self {
            Self::DriverClassName => "driver_class_name",
            Self::Url => "url",
            Self::Username => "username",
            Self::Password => "password",
            Self::ValidationQuery => "validation_query",
        }
    }
}

impl std::fmt::Display for Setting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Setting {
    type Err = String;

    /// Accepts kebab-case, snake_case and camelCase keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = crate::config::normalize_key(s);
        Self::ALL
            .into_iter()
            .find(|setting| setting.key() == key)
            .ok_or_else(|| format!("Unknown datasource setting: {s}"))
    }
}

/// Replacement shown in place of secrets.
const MASK: &str = "****";

/// Returns the value only if it contains non-whitespace text.
pub(crate) fn has_text(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Query parameters that carry a secret (`password`, `sslpassword`).
fn is_secret_param(key: &str) -> bool {
    key.to_ascii_lowercase().ends_with("password")
}

/// Mask the password of a connection URL, in the userinfo as well as in
/// query parameters. Unparseable URLs are returned unchanged.
pub fn mask_url(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };

    let mut masked = parsed.password().is_some() && parsed.set_password(Some(MASK)).is_ok();

    if parsed.query_pairs().any(|(key, _)| is_secret_param(&key)) {
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(key, value)| {
                let value = if is_secret_param(&key) {
                    MASK.to_string()
                } else {
                    value.into_owned()
                };
                (key.into_owned(), value)
            })
            .collect();
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
        masked = true;
    }

    if masked {
        parsed.to_string()
    } else {
        url.to_string()
    }
}

/// Settings exactly as supplied by configuration input.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RawSettings {
    pub driver_class_name: Option<String>,
    pub url: Option<String>,
    pub username: Option<String>,
    /// Sensitive - never log
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub validation_query: Option<String>,
}

impl RawSettings {
    pub fn get(&self, setting: Setting) -> Option<&str> {
        match setting {
            Setting::DriverClassName => self.driver_class_name.as_deref(),
            Setting::Url => self.url.as_deref(),
            Setting::Username => self.username.as_deref(),
            Setting::Password => self.password.as_deref(),
            Setting::ValidationQuery => self.validation_query.as_deref(),
        }
    }

    /// Replace a value, returning the previous one.
    pub fn set(&mut self, setting: Setting, value: Option<String>) -> Option<String> {
        let slot = match setting {
            Setting::DriverClassName => &mut self.driver_class_name,
            Setting::Url => &mut self.url,
            Setting::Username => &mut self.username,
            Setting::Password => &mut self.password,
            Setting::ValidationQuery => &mut self.validation_query,
        };
        std::mem::replace(slot, value)
    }

    /// Value of a setting if it holds text.
    pub fn configured(&self, setting: Setting) -> Option<&str> {
        has_text(self.get(setting))
    }
}

impl std::fmt::Debug for RawSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawSettings")
            .field("driver_class_name", &self.driver_class_name)
            .field("url", &self.url.as_deref().map(mask_url))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| MASK))
            .field("validation_query", &self.validation_query)
            .finish()
    }
}

/// Values used at runtime, either configured or defaulted.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveSettings {
    pub driver_class_name: String,
    pub url: String,
    pub username: String,
    /// Sensitive - never log
    #[serde(skip_serializing)]
    pub password: String,
    pub validation_query: String,
}

impl EffectiveSettings {
    pub fn get(&self, setting: Setting) -> &str {
        match setting {
            Setting::DriverClassName => &self.driver_class_name,
            Setting::Url => &self.url,
            Setting::Username => &self.username,
            Setting::Password => &self.password,
            Setting::ValidationQuery => &self.validation_query,
        }
    }

    /// Get a display-safe version of the URL (credentials masked).
    pub fn masked_url(&self) -> String {
        mask_url(&self.url)
    }
}

impl std::fmt::Debug for EffectiveSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectiveSettings")
            .field("driver_class_name", &self.driver_class_name)
            .field("url", &self.masked_url())
            .field("username", &self.username)
            .field("password", &MASK)
            .field("validation_query", &self.validation_query)
            .finish()
    }
}
