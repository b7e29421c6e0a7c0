use std::path::PathBuf;

use chrono_tz::Tz;
use thiserror::Error;

use crate::SERVICE_NAME;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8004;
pub const DEFAULT_DOCUMENTS_DIR: &str = "/app/documents";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("PORT must be a number between 1 and 65535, got '{0}'")]
    InvalidPort(String),
    #[error("TZ must be an IANA timezone name, got '{0}'")]
    InvalidTimezone(String),
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub timezone: Tz,
    pub documents_dir: PathBuf,
    pub default_author: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timezone: Tz::UTC,
            documents_dir: PathBuf::from(DEFAULT_DOCUMENTS_DIR),
            default_author: SERVICE_NAME.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable lookup. Unset and empty
    /// variables fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or(SettingsError::InvalidPort(raw))?,
            None => defaults.port,
        };
        let timezone = match get("TZ") {
            Some(raw) => raw
                .trim()
                .parse::<Tz>()
                .map_err(|_| SettingsError::InvalidTimezone(raw.clone()))?,
            None => defaults.timezone,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            timezone,
            documents_dir: get("DOCUMENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.documents_dir),
            default_author: get("DEFAULT_AUTHOR").unwrap_or(defaults.default_author),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.bind_address(), "0.0.0.0:8004");
    }

    #[test]
    fn test_reads_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("TZ", "Asia/Tokyo"),
            ("DOCUMENTS_DIR", "/tmp/docs"),
            ("DEFAULT_AUTHOR", ""),
        ]))
        .unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(settings.documents_dir, PathBuf::from("/tmp/docs"));
        assert_eq!(settings.default_author, SERVICE_NAME);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert_eq!(
            Settings::from_lookup(lookup(&[("PORT", "http")])),
            Err(SettingsError::InvalidPort("http".to_string()))
        );
        assert_eq!(
            Settings::from_lookup(lookup(&[("TZ", "Mars/Olympus")])),
            Err(SettingsError::InvalidTimezone("Mars/Olympus".to_string()))
        );
    }
}
