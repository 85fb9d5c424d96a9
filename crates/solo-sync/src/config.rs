//! # Import Configuration
//!
//! Configuration for the external sales import.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SOLO_RELAY_URL=https://relay.example.com                           │
//! │     SOLO_PAGE_SIZE=100                                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/solo-backoffice/solo.toml (Linux)                        │
//! │     ~/Library/Application Support/com.solo.backoffice/solo.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     page size 100, 50 pages max, 30 s timeout                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # solo.toml
//! [relay]
//! url = "https://solo-relay.example.com"
//! page_size = 100
//! max_pages = 50
//! timeout_secs = 30
//!
//! [database]
//! path = "/var/lib/solo/solo.db"
//! invoice_dir = "/var/lib/solo/invoices"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Relay Settings
// =============================================================================

/// Where and how to page through the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Base URL of the relay; `/api/login` and `/api/sales` hang off it.
    #[serde(default = "default_relay_url")]
    pub url: String,

    /// Rows requested per page. A shorter page ends the fetch.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Hard ceiling on pages per import.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_relay_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    50
}

fn default_timeout() -> u64 {
    30
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            url: default_relay_url(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            timeout_secs: default_timeout(),
        }
    }
}

impl RelaySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parsed base URL, always ending in `/` so endpoints join under it.
    pub fn base_url(&self) -> SyncResult<Url> {
        let mut url = Url::parse(&self.url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_invoice_dir")]
    pub invoice_dir: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./solo.db")
}

fn default_invoice_dir() -> PathBuf {
    PathBuf::from("./invoices")
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            invoice_dir: default_invoice_dir(),
        }
    }
}

// =============================================================================
// Main Import Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub relay: RelaySettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (solo.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading import config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> SyncResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = self.relay.base_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "Relay URL must start with http:// or https://, got: {}",
                self.relay.url
            )));
        }

        if self.relay.page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "page_size must be greater than 0".into(),
            ));
        }

        if self.relay.max_pages == 0 {
            return Err(SyncError::InvalidConfig(
                "max_pages must be greater than 0".into(),
            ));
        }

        if self.relay.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `SOLO_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SOLO_RELAY_URL") {
            debug!(url = %url, "Overriding relay URL from environment");
            self.relay.url = url;
        }

        if let Some(path) = lookup("SOLO_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(dir) = lookup("SOLO_INVOICE_DIR") {
            self.database.invoice_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup("SOLO_PAGE_SIZE") {
            match raw.parse::<u32>() {
                Ok(size) => self.relay.page_size = size,
                Err(_) => warn!(value = %raw, "Ignoring unparsable SOLO_PAGE_SIZE"),
            }
        }

        if let Some(raw) = lookup("SOLO_MAX_PAGES") {
            match raw.parse::<u32>() {
                Ok(pages) => self.relay.max_pages = pages,
                Err(_) => warn!(value = %raw, "Ignoring unparsable SOLO_MAX_PAGES"),
            }
        }

        if let Some(raw) = lookup("SOLO_HTTP_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => self.relay.timeout_secs = secs,
                Err(_) => warn!(value = %raw, "Ignoring unparsable SOLO_HTTP_TIMEOUT_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "solo", "backoffice")
            .map(|dirs| dirs.config_dir().join("solo.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.relay.page_size, 100);
        assert_eq!(config.relay.max_pages, 50);
        assert_eq!(config.relay.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ImportConfig::from_toml(
            r#"
            [relay]
            url = "https://relay.example.com"
            max_pages = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.relay.url, "https://relay.example.com");
        assert_eq!(config.relay.max_pages, 10);
        assert_eq!(config.relay.page_size, 100);
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ImportConfig::default();

        config.relay.url = "ftp://relay".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.relay.url = "not a url".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.relay.url = "https://relay.example.com".into();
        config.relay.page_size = 0;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));

        config.relay.page_size = 100;
        config.relay.max_pages = 0;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let mut relay = RelaySettings {
            url: "https://host.example.com/relay".into(),
            ..RelaySettings::default()
        };
        assert_eq!(relay.base_url().unwrap().as_str(), "https://host.example.com/relay/");

        relay.url = "https://host.example.com/relay/".into();
        assert_eq!(relay.base_url().unwrap().as_str(), "https://host.example.com/relay/");

        relay.url = "http://localhost:3000".into();
        assert_eq!(relay.base_url().unwrap().as_str(), "http://localhost:3000/");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SOLO_RELAY_URL", "https://other.example.com"),
            ("SOLO_PAGE_SIZE", "25"),
            ("SOLO_MAX_PAGES", "many"),
            ("SOLO_DATABASE_PATH", "/tmp/solo.db"),
        ]);
        let mut config = ImportConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.relay.url, "https://other.example.com");
        assert_eq!(config.relay.page_size, 25);
        assert_eq!(config.relay.max_pages, 50);
        assert_eq!(config.database.path, PathBuf::from("/tmp/solo.db"));
    }
}
