//! # Configuration
//!
//! Application configuration loaded from YAML with environment overrides for
//! the database section.
//!
//! ```yaml
//! app:
//!   default_namespace: shop
//!   controller_suffix: Controller
//!   action_suffix: Action
//! modules:
//!   admin:
//!     path: modules/admin
//!     class_name: AdminModule
//! database:
//!   host: localhost
//!   port: 27017
//!   db: shop
//! cookies:
//!   encryption_key: change-me
//! logging:
//!   level: info
//!   format: json
//! ```
//!
//! | Variable | Overrides |
//! |---|---|
//! | `MVC_DB_HOST` | `database.host` |
//! | `MVC_DB_PORT` | `database.port` |
//! | `MVC_DB_USERNAME` | `database.username` |
//! | `MVC_DB_PASSWORD` | `database.password` |
//! | `MVC_DB_NAME` | `database.db` |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use crate::app::{ModuleDescriptor, DEFAULT_ACTION_SUFFIX, DEFAULT_CONTROLLER_SUFFIX};
use crate::db::ServerConfig;
use crate::logging::LogConfig;

fn default_controller_suffix() -> String {
    DEFAULT_CONTROLLER_SUFFIX.to_string()
}

fn default_action_suffix() -> String {
    DEFAULT_ACTION_SUFFIX.to_string()
}

/// Naming conventions used to resolve controllers and actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSection {
    #[serde(default)]
    pub default_namespace: Option<String>,
    #[serde(default = "default_controller_suffix")]
    pub controller_suffix: String,
    #[serde(default = "default_action_suffix")]
    pub action_suffix: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            default_namespace: None,
            controller_suffix: default_controller_suffix(),
            action_suffix: default_action_suffix(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(flatten)]
    pub server: ServerConfig,
    #[serde(default)]
    pub db: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiesSection {
    /// Passphrase for cookie encryption; encryption is unavailable without it.
    #[serde(default)]
    pub encryption_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleDescriptor>,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub cookies: CookiesSection,
    #[serde(default)]
    pub logging: LogConfig,
}

impl AppConfig {
    /// Read a YAML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Parse YAML without environment overrides. An empty document yields
    /// the defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Invalid configuration")
    }

    /// Apply `MVC_DB_*` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let server = &mut self.database.server;
        if let Some(host) = lookup("MVC_DB_HOST") {
            server.host = host;
        }
        if let Some(port) = lookup("MVC_DB_PORT") {
            server.port = port
                .parse()
                .with_context(|| format!("MVC_DB_PORT is not a port number: {port}"))?;
        }
        if let Some(username) = lookup("MVC_DB_USERNAME") {
            server.username = Some(username);
        }
        if let Some(password) = lookup("MVC_DB_PASSWORD") {
            server.password = Some(password);
        }
        if let Some(db) = lookup("MVC_DB_NAME") {
            self.database.db = db;
        }
        Ok(())
    }

    #[must_use]
    pub fn server_config(&self) -> &ServerConfig {
        &self.database.server
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    const SAMPLE: &str = r#"
app:
  default_namespace: shop
  controller_suffix: Ctl
modules:
  admin:
    path: modules/admin
    class_name: AdminModule
database:
  host: mongo.internal
  port: 27018
  db: shop
cookies:
  encryption_key: secret
logging:
  level: debug
  format: pretty
"#;

    #[test]
    fn test_parse_full_document() {
        let config = AppConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.app.default_namespace.as_deref(), Some("shop"));
        assert_eq!(config.app.controller_suffix, "Ctl");
        assert_eq!(config.app.action_suffix, "Action");
        assert_eq!(config.modules["admin"].path, PathBuf::from("modules/admin"));
        assert_eq!(config.modules["admin"].class_name, "AdminModule");
        assert_eq!(config.server_config().dsn(), "mongodb://mongo.internal:27018");
        assert_eq!(config.database.db, "shop");
        assert_eq!(config.cookies.encryption_key.as_deref(), Some("secret"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, crate::logging::LogFormat::Pretty);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = AppConfig::from_yaml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server_config().dsn(), "mongodb://localhost:27017");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::from_yaml_str(SAMPLE).unwrap();
        let vars: HashMap<&str, &str> = [
            ("MVC_DB_HOST", "db"),
            ("MVC_DB_USERNAME", "app"),
            ("MVC_DB_PASSWORD", "pw"),
            ("MVC_DB_NAME", "other"),
        ]
        .into_iter()
        .collect();
        config
            .apply_env_overrides(|k| vars.get(k).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(config.server_config().dsn(), "mongodb://app:pw@db");
        assert_eq!(config.database.db, "other");

        let bad_port =
            config.apply_env_overrides(|k| (k == "MVC_DB_PORT").then(|| "x".to_string()));
        assert!(bad_port.is_err());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(AppConfig::from_yaml_str("app: [unclosed").is_err());
    }
}
