//! Structured logging setup.
//!
//! [`init_logging`] installs a `tracing-subscriber` registry with an
//! [`EnvFilter`] and either a JSON or a human-readable formatter. Every
//! [`App::handle`](crate::app::App::handle) call runs inside a `dispatch` span
//! carrying its request id, so the lines an action emits can be correlated.
//!
//! The configuration comes from the `logging` section of the YAML file, and
//! the environment wins over it:
//!
//! | Variable | Field |
//! |---|---|
//! | `MVC_LOG_LEVEL` | `level` (trace/debug/info/warn/error) |
//! | `MVC_LOG_FORMAT` | `format` (json/pretty) |
//! | `MVC_LOG_TARGET_FILTER` | `directives`, comma-separated |
//! | `MVC_LOG_INCLUDE_LOCATION` | `location` |
//!
//! `RUST_LOG`, when set, replaces the level entirely.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, with the span stack
    #[default]
    Json,
    /// Multi-line output for terminals
    Pretty,
}

impl LogFormat {
    /// Unknown names fall back to JSON.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    /// Extra `EnvFilter` directives such as `mvcore::db=trace`
    pub directives: Vec<String>,
    /// Print file and line of each event
    pub location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            directives: Vec::new(),
            location: false,
        }
    }
}

impl LogConfig {
    /// Verbose, pretty output for local work.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            directives: Vec::new(),
            location: true,
        }
    }

    /// Defaults overlaid with `MVC_LOG_*`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Overlay `MVC_LOG_*` on this configuration.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.overlay(|key| env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(level) = lookup("MVC_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(format) = lookup("MVC_LOG_FORMAT") {
            self.format = LogFormat::from_name(&format);
        }
        if let Some(targets) = lookup("MVC_LOG_TARGET_FILTER") {
            self.directives = targets
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(location) = lookup("MVC_LOG_INCLUDE_LOCATION").and_then(|v| v.parse().ok()) {
            self.location = location;
        }
        self
    }

    /// The configured level, `INFO` when it does not parse.
    #[must_use]
    pub fn max_level(&self) -> Level {
        self.level.trim().parse().unwrap_or(Level::INFO)
    }

    /// `RUST_LOG` or the level, plus the extra directives. Directives that do
    /// not parse are reported on stderr and skipped.
    pub fn env_filter(&self) -> EnvFilter {
        let base = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.max_level().as_str()));
        self.directives
            .iter()
            .fold(base, |filter, directive| match directive.parse() {
                Ok(parsed) => filter.add_directive(parsed),
                Err(err) => {
                    eprintln!("Ignoring log directive '{directive}': {err}");
                    filter
                }
            })
    }
}

/// Install the global subscriber. Fails if one is already installed.
///
/// ```no_run
/// use mvcore::logging::{init_logging, LogConfig};
///
/// init_logging(&LogConfig::from_env()).expect("logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let output = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_thread_names(true)
            .with_file(config.location)
            .with_line_number(config.location)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(config.location)
            .with_line_number(config.location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(output)
        .try_init()
        .context("A global tracing subscriber is already installed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::from_name("Pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_name("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("xml"), LogFormat::Json);
    }

    #[test]
    fn test_overlay_only_touches_present_variables() {
        let base = LogConfig::development();
        assert_eq!(base.clone().overlay(|_| None), base);

        let config = LogConfig::default().overlay(|key| match key {
            "MVC_LOG_LEVEL" => Some("warn".into()),
            "MVC_LOG_TARGET_FILTER" => Some("mvcore::db=trace, ,hyper=off".into()),
            "MVC_LOG_INCLUDE_LOCATION" => Some("yes".into()),
            _ => None,
        });
        assert_eq!(config.max_level(), Level::WARN);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directives, vec!["mvcore::db=trace", "hyper=off"]);
        assert!(!config.location);
    }

    #[test]
    fn test_unparsable_level_means_info() {
        let config = LogConfig {
            level: "loud".into(),
            ..LogConfig::default()
        };
        assert_eq!(config.max_level(), Level::INFO);
    }

    #[test]
    fn test_yaml_section() {
        let config: LogConfig =
            serde_yaml::from_str("level: debug\nformat: pretty\ndirectives: [mvcore=trace]\n")
                .unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.directives, vec!["mvcore=trace"]);
        assert!(!config.location);
    }
}
