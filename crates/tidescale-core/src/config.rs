//! tidescale.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration {value:?} for `{field}`")]
    Duration { field: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TideConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub controller: ControllerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8443 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/tidescale"),
        }
    }
}

/// Controller loop timing, as duration strings (`"30s"`, `"5m"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub resync_interval: String,
    pub backoff_base: String,
    pub backoff_max: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resync_interval: "30s".to_string(),
            backoff_base: "1s".to_string(),
            backoff_max: "60s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info,tidescale=debug".to_string(),
            json: false,
        }
    }
}

/// Parsed controller timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerTimings {
    pub resync_interval: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for ControllerTimings {
    fn default() -> Self {
        Self {
            resync_interval: Duration::from_secs(30),
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
        }
    }
}

impl TideConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: TideConfig = toml::from_str(content)?;
        config.controller.timings()?;
        Ok(config)
    }
}

impl ControllerConfig {
    /// Parse the duration strings. A zero resync interval and any value
    /// above [`MAX_CONTROLLER_DURATION`] are rejected.
    pub fn timings(&self) -> Result<ControllerTimings, ConfigError> {
        let resync_interval = field_duration("controller.resync_interval", &self.resync_interval)?;
        if resync_interval.is_zero() {
            return Err(ConfigError::Duration {
                field: "controller.resync_interval",
                value: self.resync_interval.clone(),
            });
        }
        Ok(ControllerTimings {
            resync_interval,
            backoff_base: field_duration("controller.backoff_base", &self.backoff_base)?,
            backoff_max: field_duration("controller.backoff_max", &self.backoff_max)?,
        })
    }
}

/// Upper bound for every controller timing.
pub const MAX_CONTROLLER_DURATION: Duration = Duration::from_secs(24 * 3600);

fn field_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value)
        .filter(|d| *d <= MAX_CONTROLLER_DURATION)
        .ok_or_else(|| ConfigError::Duration {
            field,
            value: value.to_string(),
        })
}

/// Parse a duration string like `"500ms"`, `"30s"`, `"5m"`, `"1h"`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok()?.checked_mul(60).map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours.parse::<u64>().ok()?.checked_mul(3600).map(Duration::from_secs)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_resync_interval_is_rejected() {
        let err = TideConfig::parse("[controller]\nresync_interval = \"0s\"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Duration {
                field: "controller.resync_interval",
                ..
            }
        ));
    }

    #[test]
    fn oversized_durations_are_rejected() {
        assert_eq!(parse_duration("18446744073709551615m"), None);
        assert_eq!(parse_duration("18446744073709551615h"), None);
        assert_eq!(parse_duration("24h"), Some(MAX_CONTROLLER_DURATION));

        let err = TideConfig::parse("[controller]\nbackoff_max = \"1000000h\"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Duration {
                field: "controller.backoff_max",
                ..
            }
        ));
        assert!(TideConfig::parse("[controller]\nbackoff_base = \"25h\"\n").is_err());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = TideConfig::parse("").unwrap();
        assert_eq!(config.server.port, 8443);
        assert!(!config.log.json);

        let timings = config.controller.timings().unwrap();
        assert_eq!(timings.resync_interval, Duration::from_secs(30));
        assert_eq!(timings.backoff_base, Duration::from_secs(1));
        assert_eq!(timings.backoff_max, Duration::from_secs(60));
    }

    #[test]
    fn parse_partial_sections() {
        let toml_str = r#"
[server]
port = 9000

[controller]
resync_interval = "10s"

[log]
json = true
"#;
        let config = TideConfig::parse(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert!(config.log.json);
        assert_eq!(config.log.filter, "info,tidescale=debug");
        assert_eq!(
            config.controller.timings().unwrap().resync_interval,
            Duration::from_secs(10)
        );
    }

    #[test]
    fn malformed_duration_is_rejected() {
        let err = TideConfig::parse("[controller]\nbackoff_max = \"soon\"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Duration { field: "controller.backoff_max", .. }
        ));
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("30"), None);
        assert_eq!(parse_duration("xs"), None);
    }
}
