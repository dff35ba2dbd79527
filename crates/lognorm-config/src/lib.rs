// lognorm-config - Configuration for the log normalizer
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from LOGNORM_CONFIG env var
// 3. Config file contents from LOGNORM_CONFIG_CONTENT env var
// 4. Default config file locations (./lognorm.toml, ./.lognorm.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, EnvSource, ENV_PREFIX};
pub use sources::{load_config, load_from_file_path, load_or_default};

/// Main normalizer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub row_id: RowIdConfig,

    #[serde(default)]
    pub indicators: IndicatorConfig,

    /// Extra time codecs, keyed by the name fields reference them with
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub time_codecs: BTreeMap<String, TimeCodecConfig>,
}

impl NormalizerConfig {
    /// Merge a file config over this one; sections present in the file win
    pub fn merge(&mut self, other: NormalizerConfig) {
        self.logging = other.logging;
        self.pool = other.pool;
        if other.row_id.node.is_some() {
            self.row_id = other.row_id;
        }
        if let Some(fields) = other.indicators.default_fields {
            self.indicators.default_fields = Some(fields);
        }
        self.time_codecs.extend(other.time_codecs);
    }

    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

/// Value buffer pool sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_pool_max_idle")]
    pub max_idle: usize,
    /// Buffers allocated up front
    #[serde(default)]
    pub initial: usize,
}

fn default_pool_max_idle() -> usize {
    64
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: default_pool_max_idle(),
            initial: 0,
        }
    }
}

/// Row id generator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIdConfig {
    /// Six-byte node id as 12 hex characters; detected from the host when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

/// Indicator fields rendered on every record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Wire names such as `p_any_ip_addresses`; the built-in list when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_fields: Option<Vec<String>>,
}

/// One named time codec: exactly one of `layout` or `strftime`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCodecConfig {
    /// Reference-time layout, e.g. `2006-01-02 15:04:05`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    /// strftime format, e.g. `%Y-%m-%d %H:%M:%S`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strftime: Option<String>,

    /// `UTC`, `Local` or a fixed offset such as `+02:00`; UTC when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_expectations() {
        let config = NormalizerConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.pool.max_idle, 64);
        assert_eq!(config.pool.initial, 0);
        assert!(config.row_id.node.is_none());
        assert!(config.indicators.default_fields.is_none());
        assert!(config.time_codecs.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_full_toml() {
        let config: NormalizerConfig = toml::from_str(
            r#"
            [logging]
            level = "debug"
            format = "json"

            [pool]
            max_idle = 8
            initial = 2

            [row_id]
            node = "0a1b2c3d4e5f"

            [indicators]
            default_fields = ["p_any_ip_addresses", "p_any_trace_ids"]

            [time_codecs.syslog]
            layout = "Jan _2 15:04:05"
            location = "Local"

            [time_codecs.apache]
            strftime = "%d/%b/%Y:%H:%M:%S %z"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.pool.initial, 2);
        assert_eq!(config.row_id.node.as_deref(), Some("0a1b2c3d4e5f"));
        assert_eq!(
            config.indicators.default_fields,
            Some(vec![
                "p_any_ip_addresses".to_string(),
                "p_any_trace_ids".to_string()
            ])
        );
        assert_eq!(
            config.time_codecs["syslog"].location.as_deref(),
            Some("Local")
        );
        assert!(config.time_codecs["apache"].layout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn merge_keeps_unset_sections() {
        let mut config = NormalizerConfig::default();
        config.row_id.node = Some("000000000001".to_string());
        config
            .time_codecs
            .insert("a".to_string(), TimeCodecConfig::default());

        let file: NormalizerConfig = toml::from_str(
            r#"
            [pool]
            max_idle = 4
            [time_codecs.b]
            strftime = "%s"
            "#,
        )
        .unwrap();
        config.merge(file);

        assert_eq!(config.pool.max_idle, 4);
        assert_eq!(config.row_id.node.as_deref(), Some("000000000001"));
        assert_eq!(config.time_codecs.len(), 2);
    }

    #[test]
    fn log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
