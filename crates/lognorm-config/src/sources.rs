// Configuration source loading
//
// Priority order:
// 1. Environment variables (LOGNORM_* prefix)
// 2. Config file path from LOGNORM_CONFIG
// 3. Inline config content from LOGNORM_CONFIG_CONTENT
// 4. Default config files (./lognorm.toml, ./.lognorm.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::NormalizerConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_FILES: [&str; 2] = ["./lognorm.toml", "./.lognorm.toml"];

/// Load configuration from files and the process environment.
pub fn load_config() -> Result<NormalizerConfig> {
    load_with_env(&StdEnvSource)
}

fn load_with_env<E: EnvSource>(env: &E) -> Result<NormalizerConfig> {
    let mut config = NormalizerConfig::default();

    if let Some(file_config) = load_from_file(env)? {
        config.merge(file_config);
    }

    env_overrides::apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file<E: EnvSource>(env: &E) -> Result<Option<NormalizerConfig>> {
    if let Some(path) = env.get("CONFIG") {
        return read_config_file(Path::new(&path)).map(Some);
    }

    if let Some(content) = env.get("CONFIG_CONTENT") {
        let config: NormalizerConfig = toml::from_str(&content)
            .context("Failed to parse inline config from LOGNORM_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_CONFIG_FILES {
        let path = Path::new(path);
        if path.exists() {
            return read_config_file(path).map(Some);
        }
    }

    Ok(None)
}

fn read_config_file(path: &Path) -> Result<NormalizerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (for a `--config` flag).
/// Returns error if file doesn't exist or can't be parsed.
/// Environment overrides still apply on top of the file.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<NormalizerConfig> {
    let mut config = NormalizerConfig::default();
    config.merge(read_config_file(path.as_ref())?);

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration with graceful fallback to defaults.
/// Unreadable or malformed config files are skipped.
pub fn load_or_default() -> Result<NormalizerConfig> {
    let mut config = NormalizerConfig::default();

    if let Ok(Some(file_config)) = load_from_file(&StdEnvSource) {
        config.merge(file_config);
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}
