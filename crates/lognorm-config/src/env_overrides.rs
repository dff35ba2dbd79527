use super::{LogFormat, NormalizerConfig};
use anyhow::{Context, Result};

pub const ENV_PREFIX: &str = "LOGNORM_";

/// Abstraction over environment-variable lookups so tests and embedders can
/// supply their own source of overrides.
pub trait EnvSource {
    /// Get a variable by its name without the `LOGNORM_` prefix
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut NormalizerConfig, env: &E) -> Result<()> {
    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.logging.format = format
            .parse::<LogFormat>()
            .context("Invalid LOGNORM_LOG_FORMAT value")?;
    }

    // Buffer pool
    if let Some(val) = get_env_usize(env, "POOL_MAX_IDLE")? {
        config.pool.max_idle = val;
    }
    if let Some(val) = get_env_usize(env, "POOL_INITIAL")? {
        config.pool.initial = val;
    }

    // Row ids
    if let Some(node) = get_env_string(env, "ROW_ID_NODE") {
        config.row_id.node = Some(node);
    }

    // Comma separated wire names
    if let Some(list) = get_env_string(env, "DEFAULT_INDICATORS") {
        let fields = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        config.indicators.default_fields = Some(fields);
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    get_env_string(env, key)
        .map(|val| {
            val.parse::<usize>()
                .with_context(|| format!("{}{} must be a positive integer", ENV_PREFIX, key))
        })
        .transpose()
}
