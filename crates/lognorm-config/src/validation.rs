// Configuration validation
//
// Validates that values are sensible before the normalizer is built

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

const NODE_HEX_LEN: usize = 12;

pub fn validate_config(config: &NormalizerConfig) -> Result<()> {
    validate_logging_config(&config.logging)?;
    validate_pool_config(&config.pool)?;
    validate_row_id_config(&config.row_id)?;

    for (name, codec) in &config.time_codecs {
        validate_time_codec_config(name, codec)?;
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    if config.level.trim().is_empty() {
        bail!("logging.level must not be empty");
    }
    Ok(())
}

fn validate_pool_config(config: &PoolConfig) -> Result<()> {
    if config.max_idle == 0 {
        bail!("pool.max_idle must be greater than 0");
    }

    if config.initial > config.max_idle {
        warn!(
            initial = config.initial,
            max_idle = config.max_idle,
            "pool.initial exceeds pool.max_idle; only max_idle buffers are allocated"
        );
    }

    // Warn about very large pools
    if config.max_idle > 100_000 {
        warn!(
            max_idle = config.max_idle,
            "pool.max_idle is very large; idle buffers are never freed"
        );
    }

    Ok(())
}

fn validate_row_id_config(config: &RowIdConfig) -> Result<()> {
    if let Some(node) = &config.node {
        if node.len() != NODE_HEX_LEN || !node.bytes().all(|b| b.is_ascii_hexdigit()) {
            bail!(
                "row_id.node must be {} hex characters, got {:?}",
                NODE_HEX_LEN,
                node
            );
        }
    }
    Ok(())
}

fn validate_time_codec_config(name: &str, config: &TimeCodecConfig) -> Result<()> {
    if name.is_empty() {
        bail!("time codec names must not be empty");
    }

    match (&config.layout, &config.strftime) {
        (Some(_), Some(_)) => {
            bail!("time_codecs.{name}: set either layout or strftime, not both")
        }
        (None, None) => bail!("time_codecs.{name}: one of layout or strftime is required"),
        (Some(format), None) | (None, Some(format)) if format.is_empty() => {
            bail!("time_codecs.{name}: format must not be empty")
        }
        _ => {}
    }

    Ok(())
}
