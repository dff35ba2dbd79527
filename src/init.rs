// Initialization utilities
//
// Normalizer construction and logging/tracing setup from NormalizerConfig

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use lognorm_config::{LogFormat, LoggingConfig, NormalizerConfig, TimeCodecConfig};
use lognorm_core::rowid::NODE_ID_LEN;
use lognorm_core::time::LayoutCodec;
use lognorm_core::{BufferPool, FieldId, Location, Normalizer, Registry, RowIdGenerator, TimeCodec};
use tracing::{info, warn};

/// Build a normalizer from config: built-in registry plus configured time
/// codecs, sized buffer pool, row id node and default indicator fields
pub fn build_normalizer(config: &NormalizerConfig) -> Result<Normalizer> {
    let mut registry = Registry::builtin().context("Failed to build built-in registry")?;

    for (name, codec_config) in &config.time_codecs {
        let codec = build_time_codec(codec_config)
            .with_context(|| format!("Invalid time codec config: {}", name))?;
        if registry.set_time_codec(name.as_str(), codec).is_some() {
            warn!(codec = %name, "Configured time codec replaces a built-in codec");
        }
    }

    let pool = BufferPool::with_initial(config.pool.max_idle, config.pool.initial);

    let row_ids = match &config.row_id.node {
        Some(node) => RowIdGenerator::for_node(parse_node(node)?),
        None => RowIdGenerator::new(),
    };

    let mut normalizer = Normalizer::new(Arc::new(registry))
        .with_pool(Arc::new(pool))
        .with_row_ids(Arc::new(row_ids));

    if let Some(wire_names) = &config.indicators.default_fields {
        let ids = resolve_indicators(normalizer.registry(), wire_names);
        normalizer = normalizer.with_default_indicators(ids);
    }

    info!(
        time_codecs = normalizer.registry().time_codecs().len(),
        pool_max_idle = normalizer.pool().max_idle(),
        row_id_node = %hex::encode(normalizer.row_ids().node()),
        default_indicators = normalizer.default_indicators().len(),
        "Initialized normalizer"
    );

    Ok(normalizer)
}

fn build_time_codec(config: &TimeCodecConfig) -> Result<TimeCodec> {
    let codec = match (&config.layout, &config.strftime) {
        (Some(layout), None) => LayoutCodec::reference(layout)?,
        (None, Some(format)) => LayoutCodec::strftime(format)?,
        _ => bail!("set exactly one of layout or strftime"),
    };
    let codec = match &config.location {
        Some(location) => {
            let location: Location = location
                .parse()
                .with_context(|| format!("Invalid time zone location: {}", location))?;
            codec.with_location(location)
        }
        None => codec,
    };
    Ok(TimeCodec::new(codec))
}

fn parse_node(node: &str) -> Result<[u8; NODE_ID_LEN]> {
    let bytes = hex::decode(node).with_context(|| format!("Invalid row_id.node: {}", node))?;
    <[u8; NODE_ID_LEN]>::try_from(bytes.as_slice())
        .map_err(|_| anyhow!("row_id.node must be {} bytes, got {}", NODE_ID_LEN, bytes.len()))
}

/// Wire names to registered indicator ids; unknown names are skipped
fn resolve_indicators(registry: &Registry, wire_names: &[String]) -> Vec<FieldId> {
    let mut ids = Vec::with_capacity(wire_names.len());
    for wire_name in wire_names {
        match registry.fields().find_by_wire_name(wire_name) {
            Some(meta) if !meta.id.is_core() => {
                if !ids.contains(&meta.id) {
                    ids.push(meta.id);
                }
            }
            Some(_) => warn!(wire_name = %wire_name, "Ignoring core field in default indicators"),
            None => warn!(wire_name = %wire_name, "Ignoring unknown default indicator field"),
        }
    }
    ids
}

/// Install the global tracing subscriber described by `config`.
///
/// Returns false when a subscriber is already installed; the existing one is
/// kept. An unparsable level falls back to `info`.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    use tracing_subscriber::{fmt, EnvFilter};

    let (filter, bad_level) = match EnvFilter::try_new(&config.level) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("info"), Some(err)),
    };
    let subscriber = fmt().with_env_filter(filter);
    let installed = match config.format {
        LogFormat::Json => subscriber.json().try_init().is_ok(),
        LogFormat::Text => subscriber.try_init().is_ok(),
    };

    if installed {
        if let Some(err) = bad_level {
            warn!(level = %config.level, error = %err, "Invalid log level, using info");
        }
        info!(format = %config.format, "Tracing initialized");
    }
    installed
}
