// lognorm - Log normalization
//
// Facade over the workspace crates:
// - lognorm-core: registries, scanners, time codecs, encoding (pure)
// - lognorm-config: configuration loading (files + environment)
// - init: wiring config into a ready Normalizer, tracing setup

pub mod init;

pub use lognorm_config as config;
pub use lognorm_core::*;

pub use init::{build_normalizer, init_tracing};
