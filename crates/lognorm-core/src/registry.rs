//! Registry bundle
//!
//! Groups the field, scanner and time-codec registries that composition and
//! encoding consult. Build one at startup, then share it read-only.

use std::sync::{Arc, OnceLock};

use crate::error::RegistrationError;
use crate::field::{FieldId, FieldMeta, FieldRegistry};
use crate::scan::{Scanner, ScannerRegistry};
use crate::time::{TimeCodec, TimeCodecRegistry};

#[derive(Debug, Clone)]
pub struct Registry {
    fields: FieldRegistry,
    scanners: ScannerRegistry,
    time_codecs: TimeCodecRegistry,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Core fields only, no scanners or time codecs
    pub fn new() -> Self {
        Self {
            fields: FieldRegistry::new(),
            scanners: ScannerRegistry::new(),
            time_codecs: TimeCodecRegistry::new(),
        }
    }

    /// All built-in fields, scanners and time codecs
    pub fn builtin() -> Result<Self, RegistrationError> {
        let fields = FieldRegistry::builtin()?;
        let scanners = ScannerRegistry::builtin(&fields)?;
        Ok(Self {
            fields,
            scanners,
            time_codecs: TimeCodecRegistry::builtin(),
        })
    }

    /// Process-wide registry seeded with the built-ins
    pub fn global() -> &'static Registry {
        static REGISTRY: OnceLock<Registry> = OnceLock::new();
        REGISTRY.get_or_init(|| Registry::builtin().expect("built-in registrations are consistent"))
    }

    /// Shared handle to a clone of the global registry
    pub fn global_arc() -> Arc<Registry> {
        static REGISTRY: OnceLock<Arc<Registry>> = OnceLock::new();
        Arc::clone(REGISTRY.get_or_init(|| Arc::new(Registry::global().clone())))
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn scanners(&self) -> &ScannerRegistry {
        &self.scanners
    }

    pub fn time_codecs(&self) -> &TimeCodecRegistry {
        &self.time_codecs
    }

    pub fn register_indicator(&mut self, meta: FieldMeta) -> Result<(), RegistrationError> {
        self.fields.register_indicator(meta)
    }

    pub fn register_scanner(
        &mut self,
        name: impl Into<String>,
        scanner: Arc<dyn Scanner>,
        ids: &[FieldId],
    ) -> Result<(), RegistrationError> {
        self.scanners.register(&self.fields, name, scanner, ids)
    }

    pub fn register_time_codec(
        &mut self,
        name: impl Into<String>,
        codec: TimeCodec,
    ) -> Result<(), RegistrationError> {
        self.time_codecs.register(name, codec)
    }

    /// Register or replace a time codec
    pub fn set_time_codec(&mut self, name: impl Into<String>, codec: TimeCodec) -> Option<TimeCodec> {
        self.time_codecs.set(name, codec)
    }

    /// Merge codecs from other registries; later entries win
    pub fn extend_time_codecs<'a, I>(&mut self, others: I)
    where
        I: IntoIterator<Item = &'a TimeCodecRegistry>,
    {
        self.time_codecs.extend(others)
    }
}
