//! Time codecs
//!
//! A `TimeCodec` pairs a decoder (wire value to timestamp) with an encoder
//! (timestamp to wire value). Timestamp fields in an event type name their codec
//! with a tag; untagged fields use [`DEFAULT_TIME_CODEC`].

mod layout;
mod location;
mod unix;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde_json::Value as JsonValue;

use crate::error::{RegistrationError, TimeError};

pub use layout::{format_rfc3339_nano, LayoutCodec, Rfc3339Codec};
pub use location::Location;
pub use unix::{UnixCodec, UnixUnit};

/// A point in time together with the offset it was read in
pub type Timestamp = DateTime<FixedOffset>;

/// Codec used by timestamp fields without a codec tag
pub const DEFAULT_TIME_CODEC: &str = "rfc3339";

/// Inline tag prefix for reference-time layouts, e.g. `layout=2006-01-02`
pub const LAYOUT_TAG_PREFIX: &str = "layout=";

/// Inline tag prefix for strftime formats, e.g. `strftime=%Y-%m-%d`
pub const STRFTIME_TAG_PREFIX: &str = "strftime=";

pub trait TimeDecoder: Send + Sync {
    /// Decode a wire value; `null` and empty strings decode to `None`
    fn decode(&self, value: &JsonValue) -> Result<Option<Timestamp>, TimeError>;
}

pub trait TimeEncoder: Send + Sync {
    fn encode(&self, ts: &Timestamp) -> Result<JsonValue, TimeError>;
}

/// Decoder and encoder for one timestamp representation
#[derive(Clone)]
pub struct TimeCodec {
    decoder: Arc<dyn TimeDecoder>,
    encoder: Arc<dyn TimeEncoder>,
}

impl TimeCodec {
    /// Codec from a type implementing both directions
    pub fn new<C>(codec: C) -> Self
    where
        C: TimeDecoder + TimeEncoder + 'static,
    {
        let codec = Arc::new(codec);
        Self {
            decoder: codec.clone(),
            encoder: codec,
        }
    }

    pub fn join(decoder: Arc<dyn TimeDecoder>, encoder: Arc<dyn TimeEncoder>) -> Self {
        Self { decoder, encoder }
    }

    pub fn split(&self) -> (Arc<dyn TimeDecoder>, Arc<dyn TimeEncoder>) {
        (Arc::clone(&self.decoder), Arc::clone(&self.encoder))
    }

    pub fn decode(&self, value: &JsonValue) -> Result<Option<Timestamp>, TimeError> {
        self.decoder.decode(value)
    }

    pub fn encode(&self, ts: &Timestamp) -> Result<JsonValue, TimeError> {
        self.encoder.encode(ts)
    }

    /// Force decoded timestamps and encoder inputs into `location`
    pub fn in_location(location: Location, codec: TimeCodec) -> TimeCodec {
        TimeCodec::new(InLocation {
            location,
            inner: codec,
        })
    }

    /// Decode with `codec`, then each fallback in turn.
    ///
    /// The first successful decode wins; if all fail the last error is returned.
    /// Encoding always uses `codec`.
    pub fn try_decoders<I>(codec: TimeCodec, fallbacks: I) -> TimeCodec
    where
        I: IntoIterator<Item = Arc<dyn TimeDecoder>>,
    {
        let (first, encoder) = codec.split();
        let decoders = std::iter::once(first).chain(fallbacks).collect();
        TimeCodec::join(Arc::new(FirstOf { decoders }), encoder)
    }
}

impl fmt::Debug for TimeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeCodec").finish_non_exhaustive()
    }
}

struct InLocation {
    location: Location,
    inner: TimeCodec,
}

impl TimeDecoder for InLocation {
    fn decode(&self, value: &JsonValue) -> Result<Option<Timestamp>, TimeError> {
        Ok(self
            .inner
            .decode(value)?
            .map(|ts| self.location.convert(&ts)))
    }
}

impl TimeEncoder for InLocation {
    fn encode(&self, ts: &Timestamp) -> Result<JsonValue, TimeError> {
        self.inner.encode(&self.location.convert(ts))
    }
}

struct FirstOf {
    decoders: Vec<Arc<dyn TimeDecoder>>,
}

impl TimeDecoder for FirstOf {
    fn decode(&self, value: &JsonValue) -> Result<Option<Timestamp>, TimeError> {
        let mut last = TimeError::InvalidInput(value.to_string());
        for decoder in &self.decoders {
            match decoder.decode(value) {
                Ok(ts) => return Ok(ts),
                Err(err) => last = err,
            }
        }
        Err(last)
    }
}

/// Named time codecs
#[derive(Debug, Clone, Default)]
pub struct TimeCodecRegistry {
    codecs: BTreeMap<String, TimeCodec>,
}

impl TimeCodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the unix and RFC3339 codecs
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for unit in [
            UnixUnit::Seconds,
            UnixUnit::Millis,
            UnixUnit::Micros,
            UnixUnit::Nanos,
        ] {
            registry.set(unit.name(), TimeCodec::new(UnixCodec::new(unit)));
        }
        registry.set(DEFAULT_TIME_CODEC, TimeCodec::new(Rfc3339Codec));
        registry
    }

    /// Register a codec under a new name
    pub fn register(
        &mut self,
        name: impl Into<String>,
        codec: TimeCodec,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if self.codecs.contains_key(&name) {
            return Err(RegistrationError::DuplicateTimeCodec(name));
        }
        self.codecs.insert(name, codec);
        Ok(())
    }

    /// Register or replace a codec, returning the previous one
    pub fn set(&mut self, name: impl Into<String>, codec: TimeCodec) -> Option<TimeCodec> {
        self.codecs.insert(name.into(), codec)
    }

    pub fn lookup(&self, name: &str) -> Option<&TimeCodec> {
        self.codecs.get(name)
    }

    /// Merge other registries into this one; later entries win on collision
    pub fn extend<'a, I>(&mut self, others: I)
    where
        I: IntoIterator<Item = &'a TimeCodecRegistry>,
    {
        for other in others {
            for (name, codec) in &other.codecs {
                self.codecs.insert(name.clone(), codec.clone());
            }
        }
    }

    /// Resolve a field's codec tag.
    ///
    /// The tag is either a registered name or an inline `layout=` / `strftime=`
    /// format.
    pub fn resolve(&self, tag: &str) -> Result<TimeCodec, TimeError> {
        if let Some(codec) = self.lookup(tag) {
            return Ok(codec.clone());
        }
        if let Some(layout) = tag.strip_prefix(LAYOUT_TAG_PREFIX) {
            return LayoutCodec::reference(layout).map(TimeCodec::new);
        }
        if let Some(format) = tag.strip_prefix(STRFTIME_TAG_PREFIX) {
            return LayoutCodec::strftime(format).map(TimeCodec::new);
        }
        Err(TimeError::UnknownCodec(tag.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}
