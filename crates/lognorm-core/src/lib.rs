// lognorm-core - Log normalization core
//
// Turns parsed log events into normalized JSON records: the event's own
// fields, the core system fields (log type, row id, event and parse time)
// and the indicator arrays collected by scanners while encoding.
//
// Pure processing only. No I/O, no async, no runtime dependencies.
// - Registries: fields, scanners, time codecs (populated at startup)
// - Hot path: EncodePlan + ResultEncoder + pooled ValueBuffers

pub mod buffer;
pub mod encode;
pub mod error;
pub mod event;
pub mod field;
pub mod normalizer;
pub mod registry;
pub mod result;
pub mod rowid;
pub mod scan;
pub mod schema;
pub mod time;

// Re-export commonly used types
pub use buffer::{BufferPool, PooledBuffer, ValueBuffer};
pub use encode::{decode_event, EncodeContext, EncodePlan, ResultEncoder};
pub use error::{
    CompositionError, DecodeError, EncodeError, EventError, RegistrationError, RowIdError,
    TimeError,
};
pub use event::{Event, EventType, FieldDescriptor, FieldKind, Value};
pub use field::{FieldId, FieldMeta, FieldRegistry, DEFAULT_INDICATORS};
pub use normalizer::Normalizer;
pub use registry::Registry;
pub use result::{CoreFields, LogResult, LogResultBuilder};
pub use rowid::RowIdGenerator;
pub use scan::{Scanner, ScannerRegistry};
pub use schema::{compose, Column, MergedSchema};
pub use time::{Location, TimeCodec, TimeCodecRegistry, Timestamp};
