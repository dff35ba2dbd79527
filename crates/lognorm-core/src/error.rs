//! Error types for the normalization core

use thiserror::Error;

use crate::field::FieldId;

/// Errors raised while populating the field, scanner or time-codec registries.
///
/// These happen during startup and should abort initialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The field id is already taken
    #[error("field id {0} is already registered")]
    DuplicateId(FieldId),

    /// The field name or wire name is already taken
    #[error("field name {0:?} is already registered")]
    DuplicateName(String),

    /// Indicator fields must have a positive id
    #[error("invalid indicator field id {0}: ids <= 0 are reserved for core fields")]
    InvalidId(FieldId),

    /// Field name or wire name lacks the required prefix
    #[error("field name {name:?} must start with {prefix:?}")]
    InvalidNamePrefix { name: String, prefix: &'static str },

    #[error("scanner name must not be empty")]
    EmptyScannerName,

    /// A scanner must declare at least one field
    #[error("scanner {0:?} declares no fields")]
    NoFields(String),

    #[error("scanner {0:?} is already registered")]
    DuplicateScanner(String),

    /// A scanner declared a field that is not in the field registry
    #[error("scanner {scanner:?} declares unregistered field {id}")]
    UnregisteredField { scanner: String, id: FieldId },

    /// Scanners may only emit indicator fields
    #[error("scanner {scanner:?} declares core field {id}")]
    CoreFieldScanner { scanner: String, id: FieldId },

    #[error("time codec {0:?} is already registered")]
    DuplicateTimeCodec(String),
}

/// Errors raised when composing a merged schema or compiling an encode plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    /// Two columns share a name or wire name
    #[error("duplicate field name {0:?}")]
    DuplicateFieldName(String),

    /// A core field id was passed as an indicator
    #[error("invalid indicator field id {0}")]
    InvalidFieldId(FieldId),

    #[error("field {field:?} references unknown scanner {scanner:?}")]
    UnknownScanner { field: String, scanner: String },

    #[error("field {field:?} references unknown time codec {codec:?}")]
    UnknownTimeCodec { field: String, codec: String },

    /// Scanner tags are only valid on string-like fields, time codecs on timestamps
    #[error("field {field:?}: {reason}")]
    InvalidTag { field: String, reason: &'static str },

    /// At most one field may be designated as the event time
    #[error("event type {event_type:?} designates more than one event time field ({first:?}, {second:?})")]
    MultipleEventTime {
        event_type: String,
        first: String,
        second: String,
    },
}

/// Errors from decoding or encoding timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The wire value has the wrong JSON type or shape
    #[error("invalid timestamp value {0}")]
    InvalidInput(String),

    #[error("failed to parse timestamp {input:?}: {source}")]
    Parse {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The timestamp cannot be represented by this codec
    #[error("timestamp out of range for codec {0}")]
    OutOfRange(&'static str),

    #[error("invalid time layout {0:?}")]
    InvalidLayout(String),

    #[error("invalid time zone location {0:?}")]
    InvalidLocation(String),

    #[error("unknown time codec {0:?}")]
    UnknownCodec(String),
}

/// Errors from decoding a wire record into an event value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("expected a JSON object for {0}")]
    NotAnObject(String),

    #[error("field {field:?}: expected {expected}")]
    InvalidValue {
        field: String,
        expected: &'static str,
    },

    #[error("field {field:?}: {source}")]
    Time {
        field: String,
        #[source]
        source: TimeError,
    },

    #[error(transparent)]
    Composition(#[from] CompositionError),
}

/// Errors from encoding a result into its output record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("field {field:?}: {source}")]
    Time {
        field: String,
        #[source]
        source: TimeError,
    },

    /// The event value does not match its event type
    #[error("field {field:?}: value does not match declared type {expected}")]
    Shape {
        field: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Composition(#[from] CompositionError),
}

/// Errors from setting values on an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("event type {event_type:?} has no field {field:?}")]
    UnknownField { event_type: String, field: String },
}

/// Errors from decoding a row id.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowIdError {
    #[error("row id is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("row id is truncated")]
    Truncated,

    #[error("row id has trailing bytes")]
    TrailingBytes,
}
