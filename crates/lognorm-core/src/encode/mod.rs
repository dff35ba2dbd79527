//! Result encoding
//!
//! An `EncodePlan` is compiled once per event type: it resolves every field's
//! scanner and time codec up front. `ResultEncoder` then walks the plan for each
//! record, writing the event fields, the core fields and the indicator fields
//! into a single JSON object.
//!
//! Encoding runs as a small state machine:
//!
//! ```text
//! WriteEvent -> WriteCoreFields -> WriteIndicatorFields -> Done
//! ```
//!
//! While the event is written, scanner-tagged fields feed the active
//! `ValueBuffer` and the event-time field is captured in the `EncodeContext`.

mod decode;
mod json_writer;

use std::fmt::{self, Write};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::buffer::{BufferPool, PooledBuffer, ValueBuffer};
use crate::error::{CompositionError, EncodeError};
use crate::event::{EventType, FieldDescriptor, FieldKind, Value};
use crate::field::{FieldId, FieldRegistry};
use crate::registry::Registry;
use crate::result::{CoreFields, LogResult};
use crate::scan::Scanner;
use crate::schema::check_single_event_time;
use crate::time::{format_rfc3339_nano, Location, TimeCodec, Timestamp, DEFAULT_TIME_CODEC};
use json_writer::{
    write_bool, write_float, write_int, write_json_string, write_json_value, write_string_array,
    ObjectWriter,
};

pub use decode::decode_event;

/// Field table for one event type with scanners and codecs resolved
pub struct EncodePlan {
    event_type: Arc<EventType>,
    fields: Vec<FieldPlan>,
}

struct FieldPlan {
    name: String,
    shape: Shape,
    scanner: Option<Arc<dyn Scanner>>,
    event_time: bool,
}

enum Shape {
    String,
    Int,
    Float,
    Bool,
    Json,
    Timestamp(TimeCodec),
    Struct(Vec<FieldPlan>),
    Embedded(Vec<FieldPlan>),
    Array(Box<Shape>),
}

impl Shape {
    fn name(&self) -> &'static str {
        match self {
            Shape::String => "string",
            Shape::Int => "integer",
            Shape::Float => "float",
            Shape::Bool => "boolean",
            Shape::Json => "json",
            Shape::Timestamp(_) => "timestamp",
            Shape::Struct(_) | Shape::Embedded(_) => "object",
            Shape::Array(_) => "array",
        }
    }
}

impl EncodePlan {
    /// Resolve the scanners and time codecs of `event_type`.
    ///
    /// Fails on unknown tags, tags on fields of the wrong kind, or more than
    /// one event-time field.
    pub fn compile(
        registry: &Registry,
        event_type: &Arc<EventType>,
    ) -> Result<Self, CompositionError> {
        check_single_event_time(event_type)?;
        let fields = compile_fields(registry, event_type.fields())?;
        debug!(
            event_type = event_type.name(),
            fields = fields.len(),
            "Compiled encode plan"
        );
        Ok(Self {
            event_type: Arc::clone(event_type),
            fields,
        })
    }

    pub fn event_type(&self) -> &Arc<EventType> {
        &self.event_type
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Debug for EncodePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodePlan")
            .field("event_type", &self.event_type.name())
            .field("fields", &self.fields.len())
            .finish()
    }
}

fn compile_fields(
    registry: &Registry,
    fields: &[FieldDescriptor],
) -> Result<Vec<FieldPlan>, CompositionError> {
    fields
        .iter()
        .map(|field| compile_field(registry, field))
        .collect()
}

fn compile_field(
    registry: &Registry,
    field: &FieldDescriptor,
) -> Result<FieldPlan, CompositionError> {
    let invalid = |reason| CompositionError::InvalidTag {
        field: field.name.clone(),
        reason,
    };

    let scanner = match &field.scanner {
        Some(name) => {
            if !field.kind.is_text_like() {
                return Err(invalid("scanners apply to text fields"));
            }
            let entry = registry.scanners().lookup(name).ok_or_else(|| {
                CompositionError::UnknownScanner {
                    field: field.name.clone(),
                    scanner: name.clone(),
                }
            })?;
            Some(Arc::clone(&entry.scanner))
        }
        None => None,
    };
    if field.time_codec.is_some() && !field.kind.is_timestamp() {
        return Err(invalid("time codecs apply to timestamp fields"));
    }
    if field.event_time && !matches!(field.kind, FieldKind::Timestamp) {
        return Err(invalid("the event time must be a timestamp field"));
    }

    Ok(FieldPlan {
        name: field.name.clone(),
        shape: compile_shape(registry, field, &field.kind)?,
        scanner,
        event_time: field.event_time,
    })
}

fn compile_shape(
    registry: &Registry,
    field: &FieldDescriptor,
    kind: &FieldKind,
) -> Result<Shape, CompositionError> {
    let shape = match kind {
        FieldKind::String => Shape::String,
        FieldKind::Int => Shape::Int,
        FieldKind::Float => Shape::Float,
        FieldKind::Bool => Shape::Bool,
        FieldKind::Json => Shape::Json,
        FieldKind::Timestamp => {
            let tag = field.time_codec.as_deref().unwrap_or(DEFAULT_TIME_CODEC);
            let codec = registry.time_codecs().resolve(tag).map_err(|_| {
                CompositionError::UnknownTimeCodec {
                    field: field.name.clone(),
                    codec: tag.to_string(),
                }
            })?;
            Shape::Timestamp(codec)
        }
        FieldKind::Struct(nested) => Shape::Struct(compile_fields(registry, nested.fields())?),
        FieldKind::Embedded(nested) => {
            Shape::Embedded(compile_fields(registry, nested.fields())?)
        }
        FieldKind::Array(element) => {
            Shape::Array(Box::new(compile_shape(registry, field, element)?))
        }
    };
    Ok(shape)
}

/// Per-encode side channel: the active indicator buffer and the captured event time
pub struct EncodeContext<'a> {
    pub values: &'a mut ValueBuffer,
    pub event_time: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncodeState {
    WriteEvent,
    WriteCoreFields,
    WriteIndicatorFields,
    Done,
}

/// Encodes results of one event type to JSON
pub struct ResultEncoder<'a> {
    registry: &'a Registry,
    plan: &'a EncodePlan,
    pool: &'a BufferPool,
}

impl<'a> ResultEncoder<'a> {
    pub fn new(registry: &'a Registry, plan: &'a EncodePlan, pool: &'a BufferPool) -> Self {
        Self {
            registry,
            plan,
            pool,
        }
    }

    /// Encode `result` as one compact JSON object.
    ///
    /// The captured event time is written back to `result.core.event_time`.
    /// Results carrying a raw event are returned unchanged.
    pub fn encode(&self, result: &mut LogResult) -> Result<String, EncodeError> {
        if let Some(raw) = &result.raw_event {
            return Ok(raw.clone());
        }

        let LogResult {
            core,
            event,
            meta,
            values,
            ..
        } = result;

        if !Arc::ptr_eq(event.event_type(), &self.plan.event_type)
            && **event.event_type() != *self.plan.event_type
        {
            return Err(EncodeError::Shape {
                field: event.event_type().name().to_string(),
                expected: "event of the planned type",
            });
        }

        let mut pooled: Option<PooledBuffer<'_>> = None;
        let buffer: &mut ValueBuffer = match values {
            Some(values) => values,
            None => &mut **pooled.insert(self.pool.acquire()),
        };
        let mut ctx = EncodeContext {
            values: buffer,
            event_time: None,
        };

        let mut out = String::with_capacity(512);
        let mut record = ObjectWriter::begin(&mut out);
        let mut state = EncodeState::WriteEvent;
        while state != EncodeState::Done {
            trace!(?state, "encode");
            state = match state {
                EncodeState::WriteEvent => {
                    write_fields(&mut record, &self.plan.fields, event.values(), &mut ctx)?;
                    EncodeState::WriteCoreFields
                }
                EncodeState::WriteCoreFields => {
                    if let Some(ts) = ctx.event_time {
                        core.event_time = Some(ts);
                    }
                    write_core_fields(&mut record, core);
                    EncodeState::WriteIndicatorFields
                }
                EncodeState::WriteIndicatorFields => {
                    write_indicator_fields(&mut record, self.registry.fields(), meta, ctx.values);
                    EncodeState::Done
                }
                EncodeState::Done => EncodeState::Done,
            };
        }
        record.end();
        Ok(out)
    }
}

fn write_fields(
    record: &mut ObjectWriter<'_>,
    plans: &[FieldPlan],
    values: &[Value],
    ctx: &mut EncodeContext<'_>,
) -> Result<(), EncodeError> {
    for (plan, value) in plans.iter().zip(values) {
        if value.is_null() {
            continue;
        }
        if let Shape::Embedded(nested) = &plan.shape {
            let inner = match value {
                Value::Object(inner) if inner.len() == nested.len() => inner,
                _ => return Err(shape_error(plan, &plan.shape)),
            };
            write_fields(record, nested, inner, ctx)?;
            continue;
        }
        write_value(record.key(&plan.name), plan, &plan.shape, value, ctx)?;
        if let Some(scanner) = &plan.scanner {
            scan_value(scanner.as_ref(), value, ctx.values);
        }
    }
    Ok(())
}

fn write_value(
    buf: &mut String,
    plan: &FieldPlan,
    shape: &Shape,
    value: &Value,
    ctx: &mut EncodeContext<'_>,
) -> Result<(), EncodeError> {
    match (shape, value) {
        (_, Value::Null) => buf.push_str("null"),
        (Shape::String, Value::String(s)) => write_json_string(buf, s),
        (Shape::Int, Value::Int(i)) => write_int(buf, *i),
        (Shape::Float, Value::Float(f)) => write_float(buf, *f),
        (Shape::Float, Value::Int(i)) => write_int(buf, *i),
        (Shape::Bool, Value::Bool(b)) => write_bool(buf, *b),
        (Shape::Json, Value::Json(json)) => write_json_value(buf, json),
        (Shape::Timestamp(codec), Value::Timestamp(ts)) => {
            let encoded = codec.encode(ts).map_err(|source| EncodeError::Time {
                field: plan.name.clone(),
                source,
            })?;
            write_json_value(buf, &encoded);
            if plan.event_time {
                ctx.event_time = Some(*ts);
            }
        }
        (Shape::Struct(nested) | Shape::Embedded(nested), Value::Object(inner))
            if inner.len() == nested.len() =>
        {
            let mut object = ObjectWriter::begin(buf);
            write_fields(&mut object, nested, inner, ctx)?;
            object.end();
        }
        (Shape::Array(element), Value::Array(items)) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_value(buf, plan, element, item, ctx)?;
            }
            buf.push(']');
        }
        (shape, _) => return Err(shape_error(plan, shape)),
    }
    Ok(())
}

fn shape_error(plan: &FieldPlan, shape: &Shape) -> EncodeError {
    EncodeError::Shape {
        field: plan.name.clone(),
        expected: shape.name(),
    }
}

/// Feed the text form of `value` to `scanner`
fn scan_value(scanner: &dyn Scanner, value: &Value, values: &mut ValueBuffer) {
    match value {
        Value::String(s) => scanner.scan(s, values),
        Value::Int(i) => scanner.scan(&i.to_string(), values),
        Value::Float(f) => scanner.scan(&f.to_string(), values),
        Value::Bool(b) => scanner.scan(if *b { "true" } else { "false" }, values),
        Value::Array(items) => {
            for item in items {
                scan_value(scanner, item, values);
            }
        }
        _ => {}
    }
}

fn write_core_fields(record: &mut ObjectWriter<'_>, core: &CoreFields) {
    use crate::field::names::wire;

    write_json_string(record.key(wire::LOG_TYPE), &core.log_type);
    write_json_string(record.key(wire::ROW_ID), &core.row_id);
    let event_time = core.event_time.unwrap_or(core.parse_time);
    write_utc_timestamp(record.key(wire::EVENT_TIME), &event_time);
    write_utc_timestamp(record.key(wire::PARSE_TIME), &core.parse_time);
    if let Some(source_id) = &core.source_id {
        write_json_string(record.key(wire::SOURCE_ID), source_id);
    }
    if let Some(source_label) = &core.source_label {
        write_json_string(record.key(wire::SOURCE_LABEL), source_label);
    }
}

fn write_utc_timestamp(buf: &mut String, ts: &Timestamp) {
    let utc = Location::Utc.convert(ts);
    let _ = write!(buf, "\"{}\"", format_rfc3339_nano(&utc));
}

fn write_indicator_fields(
    record: &mut ObjectWriter<'_>,
    fields: &FieldRegistry,
    meta: &[FieldId],
    values: &mut ValueBuffer,
) {
    for (i, &id) in meta.iter().enumerate() {
        if id.is_core() || meta[..i].contains(&id) {
            continue;
        }
        let Some(wire_name) = fields.wire_name(id) else {
            continue;
        };
        if let Some(items) = values.get(id) {
            write_string_array(record.key(wire_name), items);
        }
    }
}
