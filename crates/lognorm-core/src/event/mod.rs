//! Event types and event values
//!
//! An `EventType` is a table of field descriptors built once per log format.
//! Descriptors carry the per-field metadata the encoder needs: the wire name,
//! an optional scanner, an optional time codec and the event-time flag.
//! An `Event` holds one value per descriptor.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::EventError;
use crate::time::Timestamp;

/// Type of an event field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Int,
    Float,
    Bool,
    Timestamp,
    /// Nested object written under the field's name
    Struct(Arc<EventType>),
    /// Nested type whose fields are written inline into the parent object
    Embedded(Arc<EventType>),
    Array(Box<FieldKind>),
    /// Arbitrary JSON passed through unchanged
    Json,
}

impl FieldKind {
    pub fn array(element: FieldKind) -> Self {
        FieldKind::Array(Box::new(element))
    }

    /// Short name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Int => "integer",
            FieldKind::Float => "float",
            FieldKind::Bool => "boolean",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Struct(_) | FieldKind::Embedded(_) => "object",
            FieldKind::Array(_) => "array",
            FieldKind::Json => "json",
        }
    }

    /// Values of this kind have a text form a scanner can read
    pub fn is_text_like(&self) -> bool {
        match self {
            FieldKind::String | FieldKind::Int | FieldKind::Float | FieldKind::Bool => true,
            FieldKind::Array(element) => element.is_text_like(),
            _ => false,
        }
    }

    pub fn is_timestamp(&self) -> bool {
        match self {
            FieldKind::Timestamp => true,
            FieldKind::Array(element) => element.is_timestamp(),
            _ => false,
        }
    }
}

/// One field of an event type
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// JSON key of the field
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
    /// Scanner fed with the field's text
    pub scanner: Option<String>,
    /// Codec tag for timestamp fields; a registered name or an inline format
    pub time_codec: Option<String>,
    /// The field holds the event's canonical time
    pub event_time: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            scanner: None,
            time_codec: None,
            event_time: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Json)
    }

    pub fn structure(name: impl Into<String>, event_type: Arc<EventType>) -> Self {
        Self::new(name, FieldKind::Struct(event_type))
    }

    /// Embedded type, named after the type itself
    pub fn embedded(event_type: Arc<EventType>) -> Self {
        let name = event_type.name().to_string();
        Self::new(name, FieldKind::Embedded(event_type))
    }

    pub fn array(name: impl Into<String>, element: FieldKind) -> Self {
        Self::new(name, FieldKind::array(element))
    }

    pub fn scan(mut self, scanner: impl Into<String>) -> Self {
        self.scanner = Some(scanner.into());
        self
    }

    pub fn time_codec(mut self, tag: impl Into<String>) -> Self {
        self.time_codec = Some(tag.into());
        self
    }

    pub fn event_time(mut self) -> Self {
        self.event_time = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Ordered table of field descriptors for one log format
#[derive(Debug, Clone)]
pub struct EventType {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl EventType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| {
                    a.name == b.name
                        && a.kind == b.kind
                        && a.scanner == b.scanner
                        && a.time_codec == b.time_codec
                        && a.event_time == b.event_time
                })
    }
}

/// Dynamic value of an event field
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(Timestamp),
    Array(Vec<Value>),
    /// Values of a nested type, positionally aligned with its fields
    Object(Vec<Value>),
    Json(JsonValue),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Json(_) => "json",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Value::Timestamp(value)
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        Value::Json(value)
    }
}

impl From<Event> for Value {
    fn from(event: Event) -> Self {
        Value::Object(event.values)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// One event: a value for every field of its type
#[derive(Clone, PartialEq)]
pub struct Event {
    event_type: Arc<EventType>,
    values: Vec<Value>,
}

impl Event {
    /// Event with every field set to `Null`
    pub fn new(event_type: Arc<EventType>) -> Self {
        let values = vec![Value::Null; event_type.fields().len()];
        Self { event_type, values }
    }

    pub fn event_type(&self) -> &Arc<EventType> {
        &self.event_type
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), EventError> {
        let index = self
            .event_type
            .field_index(field)
            .ok_or_else(|| EventError::UnknownField {
                event_type: self.event_type.name().to_string(),
                field: field.to_string(),
            })?;
        self.values[index] = value.into();
        Ok(())
    }

    /// Builder form of [`Event::set`]
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self, EventError> {
        self.set(field, value)?;
        Ok(self)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.event_type
            .field_index(field)
            .and_then(|index| self.values.get(index))
    }

    /// Values in field order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn from_parts(event_type: Arc<EventType>, values: Vec<Value>) -> Self {
        Self { event_type, values }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (field, value) in self.event_type.fields().iter().zip(&self.values) {
            map.entry(&field.name, value);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_type() -> Arc<EventType> {
        Arc::new(EventType::new(
            "Flow",
            vec![
                FieldDescriptor::string("srcAddr").scan("ip"),
                FieldDescriptor::int("bytes"),
                FieldDescriptor::timestamp("start")
                    .time_codec("unix")
                    .event_time(),
                FieldDescriptor::array("tags", FieldKind::String),
            ],
        ))
    }

    #[test]
    fn test_descriptor_builders() {
        let event_type = flow_type();
        let src = event_type.field("srcAddr").unwrap();
        assert_eq!(src.scanner.as_deref(), Some("ip"));
        assert!(!src.event_time);

        let start = event_type.field("start").unwrap();
        assert_eq!(start.time_codec.as_deref(), Some("unix"));
        assert!(start.event_time);
        assert_eq!(event_type.field_index("tags"), Some(3));
        assert!(event_type.field("missing").is_none());
    }

    #[test]
    fn test_event_set_and_get() {
        let mut event = Event::new(flow_type());
        assert_eq!(event.get("bytes"), Some(&Value::Null));

        event.set("srcAddr", "10.0.0.1").unwrap();
        event.set("bytes", 512i64).unwrap();
        event.set("tags", vec!["a", "b"]).unwrap();

        assert_eq!(event.get("srcAddr"), Some(&Value::String("10.0.0.1".into())));
        assert_eq!(event.get("bytes"), Some(&Value::Int(512)));
        assert_eq!(
            event.get("tags"),
            Some(&Value::Array(vec!["a".into(), "b".into()]))
        );

        let err = event.set("nope", 1i64).unwrap_err();
        assert_eq!(
            err,
            EventError::UnknownField {
                event_type: "Flow".to_string(),
                field: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_nested_event_into_value() {
        let inner = Arc::new(EventType::new(
            "Endpoint",
            vec![FieldDescriptor::string("host")],
        ));
        let nested = Event::new(inner).with("host", "example.com").unwrap();
        assert_eq!(
            Value::from(nested),
            Value::Object(vec![Value::String("example.com".into())])
        );
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_type_equality_compares_nested_types() {
        let endpoint = |fields: Vec<FieldDescriptor>| {
            Arc::new(EventType::new("Endpoint", fields))
        };
        let conn = |inner: Arc<EventType>| {
            EventType::new("Conn", vec![FieldDescriptor::structure("dst", inner)])
        };

        let host = endpoint(vec![FieldDescriptor::string("host")]);
        let host_port = endpoint(vec![
            FieldDescriptor::string("host"),
            FieldDescriptor::int("port"),
        ]);
        assert_eq!(conn(Arc::clone(&host)), conn(endpoint(vec![FieldDescriptor::string("host")])));
        assert_ne!(conn(host), conn(host_port));
        assert_ne!(
            FieldKind::array(FieldKind::Int),
            FieldKind::array(FieldKind::String)
        );
    }

    #[test]
    fn test_kind_properties() {
        assert!(FieldKind::array(FieldKind::Int).is_text_like());
        assert!(!FieldKind::Json.is_text_like());
        assert!(FieldKind::array(FieldKind::Timestamp).is_timestamp());
        assert!(!FieldKind::String.is_timestamp());
    }
}
