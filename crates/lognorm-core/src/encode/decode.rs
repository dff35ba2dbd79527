//! Wire record to event decoding, driven by the same plan as encoding

use serde_json::{Map, Value as JsonValue};

use super::{EncodePlan, FieldPlan, Shape};
use crate::error::DecodeError;
use crate::event::{Event, Value};

/// Decode a JSON object into an event of the plan's type.
///
/// Missing and `null` members decode to `Value::Null`. Members the type does
/// not declare, including `p_` system fields, are ignored.
pub fn decode_event(plan: &EncodePlan, input: &JsonValue) -> Result<Event, DecodeError> {
    let object = input
        .as_object()
        .ok_or_else(|| DecodeError::NotAnObject(plan.event_type.name().to_string()))?;
    let values = decode_fields(&plan.fields, object)?;
    Ok(Event::from_parts(plan.event_type.clone(), values))
}

fn decode_fields(
    plans: &[FieldPlan],
    object: &Map<String, JsonValue>,
) -> Result<Vec<Value>, DecodeError> {
    let mut values = Vec::with_capacity(plans.len());
    for plan in plans {
        let value = match &plan.shape {
            // Embedded members sit next to the outer ones
            Shape::Embedded(nested) => Value::Object(decode_fields(nested, object)?),
            shape => match object.get(&plan.name) {
                Some(member) => decode_value(plan, shape, member)?,
                None => Value::Null,
            },
        };
        values.push(value);
    }
    Ok(values)
}

fn decode_value(plan: &FieldPlan, shape: &Shape, input: &JsonValue) -> Result<Value, DecodeError> {
    let invalid = || DecodeError::InvalidValue {
        field: plan.name.clone(),
        expected: shape.name(),
    };

    let value = match (shape, input) {
        (_, JsonValue::Null) => Value::Null,
        (Shape::Json, json) => Value::Json(json.clone()),
        (Shape::String, JsonValue::String(s)) => Value::String(s.clone()),
        (Shape::Int, JsonValue::Number(n)) => Value::Int(n.as_i64().ok_or_else(invalid)?),
        (Shape::Float, JsonValue::Number(n)) => Value::Float(n.as_f64().ok_or_else(invalid)?),
        (Shape::Bool, JsonValue::Bool(b)) => Value::Bool(*b),
        (Shape::Timestamp(codec), json) => {
            let ts = codec.decode(json).map_err(|source| DecodeError::Time {
                field: plan.name.clone(),
                source,
            })?;
            ts.map_or(Value::Null, Value::Timestamp)
        }
        (Shape::Struct(nested) | Shape::Embedded(nested), JsonValue::Object(object)) => {
            Value::Object(decode_fields(nested, object)?)
        }
        (Shape::Array(element), JsonValue::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| decode_value(plan, element, item))
                .collect::<Result<_, _>>()?,
        ),
        _ => return Err(invalid()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TimeError;
    use crate::event::{EventType, FieldDescriptor, FieldKind};
    use crate::registry::Registry;
    use chrono::DateTime;
    use serde_json::json;
    use std::sync::Arc;

    fn plan(event_type: EventType) -> EncodePlan {
        EncodePlan::compile(Registry::global(), &Arc::new(event_type)).unwrap()
    }

    #[test]
    fn test_decode_typed_members() {
        let plan = plan(EventType::new(
            "Flow",
            vec![
                FieldDescriptor::string("src"),
                FieldDescriptor::int("bytes"),
                FieldDescriptor::float("ratio"),
                FieldDescriptor::bool("allowed"),
                FieldDescriptor::timestamp("start").time_codec("unix_ms"),
                FieldDescriptor::array("tags", FieldKind::String),
                FieldDescriptor::json("extra"),
                FieldDescriptor::string("missing"),
            ],
        ));
        let event = decode_event(
            &plan,
            &json!({
                "src": "10.0.0.1",
                "bytes": 1024,
                "ratio": 2,
                "allowed": true,
                "start": 1595257960500i64,
                "tags": ["a", null],
                "extra": {"any": ["thing"]},
                "unknown": 1,
                "p_row_id": "ignored"
            }),
        )
        .unwrap();

        assert_eq!(event.get("src"), Some(&Value::from("10.0.0.1")));
        assert_eq!(event.get("bytes"), Some(&Value::Int(1024)));
        assert_eq!(event.get("ratio"), Some(&Value::Float(2.0)));
        assert_eq!(event.get("allowed"), Some(&Value::Bool(true)));
        assert_eq!(
            event.get("start"),
            Some(&Value::Timestamp(
                DateTime::parse_from_rfc3339("2020-07-20T15:12:40.5Z").unwrap()
            ))
        );
        assert_eq!(
            event.get("tags"),
            Some(&Value::Array(vec![Value::from("a"), Value::Null]))
        );
        assert_eq!(event.get("extra"), Some(&Value::Json(json!({"any": ["thing"]}))));
        assert_eq!(event.get("missing"), Some(&Value::Null));
    }

    #[test]
    fn test_decode_nested_and_embedded() {
        let inner = Arc::new(EventType::new("Inner", vec![FieldDescriptor::string("name")]));
        let plan = plan(EventType::new(
            "Outer",
            vec![
                FieldDescriptor::embedded(Arc::clone(&inner)),
                FieldDescriptor::structure("child", inner),
            ],
        ));
        let event = decode_event(&plan, &json!({"name": "top", "child": {"name": "nested"}})).unwrap();
        assert_eq!(
            event.values(),
            &[
                Value::Object(vec![Value::from("top")]),
                Value::Object(vec![Value::from("nested")]),
            ]
        );
    }

    #[test]
    fn test_decode_rejects_mismatched_members() {
        let plan = plan(EventType::new(
            "Typed",
            vec![FieldDescriptor::int("count"), FieldDescriptor::timestamp("at")],
        ));

        assert_eq!(
            decode_event(&plan, &json!([1, 2])).unwrap_err(),
            DecodeError::NotAnObject("Typed".to_string())
        );
        assert_eq!(
            decode_event(&plan, &json!({"count": "many"})).unwrap_err(),
            DecodeError::InvalidValue {
                field: "count".to_string(),
                expected: "integer"
            }
        );
        assert_eq!(
            decode_event(&plan, &json!({"count": 1.5})).unwrap_err(),
            DecodeError::InvalidValue {
                field: "count".to_string(),
                expected: "integer"
            }
        );
        assert!(matches!(
            decode_event(&plan, &json!({"at": "yesterday"})),
            Err(DecodeError::Time { ref field, source: TimeError::Parse { .. } }) if field == "at"
        ));
    }
}
