//! Merged output schema
//!
//! Combines an event type's own fields with the core fields and the indicator
//! fields it can produce. The encoder does not need this; it serves consumers
//! that describe output columns.

use std::collections::{HashMap, HashSet};

use arrow::datatypes::{DataType, Field, Fields, Schema, TimeUnit};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::error::CompositionError;
use crate::event::{EventType, FieldDescriptor, FieldKind};
use crate::field::FieldId;
use crate::registry::Registry;

/// Arrow metadata key carrying the system field id
pub const FIELD_ID_METADATA_KEY: &str = "lognorm:field_id";

/// Schema-level metadata key carrying the event type name
pub const EVENT_TYPE_METADATA_KEY: &str = "lognorm:event_type";

/// One column of the merged schema
#[derive(Debug, Clone)]
pub struct Column {
    /// Field name (`SysRowID` for system columns, the JSON key otherwise)
    pub name: String,
    /// JSON key in the output record
    pub wire_name: String,
    pub kind: FieldKind,
    /// Set for core and indicator columns
    pub field_id: Option<FieldId>,
    pub nullable: bool,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct MergedSchema {
    event_type: String,
    columns: Vec<Column>,
    indicator_ids: Vec<FieldId>,
}

/// Compose the merged schema of `event_type`.
///
/// With `indicator_ids` unset, the indicator set is derived from the scanners
/// tagged on the event type's text fields.
pub fn compose(
    registry: &Registry,
    event_type: &EventType,
    indicator_ids: Option<&[FieldId]>,
) -> Result<MergedSchema, CompositionError> {
    check_single_event_time(event_type)?;

    let mut columns = Vec::new();
    flatten_event_fields(event_type.fields(), &mut columns);

    let fields = registry.fields();
    for id in FieldId::CORE {
        let Some(meta) = fields.lookup(id) else {
            continue;
        };
        let kind = match id {
            FieldId::EVENT_TIME | FieldId::PARSE_TIME => FieldKind::Timestamp,
            _ => FieldKind::String,
        };
        columns.push(Column {
            name: meta.name.clone(),
            wire_name: meta.wire_name.clone(),
            kind,
            field_id: Some(id),
            nullable: matches!(id, FieldId::SOURCE_ID | FieldId::SOURCE_LABEL),
            description: meta.description.clone(),
        });
    }

    let mut detected = Vec::new();
    collect_indicators(registry, event_type.fields(), &mut detected)?;
    let mut ids = match indicator_ids {
        Some(ids) => ids.to_vec(),
        None => detected,
    };
    ids.sort_unstable();
    ids.dedup();
    if let Some(&id) = ids.iter().find(|id| id.is_core()) {
        return Err(CompositionError::InvalidFieldId(id));
    }
    ids.retain(|id| fields.is_registered(*id));

    for &id in &ids {
        let Some(meta) = fields.lookup(id) else {
            continue;
        };
        columns.push(Column {
            name: meta.name.clone(),
            wire_name: meta.wire_name.clone(),
            kind: FieldKind::array(FieldKind::String),
            field_id: Some(id),
            nullable: true,
            description: meta.description.clone(),
        });
    }

    check_unique_names(&columns)?;

    debug!(
        event_type = event_type.name(),
        columns = columns.len(),
        indicators = ids.len(),
        "Composed merged schema"
    );

    Ok(MergedSchema {
        event_type: event_type.name().to_string(),
        columns,
        indicator_ids: ids,
    })
}

/// Reject event types with more than one event-time field, at any depth
pub(crate) fn check_single_event_time(event_type: &EventType) -> Result<(), CompositionError> {
    let mut found = Vec::new();
    find_event_time_fields(event_type.fields(), "", &mut found);
    if found.len() > 1 {
        let mut found = found.into_iter();
        let first = found.next().unwrap_or_default();
        let second = found.next().unwrap_or_default();
        return Err(CompositionError::MultipleEventTime {
            event_type: event_type.name().to_string(),
            first,
            second,
        });
    }
    Ok(())
}

fn find_event_time_fields(fields: &[FieldDescriptor], prefix: &str, found: &mut Vec<String>) {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };
        if field.event_time {
            found.push(path.clone());
        }
        let mut kind = &field.kind;
        while let FieldKind::Array(element) = kind {
            kind = element;
        }
        match kind {
            FieldKind::Struct(nested) => find_event_time_fields(nested.fields(), &path, found),
            FieldKind::Embedded(nested) => find_event_time_fields(nested.fields(), prefix, found),
            _ => {}
        }
    }
}

fn flatten_event_fields(fields: &[FieldDescriptor], columns: &mut Vec<Column>) {
    for field in fields {
        if let FieldKind::Embedded(nested) = &field.kind {
            flatten_event_fields(nested.fields(), columns);
            continue;
        }
        columns.push(Column {
            name: field.name.clone(),
            wire_name: field.name.clone(),
            kind: field.kind.clone(),
            field_id: None,
            nullable: true,
            description: field.description.clone(),
        });
    }
}

fn collect_indicators(
    registry: &Registry,
    fields: &[FieldDescriptor],
    ids: &mut Vec<FieldId>,
) -> Result<(), CompositionError> {
    for field in fields {
        if let Some(scanner) = &field.scanner {
            let entry = registry.scanners().lookup(scanner).ok_or_else(|| {
                CompositionError::UnknownScanner {
                    field: field.name.clone(),
                    scanner: scanner.clone(),
                }
            })?;
            if field.kind.is_text_like() {
                ids.extend_from_slice(&entry.fields);
            }
        }
        collect_nested_indicators(registry, &field.kind, ids)?;
    }
    Ok(())
}

fn collect_nested_indicators(
    registry: &Registry,
    kind: &FieldKind,
    ids: &mut Vec<FieldId>,
) -> Result<(), CompositionError> {
    match kind {
        FieldKind::Struct(nested) | FieldKind::Embedded(nested) => {
            collect_indicators(registry, nested.fields(), ids)
        }
        FieldKind::Array(element) => collect_nested_indicators(registry, element, ids),
        _ => Ok(()),
    }
}

fn check_unique_names(columns: &[Column]) -> Result<(), CompositionError> {
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.name.as_str()) {
            return Err(CompositionError::DuplicateFieldName(column.name.clone()));
        }
        if column.wire_name != column.name && !seen.insert(column.wire_name.as_str()) {
            return Err(CompositionError::DuplicateFieldName(column.wire_name.clone()));
        }
    }
    for column in columns {
        check_nested_names(&column.wire_name, &column.kind)?;
    }
    Ok(())
}

/// Members of nested objects must be unique too; errors name the dotted path
fn check_nested_names(path: &str, kind: &FieldKind) -> Result<(), CompositionError> {
    match kind {
        FieldKind::Array(element) => check_nested_names(path, element),
        FieldKind::Struct(nested) | FieldKind::Embedded(nested) => {
            let mut members = Vec::new();
            flatten_event_fields(nested.fields(), &mut members);
            check_unique_names(&members).map_err(|err| match err {
                CompositionError::DuplicateFieldName(name) => {
                    CompositionError::DuplicateFieldName(format!("{}.{}", path, name))
                }
                other => other,
            })
        }
        _ => Ok(()),
    }
}

impl MergedSchema {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Event columns, then core columns, then indicator columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Sorted indicator ids with a column in this schema
    pub fn indicator_ids(&self) -> &[FieldId] {
        &self.indicator_ids
    }

    pub fn column(&self, wire_name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.wire_name == wire_name)
    }

    /// A fresh record of this shape with every column at its empty value
    pub fn empty_record(&self) -> JsonValue {
        let mut record = Map::new();
        for column in &self.columns {
            record.insert(column.wire_name.clone(), empty_value(&column.kind));
        }
        JsonValue::Object(record)
    }

    /// Arrow description of the output columns
    pub fn to_arrow_schema(&self) -> Schema {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|column| {
                let field = Field::new(
                    column.wire_name.as_str(),
                    arrow_type(&column.kind),
                    column.nullable,
                );
                match column.field_id {
                    Some(id) => field.with_metadata(HashMap::from([(
                        FIELD_ID_METADATA_KEY.to_string(),
                        id.to_string(),
                    )])),
                    None => field,
                }
            })
            .collect();

        let metadata = HashMap::from([(
            EVENT_TYPE_METADATA_KEY.to_string(),
            self.event_type.clone(),
        )]);
        Schema::new_with_metadata(fields, metadata)
    }
}

fn empty_value(kind: &FieldKind) -> JsonValue {
    match kind {
        FieldKind::String => JsonValue::String(String::new()),
        FieldKind::Int => JsonValue::from(0),
        FieldKind::Float => JsonValue::from(0.0),
        FieldKind::Bool => JsonValue::Bool(false),
        FieldKind::Timestamp | FieldKind::Json => JsonValue::Null,
        FieldKind::Array(_) => JsonValue::Array(Vec::new()),
        FieldKind::Struct(nested) | FieldKind::Embedded(nested) => {
            let mut columns = Vec::new();
            flatten_event_fields(nested.fields(), &mut columns);
            JsonValue::Object(
                columns
                    .iter()
                    .map(|column| (column.wire_name.clone(), empty_value(&column.kind)))
                    .collect(),
            )
        }
    }
}

fn arrow_type(kind: &FieldKind) -> DataType {
    match kind {
        FieldKind::String => DataType::Utf8,
        FieldKind::Int => DataType::Int64,
        FieldKind::Float => DataType::Float64,
        FieldKind::Bool => DataType::Boolean,
        FieldKind::Timestamp => DataType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into())),
        // Raw JSON is carried as its encoded text
        FieldKind::Json => DataType::Utf8,
        FieldKind::Array(element) => DataType::new_list(arrow_type(element), true),
        FieldKind::Struct(nested) | FieldKind::Embedded(nested) => {
            let mut columns = Vec::new();
            flatten_event_fields(nested.fields(), &mut columns);
            let children: Vec<Field> = columns
                .iter()
                .map(|column| Field::new(column.wire_name.as_str(), arrow_type(&column.kind), true))
                .collect();
            DataType::Struct(Fields::from(children))
        }
    }
}
