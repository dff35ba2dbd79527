//! Log results
//!
//! A `LogResult` is one record ready for encoding: the parsed event plus the
//! core fields every record carries. Parsers build them through a
//! `LogResultBuilder`, which assigns row ids and parse times.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::buffer::ValueBuffer;
use crate::event::Event;
use crate::field::{FieldId, DEFAULT_INDICATORS};
use crate::rowid::RowIdGenerator;
use crate::time::Timestamp;

/// System fields present on every record
#[derive(Debug, Clone, PartialEq)]
pub struct CoreFields {
    pub log_type: String,
    pub row_id: String,
    /// Time of the event; encoding falls back to the parse time when unset
    pub event_time: Option<Timestamp>,
    pub parse_time: Timestamp,
    pub source_id: Option<String>,
    pub source_label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LogResult {
    pub core: CoreFields,
    pub event: Event,
    /// Indicator fields to render, in output order
    pub meta: Vec<FieldId>,
    /// Pre-filled indicator values; a pooled buffer is used when unset
    pub values: Option<ValueBuffer>,
    /// Already-encoded record returned verbatim by the encoder
    pub raw_event: Option<String>,
}

impl LogResult {
    pub fn with_raw_event(mut self, raw_event: impl Into<String>) -> Self {
        self.raw_event = Some(raw_event.into());
        self
    }

    /// Event time as it will be written: the event time, else the parse time
    pub fn effective_event_time(&self) -> Timestamp {
        self.core.event_time.unwrap_or(self.core.parse_time)
    }
}

type RowIdFn = Arc<dyn Fn() -> String + Send + Sync>;
type ClockFn = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Builds `LogResult`s for one log type
#[derive(Clone)]
pub struct LogResultBuilder {
    log_type: String,
    next_row_id: RowIdFn,
    now: ClockFn,
    meta: Vec<FieldId>,
    source_id: Option<String>,
    source_label: Option<String>,
}

impl LogResultBuilder {
    /// Builder using the global row id generator, the UTC clock and the
    /// default indicator fields
    pub fn new(log_type: impl Into<String>) -> Self {
        Self {
            log_type: log_type.into(),
            next_row_id: Arc::new(|| RowIdGenerator::global().next_id()),
            now: Arc::new(|| Utc::now().fixed_offset()),
            meta: DEFAULT_INDICATORS.to_vec(),
            source_id: None,
            source_label: None,
        }
    }

    pub fn with_row_ids(mut self, generator: Arc<RowIdGenerator>) -> Self {
        self.next_row_id = Arc::new(move || generator.next_id());
        self
    }

    /// Custom row id source
    pub fn with_next_row_id<F>(mut self, next_row_id: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.next_row_id = Arc::new(next_row_id);
        self
    }

    /// Custom clock for parse times
    pub fn with_clock<F>(mut self, now: F) -> Self
    where
        F: Fn() -> Timestamp + Send + Sync + 'static,
    {
        self.now = Arc::new(now);
        self
    }

    pub fn with_indicators(mut self, ids: impl IntoIterator<Item = FieldId>) -> Self {
        self.meta = ids.into_iter().collect();
        self
    }

    pub fn with_source(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.source_id = Some(id.into());
        self.source_label = Some(label.into());
        self
    }

    pub fn log_type(&self) -> &str {
        &self.log_type
    }

    pub fn indicators(&self) -> &[FieldId] {
        &self.meta
    }

    pub fn build(&self, event: Event) -> LogResult {
        LogResult {
            core: CoreFields {
                log_type: self.log_type.clone(),
                row_id: (self.next_row_id)(),
                event_time: None,
                parse_time: (self.now)(),
                source_id: self.source_id.clone(),
                source_label: self.source_label.clone(),
            },
            event,
            meta: self.meta.clone(),
            values: None,
            raw_event: None,
        }
    }

    /// Build a result whose indicator values were collected ahead of encoding
    pub fn build_with_values(&self, event: Event, values: ValueBuffer) -> LogResult {
        LogResult {
            values: Some(values),
            ..self.build(event)
        }
    }
}

impl fmt::Debug for LogResultBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogResultBuilder")
            .field("log_type", &self.log_type)
            .field("meta", &self.meta)
            .field("source_id", &self.source_id)
            .field("source_label", &self.source_label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventType, FieldDescriptor};
    use chrono::DateTime;

    fn event() -> Event {
        Event::new(Arc::new(EventType::new(
            "Test",
            vec![FieldDescriptor::string("msg")],
        )))
    }

    #[test]
    fn test_builder_defaults() {
        let result = LogResultBuilder::new("Test.Log").build(event());
        assert_eq!(result.core.log_type, "Test.Log");
        assert!(RowIdGenerator::decode(&result.core.row_id).is_ok());
        assert_eq!(result.meta, DEFAULT_INDICATORS.to_vec());
        assert_eq!(result.core.event_time, None);
        assert!(result.values.is_none());
        assert!(result.raw_event.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let parse_time = DateTime::parse_from_rfc3339("2020-07-20T15:12:46Z").unwrap();
        let builder = LogResultBuilder::new("Test.Log")
            .with_next_row_id(|| "id".to_string())
            .with_clock(move || parse_time)
            .with_indicators([FieldId::AWS_ARN])
            .with_source("src-1", "Source One");

        let result = builder.build(event());
        assert_eq!(result.core.row_id, "id");
        assert_eq!(result.core.parse_time, parse_time);
        assert_eq!(result.meta, vec![FieldId::AWS_ARN]);
        assert_eq!(result.core.source_id.as_deref(), Some("src-1"));
        assert_eq!(result.core.source_label.as_deref(), Some("Source One"));
        assert_eq!(result.effective_event_time(), parse_time);
    }

    #[test]
    fn test_row_ids_from_generator() {
        let generator = Arc::new(RowIdGenerator::with_node([2; 6], 7));
        let builder = LogResultBuilder::new("Test.Log").with_row_ids(generator);
        let first = builder.build(event()).core.row_id;
        let second = builder.build(event()).core.row_id;
        assert_eq!(RowIdGenerator::decode(&first).unwrap().counter, 1);
        assert_eq!(RowIdGenerator::decode(&second).unwrap().counter, 2);
    }
}
