//! Normalizer
//!
//! Ties a registry, a buffer pool and a row id generator together and caches
//! one compiled `EncodePlan` per event type. This is the entry point parsers
//! use: build results through `result_builder`, then `encode` them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::buffer::BufferPool;
use crate::encode::{decode_event, EncodePlan, ResultEncoder};
use crate::error::{CompositionError, DecodeError, EncodeError};
use crate::event::{Event, EventType};
use crate::field::{FieldId, DEFAULT_INDICATORS};
use crate::registry::Registry;
use crate::result::{LogResult, LogResultBuilder};
use crate::rowid::RowIdGenerator;
use crate::schema::{compose, MergedSchema};

pub struct Normalizer {
    registry: Arc<Registry>,
    pool: Arc<BufferPool>,
    row_ids: Arc<RowIdGenerator>,
    default_indicators: Vec<FieldId>,
    plans: RwLock<HashMap<String, Arc<EncodePlan>>>,
}

impl Normalizer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            pool: Arc::new(BufferPool::default()),
            row_ids: Arc::new(RowIdGenerator::new()),
            default_indicators: DEFAULT_INDICATORS.to_vec(),
            plans: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_row_ids(mut self, row_ids: Arc<RowIdGenerator>) -> Self {
        self.row_ids = row_ids;
        self
    }

    /// Indicator fields every result renders on top of the detected ones
    pub fn with_default_indicators(mut self, ids: impl IntoIterator<Item = FieldId>) -> Self {
        self.default_indicators = ids.into_iter().collect();
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn row_ids(&self) -> &Arc<RowIdGenerator> {
        &self.row_ids
    }

    pub fn default_indicators(&self) -> &[FieldId] {
        &self.default_indicators
    }

    /// Compiled plan for `event_type`, compiled on first use.
    ///
    /// Plans are cached by type name; a different type under a cached name
    /// replaces the cached plan.
    pub fn plan(&self, event_type: &Arc<EventType>) -> Result<Arc<EncodePlan>, CompositionError> {
        if let Some(plan) = self.plans.read().get(event_type.name()) {
            if plan.event_type() == event_type {
                return Ok(Arc::clone(plan));
            }
        }

        let plan = Arc::new(EncodePlan::compile(&self.registry, event_type)?);
        let mut plans = self.plans.write();
        if plans
            .insert(event_type.name().to_string(), Arc::clone(&plan))
            .is_some()
        {
            debug!(event_type = event_type.name(), "Replaced cached encode plan");
        }
        Ok(plan)
    }

    /// Builder for results of `event_type`.
    ///
    /// Its indicator set is the fields the type's scanners can emit, followed
    /// by the default indicators not already among them.
    pub fn result_builder(
        &self,
        log_type: impl Into<String>,
        event_type: &Arc<EventType>,
    ) -> Result<LogResultBuilder, CompositionError> {
        self.plan(event_type)?;
        let schema = compose(&self.registry, event_type, None)?;

        let mut meta = schema.indicator_ids().to_vec();
        for &id in &self.default_indicators {
            if !meta.contains(&id) {
                meta.push(id);
            }
        }
        Ok(LogResultBuilder::new(log_type)
            .with_row_ids(Arc::clone(&self.row_ids))
            .with_indicators(meta))
    }

    /// Encode one result to its JSON record
    pub fn encode(&self, result: &mut LogResult) -> Result<String, EncodeError> {
        if let Some(raw) = &result.raw_event {
            return Ok(raw.clone());
        }
        let plan = self.plan(result.event.event_type())?;
        ResultEncoder::new(&self.registry, &plan, &self.pool).encode(result)
    }

    /// Decode a JSON record into an event of `event_type`
    pub fn decode(
        &self,
        event_type: &Arc<EventType>,
        input: &JsonValue,
    ) -> Result<Event, DecodeError> {
        let plan = self.plan(event_type)?;
        decode_event(&plan, input)
    }

    /// Merged schema of `event_type`; see [`compose`]
    pub fn compose(
        &self,
        event_type: &EventType,
        indicator_ids: Option<&[FieldId]>,
    ) -> Result<MergedSchema, CompositionError> {
        compose(&self.registry, event_type, indicator_ids)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Registry::global_arc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FieldDescriptor;
    use serde_json::json;

    fn event_type() -> Arc<EventType> {
        Arc::new(EventType::new(
            "Access",
            vec![
                FieldDescriptor::string("remote").scan("ip"),
                FieldDescriptor::string("user_arn").scan("aws_arn"),
            ],
        ))
    }

    #[test]
    fn test_plans_are_cached_per_type() {
        let normalizer = Normalizer::default();
        let event_type = event_type();
        let first = normalizer.plan(&event_type).unwrap();
        let second = normalizer.plan(&event_type).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // Same name, different fields
        let changed = Arc::new(EventType::new("Access", vec![FieldDescriptor::int("n")]));
        let third = normalizer.plan(&changed).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn test_result_builder_merges_indicators() {
        let normalizer = Normalizer::default()
            .with_default_indicators([FieldId::TRACE_ID, FieldId::IP_ADDRESS]);
        let builder = normalizer.result_builder("Web.Access", &event_type()).unwrap();
        assert_eq!(
            builder.indicators(),
            &[
                FieldId::IP_ADDRESS,
                FieldId::AWS_ACCOUNT_ID,
                FieldId::AWS_INSTANCE_ID,
                FieldId::AWS_ARN,
                FieldId::TRACE_ID,
            ]
        );
    }

    #[test]
    fn test_result_builder_rejects_unknown_scanner() {
        let normalizer = Normalizer::default();
        let bad = Arc::new(EventType::new(
            "Bad",
            vec![FieldDescriptor::string("x").scan("missing")],
        ));
        assert_eq!(
            normalizer.result_builder("Bad", &bad).unwrap_err(),
            CompositionError::UnknownScanner {
                field: "x".to_string(),
                scanner: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_encode_and_decode() {
        let normalizer = Normalizer::default();
        let event_type = event_type();
        let event = normalizer
            .decode(
                &event_type,
                &json!({"remote": "192.0.2.1", "user_arn": "arn:aws:iam::123456789012:user/bob"}),
            )
            .unwrap();
        let mut result = normalizer
            .result_builder("Web.Access", &event_type)
            .unwrap()
            .build(event);
        let out = normalizer.encode(&mut result).unwrap();
        let record: JsonValue = serde_json::from_str(&out).unwrap();

        assert_eq!(record["remote"], json!("192.0.2.1"));
        assert_eq!(record["p_log_type"], json!("Web.Access"));
        assert_eq!(record["p_any_ip_addresses"], json!(["192.0.2.1"]));
        assert_eq!(record["p_any_aws_account_ids"], json!(["123456789012"]));
        assert_eq!(
            record["p_any_aws_arns"],
            json!(["arn:aws:iam::123456789012:user/bob"])
        );
        assert!(RowIdGenerator::decode(record["p_row_id"].as_str().unwrap()).is_ok());
        assert_eq!(normalizer.pool().idle(), 1);
    }
}
