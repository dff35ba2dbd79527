//! Field registry
//!
//! Maps small integer field ids to their names and wire names. Non-positive ids
//! are the core fields present on every record; positive ids are indicator
//! fields populated by scanners.

pub mod names;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::RegistrationError;
use names::{field, wire, FIELD_NAME_PREFIX, WIRE_NAME_PREFIX};

/// Identifier of a system field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub i32);

impl FieldId {
    // Core fields
    pub const LOG_TYPE: FieldId = FieldId(0);
    pub const ROW_ID: FieldId = FieldId(-1);
    pub const EVENT_TIME: FieldId = FieldId(-2);
    pub const PARSE_TIME: FieldId = FieldId(-3);
    pub const SOURCE_ID: FieldId = FieldId(-4);
    pub const SOURCE_LABEL: FieldId = FieldId(-5);

    // Built-in indicator fields
    pub const IP_ADDRESS: FieldId = FieldId(1);
    pub const DOMAIN_NAME: FieldId = FieldId(2);
    pub const MD5_HASH: FieldId = FieldId(3);
    pub const SHA1_HASH: FieldId = FieldId(4);
    pub const SHA256_HASH: FieldId = FieldId(5);
    pub const TRACE_ID: FieldId = FieldId(6);
    pub const AWS_ACCOUNT_ID: FieldId = FieldId(7);
    pub const AWS_INSTANCE_ID: FieldId = FieldId(8);
    pub const AWS_ARN: FieldId = FieldId(9);
    pub const AWS_TAG: FieldId = FieldId(10);

    /// Core fields in output order
    pub const CORE: [FieldId; 6] = [
        FieldId::LOG_TYPE,
        FieldId::ROW_ID,
        FieldId::EVENT_TIME,
        FieldId::PARSE_TIME,
        FieldId::SOURCE_ID,
        FieldId::SOURCE_LABEL,
    ];

    pub fn is_core(self) -> bool {
        self.0 <= 0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Indicator fields rendered when a result does not specify its own list
pub const DEFAULT_INDICATORS: [FieldId; 6] = [
    FieldId::IP_ADDRESS,
    FieldId::DOMAIN_NAME,
    FieldId::SHA1_HASH,
    FieldId::SHA256_HASH,
    FieldId::MD5_HASH,
    FieldId::TRACE_ID,
];

/// Names and description of one registered field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub id: FieldId,
    pub name: String,
    pub wire_name: String,
    pub description: String,
}

impl FieldMeta {
    pub fn new(
        id: FieldId,
        name: impl Into<String>,
        wire_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            wire_name: wire_name.into(),
            description: description.into(),
        }
    }
}

/// Append-only table of system fields.
///
/// Registration takes `&mut self`, so a registry shared behind `Arc` or `&'static`
/// is read-only for the rest of the process.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: BTreeMap<FieldId, FieldMeta>,
    names: HashSet<String>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRegistry {
    /// Registry holding only the core fields
    pub fn new() -> Self {
        let mut registry = Self {
            fields: BTreeMap::new(),
            names: HashSet::new(),
        };
        registry.register_core();
        registry
    }

    /// Registry holding the core fields and all built-in indicator fields
    pub fn builtin() -> Result<Self, RegistrationError> {
        let mut registry = Self::new();
        for meta in builtin_indicators() {
            registry.register_indicator(meta)?;
        }
        Ok(registry)
    }

    fn register_core(&mut self) {
        let core = [
            (FieldId::LOG_TYPE, field::LOG_TYPE, wire::LOG_TYPE, "The type of log"),
            (FieldId::ROW_ID, field::ROW_ID, wire::ROW_ID, "Unique id (UUID) for the row"),
            (
                FieldId::EVENT_TIME,
                field::EVENT_TIME,
                wire::EVENT_TIME,
                "Timestamp of the event, falls back to the parse time",
            ),
            (
                FieldId::PARSE_TIME,
                field::PARSE_TIME,
                wire::PARSE_TIME,
                "Timestamp of when the event was parsed",
            ),
            (
                FieldId::SOURCE_ID,
                field::SOURCE_ID,
                wire::SOURCE_ID,
                "The id of the source that produced the event",
            ),
            (
                FieldId::SOURCE_LABEL,
                field::SOURCE_LABEL,
                wire::SOURCE_LABEL,
                "The label of the source that produced the event",
            ),
        ];
        for (id, name, wire_name, description) in core {
            self.insert(FieldMeta::new(id, name, wire_name, description));
        }
    }

    /// Register an indicator field
    pub fn register_indicator(&mut self, meta: FieldMeta) -> Result<(), RegistrationError> {
        if meta.id.is_core() {
            return Err(RegistrationError::InvalidId(meta.id));
        }
        if self.fields.contains_key(&meta.id) {
            return Err(RegistrationError::DuplicateId(meta.id));
        }
        if !meta.name.starts_with(FIELD_NAME_PREFIX) {
            return Err(RegistrationError::InvalidNamePrefix {
                name: meta.name,
                prefix: FIELD_NAME_PREFIX,
            });
        }
        if !meta.wire_name.starts_with(WIRE_NAME_PREFIX) {
            return Err(RegistrationError::InvalidNamePrefix {
                name: meta.wire_name,
                prefix: WIRE_NAME_PREFIX,
            });
        }
        for name in [&meta.name, &meta.wire_name] {
            if self.names.contains(name.as_str()) {
                return Err(RegistrationError::DuplicateName(name.clone()));
            }
        }
        self.insert(meta);
        Ok(())
    }

    fn insert(&mut self, meta: FieldMeta) {
        self.names.insert(meta.name.clone());
        self.names.insert(meta.wire_name.clone());
        self.fields.insert(meta.id, meta);
    }

    pub fn lookup(&self, id: FieldId) -> Option<&FieldMeta> {
        self.fields.get(&id)
    }

    pub fn wire_name(&self, id: FieldId) -> Option<&str> {
        self.fields.get(&id).map(|meta| meta.wire_name.as_str())
    }

    pub fn is_registered(&self, id: FieldId) -> bool {
        self.fields.contains_key(&id)
    }

    /// Find a field by its wire name
    pub fn find_by_wire_name(&self, wire_name: &str) -> Option<&FieldMeta> {
        self.fields.values().find(|meta| meta.wire_name == wire_name)
    }

    /// All registered fields in id order
    pub fn iter(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.values()
    }

    /// Registered indicator fields in id order
    pub fn indicators(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.values().filter(|meta| !meta.id.is_core())
    }
}

fn builtin_indicators() -> Vec<FieldMeta> {
    vec![
        FieldMeta::new(
            FieldId::IP_ADDRESS,
            field::IP_ADDRESSES,
            wire::IP_ADDRESSES,
            "IP addresses associated with the event",
        ),
        FieldMeta::new(
            FieldId::DOMAIN_NAME,
            field::DOMAIN_NAMES,
            wire::DOMAIN_NAMES,
            "Domain names associated with the event",
        ),
        FieldMeta::new(
            FieldId::MD5_HASH,
            field::MD5_HASHES,
            wire::MD5_HASHES,
            "MD5 hashes associated with the event",
        ),
        FieldMeta::new(
            FieldId::SHA1_HASH,
            field::SHA1_HASHES,
            wire::SHA1_HASHES,
            "SHA1 hashes associated with the event",
        ),
        FieldMeta::new(
            FieldId::SHA256_HASH,
            field::SHA256_HASHES,
            wire::SHA256_HASHES,
            "SHA256 hashes associated with the event",
        ),
        FieldMeta::new(
            FieldId::TRACE_ID,
            field::TRACE_IDS,
            wire::TRACE_IDS,
            "Trace ids associated with the event",
        ),
        FieldMeta::new(
            FieldId::AWS_ACCOUNT_ID,
            field::AWS_ACCOUNT_IDS,
            wire::AWS_ACCOUNT_IDS,
            "AWS account ids associated with the event",
        ),
        FieldMeta::new(
            FieldId::AWS_INSTANCE_ID,
            field::AWS_INSTANCE_IDS,
            wire::AWS_INSTANCE_IDS,
            "AWS EC2 instance ids associated with the event",
        ),
        FieldMeta::new(
            FieldId::AWS_ARN,
            field::AWS_ARNS,
            wire::AWS_ARNS,
            "AWS ARNs associated with the event",
        ),
        FieldMeta::new(
            FieldId::AWS_TAG,
            field::AWS_TAGS,
            wire::AWS_TAGS,
            "AWS tags associated with the event",
        ),
    ]
}
