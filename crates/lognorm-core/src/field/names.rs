//! Field name constants for the system columns.
//!
//! Every system column has two names:
//!
//! - **Field names** (PascalCase, `Sys` prefix): used in schema descriptions
//! - **Wire names** (snake_case, `p_` prefix): the JSON keys of the output record
//!
//! Event types may not declare fields that collide with either set.

/// Required prefix for system field names
pub const FIELD_NAME_PREFIX: &str = "Sys";

/// Required prefix for system wire names
pub const WIRE_NAME_PREFIX: &str = "p_";

/// Wire names of the core fields present on every output record
pub mod wire {
    /// Log type label, e.g. `AWS.CloudTrail`
    pub const LOG_TYPE: &str = "p_log_type";
    /// Unique row identifier
    pub const ROW_ID: &str = "p_row_id";
    /// Canonical event time, falls back to the parse time
    pub const EVENT_TIME: &str = "p_event_time";
    /// Time the record was built by the parser
    pub const PARSE_TIME: &str = "p_parse_time";
    /// Identifier of the source the record was read from
    pub const SOURCE_ID: &str = "p_source_id";
    /// Human-readable label of the source
    pub const SOURCE_LABEL: &str = "p_source_label";

    // Indicator arrays
    pub const IP_ADDRESSES: &str = "p_any_ip_addresses";
    pub const DOMAIN_NAMES: &str = "p_any_domain_names";
    pub const MD5_HASHES: &str = "p_any_md5_hashes";
    pub const SHA1_HASHES: &str = "p_any_sha1_hashes";
    pub const SHA256_HASHES: &str = "p_any_sha256_hashes";
    pub const TRACE_IDS: &str = "p_any_trace_ids";
    pub const AWS_ACCOUNT_IDS: &str = "p_any_aws_account_ids";
    pub const AWS_INSTANCE_IDS: &str = "p_any_aws_instance_ids";
    pub const AWS_ARNS: &str = "p_any_aws_arns";
    pub const AWS_TAGS: &str = "p_any_aws_tags";
}

/// Field names of the system columns
pub mod field {
    pub const LOG_TYPE: &str = "SysLogType";
    pub const ROW_ID: &str = "SysRowID";
    pub const EVENT_TIME: &str = "SysEventTime";
    pub const PARSE_TIME: &str = "SysParseTime";
    pub const SOURCE_ID: &str = "SysSourceID";
    pub const SOURCE_LABEL: &str = "SysSourceLabel";

    pub const IP_ADDRESSES: &str = "SysAnyIPAddresses";
    pub const DOMAIN_NAMES: &str = "SysAnyDomainNames";
    pub const MD5_HASHES: &str = "SysAnyMD5Hashes";
    pub const SHA1_HASHES: &str = "SysAnySHA1Hashes";
    pub const SHA256_HASHES: &str = "SysAnySHA256Hashes";
    pub const TRACE_IDS: &str = "SysAnyTraceIDs";
    pub const AWS_ACCOUNT_IDS: &str = "SysAnyAWSAccountIDs";
    pub const AWS_INSTANCE_IDS: &str = "SysAnyAWSInstanceIDs";
    pub const AWS_ARNS: &str = "SysAnyAWSARNs";
    pub const AWS_TAGS: &str = "SysAnyAWSTags";
}
