//! Indicator scanners
//!
//! A scanner inspects the text of one event field and writes any indicator
//! values it finds (IP addresses, domains, ARNs...) into a `ValueBuffer`.
//! Scanners never fail: input they do not recognize writes nothing.

pub mod aws;
pub mod net;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::buffer::ValueBuffer;
use crate::error::RegistrationError;
use crate::field::{FieldId, FieldRegistry};

/// Names of the built-in scanners
pub mod names {
    pub const IP: &str = "ip";
    pub const DOMAIN: &str = "domain";
    pub const HOSTNAME: &str = "hostname";
    pub const URL: &str = "url";
    pub const NET_ADDR: &str = "net_addr";
    pub const AWS_ARN: &str = "aws_arn";
    pub const AWS_ACCOUNT_ID: &str = "aws_account_id";
    pub const AWS_INSTANCE_ID: &str = "aws_instance_id";
    pub const AWS_TAG: &str = "aws_tag";
    pub const SHA1: &str = "sha1";
    pub const SHA256: &str = "sha256";
    pub const MD5: &str = "md5";
    pub const TRACE_ID: &str = "trace_id";
}

pub trait Scanner: Send + Sync {
    fn scan(&self, input: &str, values: &mut ValueBuffer);
}

impl<F> Scanner for F
where
    F: Fn(&str, &mut ValueBuffer) + Send + Sync,
{
    fn scan(&self, input: &str, values: &mut ValueBuffer) {
        self(input, values)
    }
}

/// Writes its input unchanged to a single field
#[derive(Debug, Clone, Copy)]
pub struct PassThrough(pub FieldId);

impl Scanner for PassThrough {
    fn scan(&self, input: &str, values: &mut ValueBuffer) {
        values.write_value(self.0, input);
    }
}

struct MultiScanner(Vec<Arc<dyn Scanner>>);

impl Scanner for MultiScanner {
    fn scan(&self, input: &str, values: &mut ValueBuffer) {
        for scanner in &self.0 {
            scanner.scan(input, values);
        }
    }
}

/// Scanner that runs each of `scanners` in order on the same input
pub fn multi_scanner<I>(scanners: I) -> Arc<dyn Scanner>
where
    I: IntoIterator<Item = Arc<dyn Scanner>>,
{
    Arc::new(MultiScanner(scanners.into_iter().collect()))
}

/// A registered scanner and the indicator fields it may write
#[derive(Clone)]
pub struct ScannerEntry {
    pub name: String,
    pub scanner: Arc<dyn Scanner>,
    pub fields: Vec<FieldId>,
}

impl fmt::Debug for ScannerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerEntry")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Named scanners, checked against a field registry at registration
#[derive(Debug, Clone, Default)]
pub struct ScannerRegistry {
    scanners: BTreeMap<String, ScannerEntry>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all built-in scanners.
    ///
    /// `fields` must hold the built-in indicator fields.
    pub fn builtin(fields: &FieldRegistry) -> Result<Self, RegistrationError> {
        use FieldId as F;

        let mut registry = Self::new();
        let hostname: Arc<dyn Scanner> = Arc::new(net::scan_hostname);
        let host_fields = [F::IP_ADDRESS, F::DOMAIN_NAME];

        registry.register(fields, names::IP, Arc::new(net::scan_ip), &[F::IP_ADDRESS])?;
        registry.register(fields, names::DOMAIN, hostname.clone(), &host_fields)?;
        registry.register(fields, names::HOSTNAME, hostname, &host_fields)?;
        registry.register(fields, names::URL, Arc::new(net::scan_url), &host_fields)?;
        registry.register(fields, names::NET_ADDR, Arc::new(net::scan_net_addr), &host_fields)?;
        registry.register(
            fields,
            names::AWS_ARN,
            Arc::new(aws::scan_arn),
            &[F::AWS_ARN, F::AWS_ACCOUNT_ID, F::AWS_INSTANCE_ID],
        )?;
        registry.register(
            fields,
            names::AWS_ACCOUNT_ID,
            Arc::new(aws::scan_account_id),
            &[F::AWS_ACCOUNT_ID],
        )?;
        registry.register(
            fields,
            names::AWS_INSTANCE_ID,
            Arc::new(aws::scan_instance_id),
            &[F::AWS_INSTANCE_ID],
        )?;

        let pass_through = [
            (names::AWS_TAG, F::AWS_TAG),
            (names::SHA1, F::SHA1_HASH),
            (names::SHA256, F::SHA256_HASH),
            (names::MD5, F::MD5_HASH),
            (names::TRACE_ID, F::TRACE_ID),
        ];
        for (name, id) in pass_through {
            registry.register(fields, name, Arc::new(PassThrough(id)), &[id])?;
        }
        Ok(registry)
    }

    /// Register a scanner that writes to `ids`.
    ///
    /// Every id must be a registered indicator field.
    pub fn register(
        &mut self,
        fields: &FieldRegistry,
        name: impl Into<String>,
        scanner: Arc<dyn Scanner>,
        ids: &[FieldId],
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistrationError::EmptyScannerName);
        }
        if ids.is_empty() {
            return Err(RegistrationError::NoFields(name));
        }
        if self.scanners.contains_key(&name) {
            return Err(RegistrationError::DuplicateScanner(name));
        }
        for &id in ids {
            if id.is_core() {
                return Err(RegistrationError::CoreFieldScanner { scanner: name, id });
            }
            if !fields.is_registered(id) {
                return Err(RegistrationError::UnregisteredField { scanner: name, id });
            }
        }

        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        self.scanners.insert(
            name.clone(),
            ScannerEntry {
                name,
                scanner,
                fields: ids,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&ScannerEntry> {
        self.scanners.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scanners.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScannerEntry> {
        self.scanners.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldMeta;

    fn fields() -> FieldRegistry {
        FieldRegistry::builtin().unwrap()
    }

    #[test]
    fn test_builtin_scanners() {
        let registry = ScannerRegistry::builtin(&fields()).unwrap();
        for name in [
            names::IP,
            names::DOMAIN,
            names::HOSTNAME,
            names::URL,
            names::NET_ADDR,
            names::AWS_ARN,
            names::AWS_ACCOUNT_ID,
            names::AWS_INSTANCE_ID,
            names::AWS_TAG,
            names::SHA1,
            names::SHA256,
            names::MD5,
            names::TRACE_ID,
        ] {
            assert!(registry.lookup(name).is_some(), "missing scanner {name}");
        }
        assert_eq!(
            registry.lookup(names::AWS_ARN).unwrap().fields,
            vec![FieldId::AWS_ACCOUNT_ID, FieldId::AWS_INSTANCE_ID, FieldId::AWS_ARN]
        );
    }

    #[test]
    fn test_register_validation() {
        let fields = fields();
        let mut registry = ScannerRegistry::new();
        let noop: Arc<dyn Scanner> = Arc::new(|_: &str, _: &mut ValueBuffer| {});

        assert_eq!(
            registry.register(&fields, "", noop.clone(), &[FieldId::IP_ADDRESS]),
            Err(RegistrationError::EmptyScannerName)
        );
        assert_eq!(
            registry.register(&fields, "noop", noop.clone(), &[]),
            Err(RegistrationError::NoFields("noop".to_string()))
        );
        assert_eq!(
            registry.register(&fields, "noop", noop.clone(), &[FieldId::ROW_ID]),
            Err(RegistrationError::CoreFieldScanner {
                scanner: "noop".to_string(),
                id: FieldId::ROW_ID
            })
        );
        assert_eq!(
            registry.register(&fields, "noop", noop.clone(), &[FieldId(77)]),
            Err(RegistrationError::UnregisteredField {
                scanner: "noop".to_string(),
                id: FieldId(77)
            })
        );

        registry
            .register(&fields, "noop", noop.clone(), &[FieldId::IP_ADDRESS])
            .unwrap();
        assert_eq!(
            registry.register(&fields, "noop", noop, &[FieldId::IP_ADDRESS]),
            Err(RegistrationError::DuplicateScanner("noop".to_string()))
        );
    }

    #[test]
    fn test_custom_field_scanner() {
        let mut fields = fields();
        fields
            .register_indicator(FieldMeta::new(
                FieldId(100),
                "SysAnyUsernames",
                "p_any_usernames",
                "User names",
            ))
            .unwrap();

        let mut registry = ScannerRegistry::builtin(&fields).unwrap();
        registry
            .register(
                &fields,
                "username",
                Arc::new(|input: &str, values: &mut ValueBuffer| {
                    values.write_value(FieldId(100), &input.to_lowercase())
                }),
                &[FieldId(100)],
            )
            .unwrap();

        let mut values = ValueBuffer::new();
        registry
            .lookup("username")
            .unwrap()
            .scanner
            .scan("Alice", &mut values);
        assert_eq!(values.get(FieldId(100)), Some(&["alice".to_string()][..]));
    }

    #[test]
    fn test_multi_scanner_runs_all() {
        let scanner = multi_scanner([
            Arc::new(PassThrough(FieldId::SHA1_HASH)) as Arc<dyn Scanner>,
            Arc::new(net::scan_ip) as Arc<dyn Scanner>,
        ]);
        let mut values = ValueBuffer::new();
        scanner.scan("10.0.0.1", &mut values);
        assert!(values.contains(FieldId::SHA1_HASH, "10.0.0.1"));
        assert!(values.contains(FieldId::IP_ADDRESS, "10.0.0.1"));
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        let registry = ScannerRegistry::builtin(&fields()).unwrap();
        let mut values = ValueBuffer::new();
        for entry in registry.iter() {
            entry.scanner.scan("", &mut values);
        }
        assert!(values.is_empty());
        assert!(!values.is_dirty());
    }
}
