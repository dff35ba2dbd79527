//! AWS indicator scanners

use crate::buffer::ValueBuffer;
use crate::field::FieldId;

const ACCOUNT_ID_LEN: usize = 12;
const INSTANCE_ID_PREFIX: &str = "i-";

/// Scans an ARN (`arn:partition:service:region:account:resource`).
///
/// Writes the ARN itself and its account id when present. Instance resources
/// also yield their instance id.
pub fn scan_arn(input: &str, values: &mut ValueBuffer) {
    let Some(arn) = Arn::parse(input) else {
        return;
    };
    values.write_value(FieldId::AWS_ARN, input);
    if is_account_id(arn.account) {
        values.write_value(FieldId::AWS_ACCOUNT_ID, arn.account);
    }
    if let Some(instance_id) = arn.instance_id() {
        values.write_value(FieldId::AWS_INSTANCE_ID, instance_id);
    }
}

pub fn scan_account_id(input: &str, values: &mut ValueBuffer) {
    if is_account_id(input) {
        values.write_value(FieldId::AWS_ACCOUNT_ID, input);
    }
}

pub fn scan_instance_id(input: &str, values: &mut ValueBuffer) {
    if is_instance_id(input) {
        values.write_value(FieldId::AWS_INSTANCE_ID, input);
    }
}

fn is_account_id(s: &str) -> bool {
    s.len() == ACCOUNT_ID_LEN && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_instance_id(s: &str) -> bool {
    s.strip_prefix(INSTANCE_ID_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric()))
}

struct Arn<'a> {
    account: &'a str,
    resource: &'a str,
}

impl<'a> Arn<'a> {
    fn parse(input: &'a str) -> Option<Self> {
        let mut parts = input.splitn(6, ':');
        if parts.next()? != "arn" {
            return None;
        }
        let partition = parts.next()?;
        let service = parts.next()?;
        let _region = parts.next()?;
        let account = parts.next()?;
        let resource = parts.next()?;
        if partition.is_empty() || service.is_empty() || resource.is_empty() {
            return None;
        }
        Some(Self {
            account,
            resource,
        })
    }

    /// `instance/i-...` or `instance:i-...`
    fn instance_id(&self) -> Option<&'a str> {
        let id = self
            .resource
            .strip_prefix("instance/")
            .or_else(|| self.resource.strip_prefix("instance:"))?;
        is_instance_id(id).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_instance_arn() {
        let mut values = ValueBuffer::new();
        scan_arn(
            "arn:aws:ec2:region:111122223333:instance/i-0123456789abcdef0",
            &mut values,
        );
        assert_eq!(
            values.get(FieldId::AWS_ARN),
            Some(&["arn:aws:ec2:region:111122223333:instance/i-0123456789abcdef0".to_string()][..])
        );
        assert_eq!(
            values.get(FieldId::AWS_ACCOUNT_ID),
            Some(&["111122223333".to_string()][..])
        );
        assert_eq!(
            values.get(FieldId::AWS_INSTANCE_ID),
            Some(&["i-0123456789abcdef0".to_string()][..])
        );
    }

    #[test]
    fn test_scan_arn_without_account() {
        let mut values = ValueBuffer::new();
        scan_arn("arn:aws:s3:::my-bucket/key.txt", &mut values);
        assert!(values.contains(FieldId::AWS_ARN, "arn:aws:s3:::my-bucket/key.txt"));
        assert_eq!(values.get(FieldId::AWS_ACCOUNT_ID), None);
        assert_eq!(values.get(FieldId::AWS_INSTANCE_ID), None);

        let mut values = ValueBuffer::new();
        scan_arn("arn:aws:iam::123456789012:role/admin", &mut values);
        assert!(values.contains(FieldId::AWS_ACCOUNT_ID, "123456789012"));
        assert_eq!(values.get(FieldId::AWS_INSTANCE_ID), None);
    }

    #[test]
    fn test_scan_arn_rejects_malformed() {
        let mut values = ValueBuffer::new();
        for input in ["", "arn:aws", "not:an:arn:at:all:x", "arn::ec2:r:1:x", "arn:aws:ec2:r:1:"] {
            scan_arn(input, &mut values);
        }
        assert!(values.is_empty());
    }

    #[test]
    fn test_scan_account_and_instance_ids() {
        let mut values = ValueBuffer::new();
        scan_account_id("123456789012", &mut values);
        scan_account_id("12345678901", &mut values);
        scan_account_id("12345678901a", &mut values);
        assert_eq!(values.fields(), vec![FieldId::AWS_ACCOUNT_ID]);
        assert_eq!(values.get(FieldId::AWS_ACCOUNT_ID).map(<[String]>::len), Some(1));

        scan_instance_id("i-0abc", &mut values);
        scan_instance_id("i-", &mut values);
        scan_instance_id("vol-0abc", &mut values);
        scan_instance_id("i-0abc/x", &mut values);
        assert_eq!(
            values.get(FieldId::AWS_INSTANCE_ID),
            Some(&["i-0abc".to_string()][..])
        );
    }
}
