//! Codecs for timestamps as offsets from the unix epoch

use chrono::DateTime;
use serde_json::{Number, Value as JsonValue};

use super::{TimeDecoder, TimeEncoder, Timestamp};
use crate::error::TimeError;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Resolution of a unix timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnixUnit {
    Seconds,
    Millis,
    Micros,
    Nanos,
}

impl UnixUnit {
    fn nanos(self) -> i128 {
        match self {
            UnixUnit::Seconds => 1_000_000_000,
            UnixUnit::Millis => 1_000_000,
            UnixUnit::Micros => 1_000,
            UnixUnit::Nanos => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            UnixUnit::Seconds => "unix",
            UnixUnit::Millis => "unix_ms",
            UnixUnit::Micros => "unix_us",
            UnixUnit::Nanos => "unix_ns",
        }
    }
}

/// Decodes integers, floats and numeric strings; encodes JSON numbers.
///
/// Seconds are encoded as a float truncated to microseconds, so a decode of the
/// encoded value lands on the same microsecond despite float rounding.
#[derive(Debug, Clone, Copy)]
pub struct UnixCodec {
    unit: UnixUnit,
}

impl UnixCodec {
    pub fn new(unit: UnixUnit) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> UnixUnit {
        self.unit
    }

    fn at_nanos(&self, nanos: i128) -> Result<Timestamp, TimeError> {
        let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SECOND))
            .map_err(|_| TimeError::OutOfRange(self.unit.name()))?;
        let subsec = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
        DateTime::from_timestamp(secs, subsec)
            .map(|ts| ts.fixed_offset())
            .ok_or(TimeError::OutOfRange(self.unit.name()))
    }

    fn decode_float(&self, value: f64) -> Result<Timestamp, TimeError> {
        if !value.is_finite() {
            return Err(TimeError::InvalidInput(value.to_string()));
        }
        let whole = value.trunc();
        // i64::MAX as f64 rounds up to 2^63, which is itself out of range
        if whole.abs() >= i64::MAX as f64 {
            return Err(TimeError::OutOfRange(self.unit.name()));
        }
        let frac = value - whole;
        let unit = self.unit.nanos();
        // Fractions of a second are only meaningful to the microsecond
        let frac_nanos = match self.unit {
            UnixUnit::Seconds => (frac * 1e6).round() as i128 * 1_000,
            _ => (frac * unit as f64).round() as i128,
        };
        let total = (whole as i64 as i128)
            .checked_mul(unit)
            .and_then(|n| n.checked_add(frac_nanos))
            .ok_or(TimeError::OutOfRange(self.unit.name()))?;
        self.at_nanos(total)
    }

    fn decode_str(&self, input: &str) -> Result<Timestamp, TimeError> {
        let invalid = || TimeError::InvalidInput(format!("{:?}", input));
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let unit = self.unit.nanos();
        let whole: i128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        // Digits beyond nanosecond resolution are dropped
        let scale = unit.ilog10() as usize;
        let frac_digits = &frac_part[..frac_part.len().min(scale)];
        let frac: i128 = if frac_digits.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_digits, width = scale);
            padded.parse().map_err(|_| invalid())?
        };

        let total = whole
            .checked_mul(unit)
            .and_then(|n| n.checked_add(frac))
            .ok_or(TimeError::OutOfRange(self.unit.name()))?;
        self.at_nanos(if negative { -total } else { total })
    }
}

impl TimeDecoder for UnixCodec {
    fn decode(&self, value: &JsonValue) -> Result<Option<Timestamp>, TimeError> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    self.at_nanos(i as i128 * self.unit.nanos()).map(Some)
                } else if let Some(u) = n.as_u64() {
                    self.at_nanos(u as i128 * self.unit.nanos()).map(Some)
                } else {
                    let f = n
                        .as_f64()
                        .ok_or_else(|| TimeError::InvalidInput(n.to_string()))?;
                    self.decode_float(f).map(Some)
                }
            }
            JsonValue::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                self.decode_str(s).map(Some)
            }
            other => Err(TimeError::InvalidInput(other.to_string())),
        }
    }
}

impl TimeEncoder for UnixCodec {
    fn encode(&self, ts: &Timestamp) -> Result<JsonValue, TimeError> {
        let value = match self.unit {
            UnixUnit::Seconds => {
                let secs = ts.timestamp();
                let micros = ts.timestamp_subsec_micros();
                if micros == 0 {
                    JsonValue::from(secs)
                } else {
                    let f = secs as f64 + micros as f64 / 1e6;
                    Number::from_f64(f)
                        .map(JsonValue::Number)
                        .ok_or(TimeError::OutOfRange(self.unit.name()))?
                }
            }
            UnixUnit::Millis => JsonValue::from(ts.timestamp_millis()),
            UnixUnit::Micros => JsonValue::from(ts.timestamp_micros()),
            UnixUnit::Nanos => JsonValue::from(
                ts.timestamp_nanos_opt()
                    .ok_or(TimeError::OutOfRange(self.unit.name()))?,
            ),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(unit: UnixUnit, value: JsonValue) -> Timestamp {
        UnixCodec::new(unit).decode(&value).unwrap().unwrap()
    }

    #[test]
    fn test_unix_seconds_string_roundtrip_within_micro() {
        let codec = UnixCodec::new(UnixUnit::Seconds);
        let ts = codec.decode(&json!("1595257966.369")).unwrap().unwrap();
        assert_eq!(ts.timestamp_nanos_opt(), Some(1_595_257_966_369_000_000));

        let encoded = codec.encode(&ts).unwrap();
        let again = codec.decode(&encoded).unwrap().unwrap();
        let diff = (again.timestamp_nanos_opt().unwrap() - 1_595_257_966_369_000_000).abs();
        assert!(diff < 1_000, "drifted by {diff}ns");
    }

    #[test]
    fn test_unix_seconds_integer_encodes_as_integer() {
        let codec = UnixCodec::new(UnixUnit::Seconds);
        let ts = decode(UnixUnit::Seconds, json!(1595257966));
        assert_eq!(codec.encode(&ts).unwrap(), json!(1595257966));
    }

    #[test]
    fn test_unix_seconds_truncates_to_micros() {
        let codec = UnixCodec::new(UnixUnit::Seconds);
        let ts = decode(UnixUnit::Seconds, json!("1.123456789"));
        assert_eq!(ts.timestamp_subsec_nanos(), 123_456_789);
        let encoded = codec.encode(&ts).unwrap().as_f64().unwrap();
        assert!((encoded - 1.123456).abs() < 1e-9, "encoded {encoded}");
    }

    #[test]
    fn test_unix_millis_micros_nanos() {
        let ms = decode(UnixUnit::Millis, json!(1595257966369i64));
        assert_eq!(ms.timestamp_millis(), 1_595_257_966_369);
        assert_eq!(
            UnixCodec::new(UnixUnit::Millis).encode(&ms).unwrap(),
            json!(1595257966369i64)
        );

        let us = decode(UnixUnit::Micros, json!("1595257966369001"));
        assert_eq!(us.timestamp_micros(), 1_595_257_966_369_001);

        let ns = decode(UnixUnit::Nanos, json!(1595257966369001002i64));
        assert_eq!(
            UnixCodec::new(UnixUnit::Nanos).encode(&ns).unwrap(),
            json!(1595257966369001002i64)
        );

        let fractional_ms = decode(UnixUnit::Millis, json!("1595257966369.5"));
        assert_eq!(fractional_ms.timestamp_subsec_nanos(), 369_500_000);
    }

    #[test]
    fn test_negative_and_empty_inputs() {
        let ts = decode(UnixUnit::Seconds, json!("-1.5"));
        assert_eq!(ts.timestamp_millis(), -1_500);

        let codec = UnixCodec::new(UnixUnit::Seconds);
        assert_eq!(codec.decode(&json!("")).unwrap(), None);
        assert_eq!(codec.decode(&JsonValue::Null).unwrap(), None);
    }

    #[test]
    fn test_invalid_inputs() {
        let codec = UnixCodec::new(UnixUnit::Seconds);
        for value in [json!("abc"), json!("1.2.3"), json!("."), json!(true), json!([1])] {
            assert!(
                matches!(codec.decode(&value), Err(TimeError::InvalidInput(_))),
                "{value} should be rejected"
            );
        }
        assert!(matches!(
            codec.decode(&json!("99999999999999999999999")),
            Err(TimeError::OutOfRange("unix"))
        ));
    }

    #[test]
    fn test_huge_floats_are_out_of_range() {
        for unit in [UnixUnit::Seconds, UnixUnit::Millis, UnixUnit::Micros] {
            let codec = UnixCodec::new(unit);
            for value in [json!(1e30), json!(-1e30), json!(9.3e18)] {
                assert!(
                    matches!(codec.decode(&value), Err(TimeError::OutOfRange(_))),
                    "{value} should be out of range for {}",
                    unit.name()
                );
            }
        }

        // Inside i64 but beyond the representable date range
        assert!(matches!(
            UnixCodec::new(UnixUnit::Seconds).decode(&json!(1e17)),
            Err(TimeError::OutOfRange("unix"))
        ));
        let ts = decode(UnixUnit::Millis, json!(1.5e12));
        assert_eq!(ts.timestamp_millis(), 1_500_000_000_000);
    }
}
