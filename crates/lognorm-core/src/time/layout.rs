//! String timestamp codecs: RFC3339, strftime formats and reference-time layouts

use std::fmt::Write;

use chrono::format::{self, Item, ParseErrorKind, Parsed, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};
use serde_json::Value as JsonValue;

use super::{Location, TimeDecoder, TimeEncoder, Timestamp};
use crate::error::TimeError;

/// Render a timestamp as RFC3339 with nanoseconds, trailing zeros trimmed.
///
/// `2020-07-20T15:12:46.369Z`, `2020-07-20T15:12:46Z`, `2020-07-20T17:12:46.000000001+02:00`
pub fn format_rfc3339_nano(ts: &Timestamp) -> String {
    let full = ts.to_rfc3339_opts(SecondsFormat::Nanos, true);
    let Some(dot) = full.rfind('.') else {
        return full;
    };
    let digits_end = full[dot + 1..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(full.len(), |i| dot + 1 + i);
    let fraction = full[dot + 1..digits_end].trim_end_matches('0');

    let mut out = String::with_capacity(full.len());
    out.push_str(&full[..dot]);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out.push_str(&full[digits_end..]);
    out
}

/// RFC3339 codec, the default for timestamp fields
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc3339Codec;

impl TimeDecoder for Rfc3339Codec {
    fn decode(&self, value: &JsonValue) -> Result<Option<Timestamp>, TimeError> {
        let input = match value {
            JsonValue::Null => return Ok(None),
            JsonValue::String(s) if s.is_empty() => return Ok(None),
            JsonValue::String(s) => s.as_str(),
            other => return Err(TimeError::InvalidInput(other.to_string())),
        };
        match DateTime::parse_from_rfc3339(input) {
            Ok(ts) => Ok(Some(ts)),
            // Fractional seconds with a numeric offset lacking the colon
            Err(err) => DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f%#z")
                .map(Some)
                .map_err(|_| TimeError::Parse {
                    input: input.to_string(),
                    source: err,
                }),
        }
    }
}

impl TimeEncoder for Rfc3339Codec {
    fn encode(&self, ts: &Timestamp) -> Result<JsonValue, TimeError> {
        Ok(JsonValue::String(format_rfc3339_nano(ts)))
    }
}

/// Codec driven by a strftime format.
///
/// Inputs without a zone are read as wall clock time in the codec's location.
/// Encoding formats the timestamp in its own offset.
#[derive(Debug, Clone)]
pub struct LayoutCodec {
    parse_format: String,
    format: String,
    location: Location,
}

impl LayoutCodec {
    /// Codec for a strftime format string such as `%Y-%m-%d %H:%M:%S`
    pub fn strftime(format: &str) -> Result<Self, TimeError> {
        Self::build(format.to_string(), format.to_string())
    }

    /// Codec for a reference-time layout such as `2006-01-02 15:04:05`.
    ///
    /// The reference time is `Mon Jan 2 15:04:05 MST 2006`.
    pub fn reference(layout: &str) -> Result<Self, TimeError> {
        let (parse_format, format) = translate_reference_layout(layout);
        Self::build(parse_format, format)
    }

    fn build(parse_format: String, format: String) -> Result<Self, TimeError> {
        let invalid = |f: &str| StrftimeItems::new(f).any(|item| matches!(item, Item::Error));
        if format.is_empty() || invalid(&parse_format) || invalid(&format) {
            return Err(TimeError::InvalidLayout(format));
        }
        Ok(Self {
            parse_format,
            format,
            location: Location::Utc,
        })
    }

    /// Read zoneless inputs in `location`
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    fn parse(&self, input: &str) -> Result<Timestamp, TimeError> {
        let fmt = self.parse_format.as_str();
        let err = match DateTime::parse_from_str(input, fmt) {
            Ok(ts) => return Ok(ts),
            Err(err) => err,
        };
        let naive = NaiveDateTime::parse_from_str(input, fmt).or_else(|_| {
            NaiveDate::parse_from_str(input, fmt)
                .map(|date| date.and_time(NaiveTime::MIN))
        });
        match naive {
            Ok(naive) => self
                .location
                .localize(&naive)
                .ok_or_else(|| TimeError::InvalidInput(format!("{:?}", input))),
            Err(naive_err) if naive_err.kind() == ParseErrorKind::NotEnough => {
                self.parse_with_defaults(input).ok_or_else(|| TimeError::Parse {
                    input: input.to_string(),
                    source: err,
                })
            }
            Err(_) => Err(TimeError::Parse {
                input: input.to_string(),
                source: err,
            }),
        }
    }

    /// Parse an input whose layout omits date parts.
    ///
    /// A missing year becomes year 0 and a missing month and day become
    /// January 1st; a missing time of day is midnight.
    fn parse_with_defaults(&self, input: &str) -> Option<Timestamp> {
        let mut parsed = Parsed::new();
        format::parse(&mut parsed, input, StrftimeItems::new(&self.parse_format)).ok()?;

        if parsed.to_naive_date().is_err() {
            let _ = parsed.set_year(0);
        }
        if parsed.to_naive_date().is_err() {
            let _ = parsed.set_month(1);
            let _ = parsed.set_day(1);
        }
        let date = parsed.to_naive_date().ok()?;

        if let Ok(ts) = parsed.to_datetime() {
            return Some(ts);
        }
        let time = parsed.to_naive_time().unwrap_or(NaiveTime::MIN);
        self.location.localize(&date.and_time(time))
    }
}

impl TimeDecoder for LayoutCodec {
    fn decode(&self, value: &JsonValue) -> Result<Option<Timestamp>, TimeError> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::String(s) if s.is_empty() => Ok(None),
            JsonValue::String(s) => self.parse(s).map(Some),
            other => Err(TimeError::InvalidInput(other.to_string())),
        }
    }
}

impl TimeEncoder for LayoutCodec {
    fn encode(&self, ts: &Timestamp) -> Result<JsonValue, TimeError> {
        let mut out = String::new();
        write!(out, "{}", ts.format(&self.format))
            .map_err(|_| TimeError::InvalidLayout(self.format.clone()))?;
        Ok(JsonValue::String(out))
    }
}

/// Reference-layout chunks and their strftime equivalents, as (token, parse, format).
/// Longer tokens come first so `2006` wins over `2` and `Z07:00` over `Z07`.
const LAYOUT_CHUNKS: &[(&str, &str, &str)] = &[
    ("January", "%B", "%B"),
    ("Monday", "%A", "%A"),
    ("Z07:00", "%#z", "%:z"),
    ("-07:00", "%:z", "%:z"),
    ("Z0700", "%#z", "%z"),
    ("-0700", "%z", "%z"),
    ("2006", "%Y", "%Y"),
    ("Jan", "%b", "%b"),
    ("Mon", "%a", "%a"),
    ("MST", "%Z", "%Z"),
    ("002", "%j", "%j"),
    ("Z07", "%#z", "%:z"),
    ("-07", "%#z", "%:z"),
    ("_2", "%e", "%e"),
    ("15", "%H", "%H"),
    ("01", "%m", "%m"),
    ("02", "%d", "%d"),
    ("03", "%I", "%I"),
    ("04", "%M", "%M"),
    ("05", "%S", "%S"),
    ("06", "%y", "%y"),
    ("PM", "%p", "%p"),
    ("pm", "%P", "%P"),
    ("1", "%-m", "%-m"),
    ("2", "%-d", "%-d"),
    ("3", "%-I", "%-I"),
    ("4", "%-M", "%-M"),
    ("5", "%-S", "%-S"),
];

/// Translate a reference-time layout into (parse, format) strftime strings
fn translate_reference_layout(layout: &str) -> (String, String) {
    let mut parse = String::with_capacity(layout.len() * 2);
    let mut format = String::with_capacity(layout.len() * 2);
    let mut rest = layout;

    'outer: while let Some(c) = rest.chars().next() {
        // Fractional seconds: `.000` (fixed width) or `.999` (trimmed)
        if c == '.' || c == ',' {
            let tail = &rest[1..];
            let run = tail
                .bytes()
                .take_while(|b| *b == b'0' || *b == b'9')
                .count();
            let uniform = run > 0 && tail[..run].bytes().all(|b| b == tail.as_bytes()[0]);
            let next_is_digit = tail[run..].bytes().next().is_some_and(|b| b.is_ascii_digit());
            if uniform && !next_is_digit {
                parse.push_str("%.f");
                format.push_str(match (tail.as_bytes()[0], run) {
                    (b'0', 3) => "%.3f",
                    (b'0', 6) => "%.6f",
                    (b'0', 9) => "%.9f",
                    _ => "%.f",
                });
                rest = &tail[run..];
                continue;
            }
        }

        for (token, parse_item, format_item) in LAYOUT_CHUNKS {
            if let Some(after) = rest.strip_prefix(token) {
                parse.push_str(parse_item);
                format.push_str(format_item);
                rest = after;
                continue 'outer;
            }
        }

        if c == '%' {
            parse.push_str("%%");
            format.push_str("%%");
        } else {
            parse.push(c);
            format.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }

    (parse, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    #[test]
    fn test_format_rfc3339_nano_trims_zeros() {
        let ts = DateTime::parse_from_rfc3339("2020-07-20T15:12:46.369000000Z").unwrap();
        assert_eq!(format_rfc3339_nano(&ts), "2020-07-20T15:12:46.369Z");

        let ts = DateTime::parse_from_rfc3339("2020-07-20T15:12:46Z").unwrap();
        assert_eq!(format_rfc3339_nano(&ts), "2020-07-20T15:12:46Z");

        let ts = DateTime::parse_from_rfc3339("2020-07-20T17:12:46.000000001+02:00").unwrap();
        assert_eq!(
            format_rfc3339_nano(&ts),
            "2020-07-20T17:12:46.000000001+02:00"
        );
    }

    #[test]
    fn test_rfc3339_decode_variants() {
        let codec = Rfc3339Codec;
        let plain = codec.decode(&json!("2020-07-20T15:12:46Z")).unwrap().unwrap();
        let fractional = codec
            .decode(&json!("2020-07-20T15:12:46.5+00:00"))
            .unwrap()
            .unwrap();
        let no_colon = codec
            .decode(&json!("2020-07-20T15:12:46.5+0000"))
            .unwrap()
            .unwrap();
        assert_eq!(plain.timestamp(), 1_595_257_966);
        assert_eq!(fractional.timestamp_subsec_millis(), 500);
        assert_eq!(no_colon, fractional);

        assert_eq!(codec.decode(&json!("")).unwrap(), None);
        assert!(matches!(
            codec.decode(&json!("yesterday")),
            Err(TimeError::Parse { .. })
        ));
        assert!(matches!(
            codec.decode(&json!(12)),
            Err(TimeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_translate_reference_layout() {
        assert_eq!(
            translate_reference_layout("2006-01-02 15:04:05"),
            (
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string()
            )
        );
        assert_eq!(
            translate_reference_layout("2006-01-02T15:04:05.000Z07:00").1,
            "%Y-%m-%dT%H:%M:%S%.3f%:z"
        );
        assert_eq!(
            translate_reference_layout("Jan _2 15:04:05").0,
            "%b %e %H:%M:%S"
        );
        assert_eq!(
            translate_reference_layout("02/Jan/2006:15:04:05 -0700").0,
            "%d/%b/%Y:%H:%M:%S %z"
        );
        assert_eq!(translate_reference_layout("100%").0, "-%m00%%");
    }

    #[test]
    fn test_reference_layout_roundtrip() {
        let codec = LayoutCodec::reference("02/Jan/2006:15:04:05 -0700").unwrap();
        let ts = codec
            .decode(&json!("10/Oct/2000:13:55:36 -0700"))
            .unwrap()
            .unwrap();
        assert_eq!(ts.offset(), &FixedOffset::west_opt(7 * 3600).unwrap());
        assert_eq!(
            codec.encode(&ts).unwrap(),
            json!("10/Oct/2000:13:55:36 -0700")
        );
    }

    #[test]
    fn test_zoneless_layout_uses_location() {
        let codec = LayoutCodec::strftime("%Y-%m-%d %H:%M:%S").unwrap();
        let ts = codec.decode(&json!("2020-07-20 15:12:46")).unwrap().unwrap();
        assert_eq!(format_rfc3339_nano(&ts), "2020-07-20T15:12:46Z");

        let plus_two = Location::Fixed(FixedOffset::east_opt(2 * 3600).unwrap());
        let codec = codec.with_location(plus_two);
        let ts = codec.decode(&json!("2020-07-20 15:12:46")).unwrap().unwrap();
        assert_eq!(format_rfc3339_nano(&ts), "2020-07-20T15:12:46+02:00");
        assert_eq!(ts.timestamp(), 1_595_250_766);
    }

    #[test]
    fn test_date_only_layout() {
        let codec = LayoutCodec::reference("2006-01-02").unwrap();
        let ts = codec.decode(&json!("2020-07-20")).unwrap().unwrap();
        assert_eq!(format_rfc3339_nano(&ts), "2020-07-20T00:00:00Z");
        assert_eq!(codec.encode(&ts).unwrap(), json!("2020-07-20"));
    }

    #[test]
    fn test_yearless_layouts_default_to_year_zero() {
        let syslog = LayoutCodec::reference("Jan _2 15:04:05").unwrap();
        let ts = syslog.decode(&json!("Oct 10 13:55:36")).unwrap().unwrap();
        assert_eq!(format_rfc3339_nano(&ts), "0000-10-10T13:55:36Z");
        assert_eq!(syslog.encode(&ts).unwrap(), json!("Oct 10 13:55:36"));

        let padded = syslog.decode(&json!("Oct  1 01:02:03")).unwrap().unwrap();
        assert_eq!(format_rfc3339_nano(&padded), "0000-10-01T01:02:03Z");

        let zoned = LayoutCodec::reference("Jan _2 15:04:05 -0700").unwrap();
        let ts = zoned
            .decode(&json!("Oct 10 13:55:36 +0200"))
            .unwrap()
            .unwrap();
        assert_eq!(format_rfc3339_nano(&ts), "0000-10-10T13:55:36+02:00");

        let clock = LayoutCodec::reference("15:04:05").unwrap();
        let ts = clock.decode(&json!("13:55:36")).unwrap().unwrap();
        assert_eq!(format_rfc3339_nano(&ts), "0000-01-01T13:55:36Z");

        assert!(matches!(
            syslog.decode(&json!("Oct 32 13:55:36")),
            Err(TimeError::Parse { .. })
        ));
    }

    #[test]
    fn test_invalid_layouts() {
        assert!(matches!(
            LayoutCodec::strftime("%Q"),
            Err(TimeError::InvalidLayout(_))
        ));
        assert!(matches!(
            LayoutCodec::strftime(""),
            Err(TimeError::InvalidLayout(_))
        ));
        let codec = LayoutCodec::strftime("%Y-%m-%d").unwrap();
        assert!(matches!(
            codec.decode(&json!("July 20")),
            Err(TimeError::Parse { .. })
        ));
    }
}
