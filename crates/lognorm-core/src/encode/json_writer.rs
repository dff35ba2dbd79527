//! Direct JSON writing for output records.
//!
//! Records are written straight into a pre-allocated `String` rather than
//! built as a `serde_json::Value` first. Field order follows the encode plan.

use std::fmt::Write;

use serde_json::Value as JsonValue;

/// Writes the members of one JSON object, handling separators.
pub(crate) struct ObjectWriter<'a> {
    buf: &'a mut String,
    empty: bool,
}

impl<'a> ObjectWriter<'a> {
    pub(crate) fn begin(buf: &'a mut String) -> Self {
        buf.push('{');
        Self { buf, empty: true }
    }

    /// Write `"key":` and return the buffer for the member's value
    pub(crate) fn key(&mut self, key: &str) -> &mut String {
        if !self.empty {
            self.buf.push(',');
        }
        self.empty = false;
        write_json_string(self.buf, key);
        self.buf.push(':');
        &mut *self.buf
    }

    pub(crate) fn end(self) {
        self.buf.push('}');
    }
}

#[inline]
pub(crate) fn write_bool(buf: &mut String, value: bool) {
    buf.push_str(if value { "true" } else { "false" });
}

#[inline]
pub(crate) fn write_int(buf: &mut String, value: i64) {
    let _ = write!(buf, "{}", value);
}

/// Write a float; non-finite values become strings since JSON has no NaN
#[inline]
pub(crate) fn write_float(buf: &mut String, value: f64) {
    if value.is_finite() {
        let _ = write!(buf, "{}", value);
    } else if value.is_nan() {
        buf.push_str("\"NaN\"");
    } else if value > 0.0 {
        buf.push_str("\"Infinity\"");
    } else {
        buf.push_str("\"-Infinity\"");
    }
}

/// Write a `serde_json::Value` in compact form
pub(crate) fn write_json_value(buf: &mut String, value: &JsonValue) {
    match value {
        JsonValue::Null => buf.push_str("null"),
        JsonValue::Bool(b) => write_bool(buf, *b),
        JsonValue::Number(n) => {
            let _ = write!(buf, "{}", n);
        }
        JsonValue::String(s) => write_json_string(buf, s),
        JsonValue::Array(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_json_value(buf, item);
            }
            buf.push(']');
        }
        JsonValue::Object(map) => {
            let mut object = ObjectWriter::begin(buf);
            for (key, item) in map {
                write_json_value(object.key(key), item);
            }
            object.end();
        }
    }
}

pub(crate) fn write_string_array(buf: &mut String, values: &[String]) {
    buf.push('[');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        write_json_string(buf, value);
    }
    buf.push(']');
}

/// Write a JSON-escaped string to the buffer.
///
/// This handles all JSON escape sequences per RFC 8259.
#[inline]
pub(crate) fn write_json_string(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(buf, "\\u{:04x}", c as u32);
            }
            c => buf.push(c),
        }
    }
    buf.push('"');
}
