// Copyright 2025 Oxide Computer Company

//! Conversion of raw text into typed values.
//!
//! The same grammar is used for tag-declared defaults, enum lists and
//! examples during schema generation and for path, query and header values
//! during request binding, so that anything valid in a generated document
//! can be sent back to the server.
//!
//! | Kind      | Accepted text                                             |
//! |-----------|-----------------------------------------------------------|
//! | integers  | decimal, optional sign, checked against the bit width     |
//! | floats    | decimal or exponent notation, checked against the width   |
//! | booleans  | `1 t T TRUE true True 0 f F FALSE false False`            |
//! | date-time | RFC 3339, e.g. `2024-05-01T10:00:00Z`                     |
//! | date      | `YYYY-MM-DD`                                              |
//! | duration  | terms like `1h30m`, `1.5s`, `250ms`, units `ns us µs ms s m h` |
//! | bytes     | standard base64                                           |
//! | sequences | comma-separated elements                                  |

use crate::describe::Kind;
use crate::describe::TypeDescriptor;
use base64::Engine;
use chrono::DateTime;
use chrono::FixedOffset;
use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A converted value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Char(char),
    String(String),
    Bytes(bytes::Bytes),
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
    Duration(Duration),
    List(Vec<Value>),
}

impl Value {
    /// Renders the value the way it appears in a generated document.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Uint(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Char(c) => serde_json::Value::String(c.to_string()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(b),
            ),
            Value::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            Value::Date(d) => {
                serde_json::Value::String(d.format(DATE_FORMAT).to_string())
            }
            Value::Duration(d) => serde_json::Value::String(format_duration(*d)),
            Value::List(values) => serde_json::Value::Array(
                values.iter().map(Value::to_json).collect(),
            ),
        }
    }

    fn variant(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Uint(_) => "integer",
            Value::Float(_) => "number",
            Value::Char(_) => "character",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::DateTime(_) => "date-time",
            Value::Date(_) => "date",
            Value::Duration(_) => "duration",
            Value::List(_) => "list",
        }
    }

    /// Describes an unexpected value in a `FromParam` error message.
    pub fn unexpected(&self, expected: &str) -> String {
        format!("expected {}, found {}", expected, self.variant())
    }
}

/// Failure to convert raw text into the target type.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("cannot convert {value:?} to {target}: {reason}")]
pub struct ConversionError {
    pub value: String,
    pub target: String,
    pub reason: String,
}

impl ConversionError {
    fn new<R: Into<String>>(raw: &str, ty: &TypeDescriptor, reason: R) -> Self {
        ConversionError {
            value: raw.to_string(),
            target: ty.rust_name().to_string(),
            reason: reason.into(),
        }
    }
}

/// Converts raw text into values of a described type.
///
/// The strict converter (the default) rejects boolean literals outside the
/// accepted set.  The lenient one turns them into `false`; only request
/// binding may opt into it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Converter {
    lenient_booleans: bool,
}

impl Converter {
    pub fn strict() -> Self {
        Converter { lenient_booleans: false }
    }

    pub fn lenient() -> Self {
        Converter { lenient_booleans: true }
    }

    pub fn convert(
        &self,
        raw: &str,
        ty: &TypeDescriptor,
    ) -> Result<Value, ConversionError> {
        match ty.kind() {
            Kind::Nullable(inner) => self.convert(raw, &inner()),
            Kind::Bool => match parse_bool(raw) {
                Some(b) => Ok(Value::Bool(b)),
                None if self.lenient_booleans => Ok(Value::Bool(false)),
                None => Err(ConversionError::new(
                    raw,
                    ty,
                    "invalid boolean literal",
                )),
            },
            Kind::Int { bits } => parse_int(raw, *bits)
                .map(Value::Int)
                .map_err(|reason| ConversionError::new(raw, ty, reason)),
            Kind::Uint { bits } => parse_uint(raw, *bits)
                .map(Value::Uint)
                .map_err(|reason| ConversionError::new(raw, ty, reason)),
            Kind::Float { bits } => parse_float(raw, *bits)
                .map(Value::Float)
                .map_err(|reason| ConversionError::new(raw, ty, reason)),
            Kind::Char => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(ConversionError::new(
                        raw,
                        ty,
                        "expected exactly one character",
                    )),
                }
            }
            Kind::String => Ok(Value::String(raw.to_string())),
            Kind::Bytes => base64::engine::general_purpose::STANDARD
                .decode(raw)
                .map(|b| Value::Bytes(b.into()))
                .map_err(|e| ConversionError::new(raw, ty, e.to_string())),
            Kind::DateTime => DateTime::parse_from_rfc3339(raw)
                .map(Value::DateTime)
                .map_err(|e| ConversionError::new(raw, ty, e.to_string())),
            Kind::Date => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|e| ConversionError::new(raw, ty, e.to_string())),
            Kind::Duration => parse_duration(raw)
                .map(Value::Duration)
                .map_err(|reason| ConversionError::new(raw, ty, reason)),
            Kind::Seq(elem) => self.convert_list(raw, &elem()).map(Value::List),
            Kind::Array(elem, len) => {
                let values = self.convert_list(raw, &elem())?;
                if values.len() != *len {
                    return Err(ConversionError::new(
                        raw,
                        ty,
                        format!(
                            "expected {} elements, found {}",
                            len,
                            values.len()
                        ),
                    ));
                }
                Ok(Value::List(values))
            }
            Kind::Map(..)
            | Kind::Struct(_)
            | Kind::Function
            | Kind::Channel
            | Kind::RawPointer
            | Kind::Dynamic
            | Kind::Complex => Err(ConversionError::new(
                raw,
                ty,
                "type cannot be parsed from text",
            )),
        }
    }

    fn convert_list(
        &self,
        raw: &str,
        elem: &TypeDescriptor,
    ) -> Result<Vec<Value>, ConversionError> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        raw.split(',').map(|part| self.convert(part, elem)).collect()
    }
}

/// Parses the conventional boolean literals.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn parse_int(raw: &str, bits: u32) -> Result<i64, String> {
    let value = raw.parse::<i64>().map_err(|e| e.to_string())?;
    if bits < 64 {
        let max = (1i64 << (bits - 1)) - 1;
        let min = -(1i64 << (bits - 1));
        if value < min || value > max {
            return Err(format!("value out of range for {}-bit integer", bits));
        }
    }
    Ok(value)
}

fn parse_uint(raw: &str, bits: u32) -> Result<u64, String> {
    let value = raw.parse::<u64>().map_err(|e| e.to_string())?;
    if bits < 64 && value > (1u64 << bits) - 1 {
        return Err(format!(
            "value out of range for {}-bit unsigned integer",
            bits
        ));
    }
    Ok(value)
}

fn parse_float(raw: &str, bits: u32) -> Result<f64, String> {
    let value = raw.parse::<f64>().map_err(|e| e.to_string())?;
    if bits < 64 && value.is_finite() && value.abs() > f64::from(f32::MAX) {
        return Err(format!("value out of range for {}-bit float", bits));
    }
    Ok(value)
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Parses a duration such as `300ms`, `1.5h` or `2h45m`.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let mut rest = raw;
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    } else if rest.starts_with('-') {
        if rest[1..].chars().all(|c| c == '0') && rest.len() > 1 {
            return Ok(Duration::ZERO);
        }
        return Err("negative durations are not supported".to_string());
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len =
            rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (int_part, after_int) = rest.split_at(int_len);
        let (frac_part, after_frac) = match after_int.strip_prefix('.') {
            Some(after_dot) => {
                let frac_len = after_dot
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after_dot.len());
                after_dot.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(format!("invalid duration {:?}", raw));
        }
        let unit_len = after_frac
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after_frac.len());
        let (unit, remaining) = after_frac.split_at(unit_len);
        if unit.is_empty() {
            return Err(format!("missing unit in duration {:?}", raw));
        }
        let scale = unit_nanos(unit).ok_or_else(|| {
            format!("unknown unit {:?} in duration {:?}", unit, raw)
        })?;

        let whole = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse::<u128>()
                .map_err(|_| format!("invalid duration {:?}", raw))?
        };
        let nanos = whole.checked_mul(scale);
        // Digits beyond nanosecond precision cannot contribute.
        let mut divisor: u128 = 1;
        let mut fraction: u128 = 0;
        for digit in frac_part.chars().take(18) {
            fraction = fraction * 10 + u128::from(digit.to_digit(10).unwrap_or(0));
            divisor *= 10;
        }
        total = nanos
            .and_then(|n| n.checked_add(fraction * scale / divisor))
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| format!("duration {:?} overflows", raw))?;
        rest = remaining;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| format!("duration {:?} overflows", raw))?;
    // The remainder is always below one billion.
    let subsec = (total % NANOS_PER_SEC) as u32;
    Ok(Duration::new(secs, subsec))
}

/// Formats a duration with the grammar accepted by [`parse_duration`], e.g.
/// `1h30m0s`, `1.5s`, `250ms`.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_nanos();
    if total == 0 {
        return "0s".to_string();
    }
    if total < 1_000 {
        return format!("{}ns", total);
    }
    if total < 1_000_000 {
        return format!("{}\u{b5}s", with_fraction(total / 1_000, total % 1_000, 3));
    }
    if total < NANOS_PER_SEC {
        return format!(
            "{}ms",
            with_fraction(total / 1_000_000, total % 1_000_000, 6)
        );
    }

    let secs = d.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds =
        with_fraction(u128::from(secs % 60), u128::from(d.subsec_nanos()), 9);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

fn with_fraction(whole: u128, fraction: u128, digits: usize) -> String {
    if fraction == 0 {
        return whole.to_string();
    }
    let padded = format!("{:0width$}", fraction, width = digits);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}
