//! Numeric values carried on the wire as JSON strings.
//!
//! Histogram counts, sums and bucket boundaries are always written as quoted strings rather than bare JSON numbers.
//! JSON readers frequently parse numbers into lower-precision types, so quoting them is the only way to guarantee that
//! a 64-bit float survives the trip intact.

use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{
    codec::json_kind,
    error::{CodecError, Format},
};

/// A 64-bit float encoded as a JSON string.
///
/// The text form is the shortest decimal string that parses back to the same value, and never uses an exponent.
/// Non-finite values are written as `+Inf`, `-Inf`, and `NaN`.
///
/// Equality is bitwise: two values are equal only if they have the exact same representation. This means that `NaN`
/// is equal to itself (when the payload matches) and that `0.0` and `-0.0` are distinct.
#[derive(Clone, Copy, Debug, Default)]
pub struct FloatValue(pub f64);

impl FloatValue {
    /// Creates a new `FloatValue` from the given float.
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Returns the wrapped float.
    pub const fn get(self) -> f64 {
        self.0
    }

    /// Parses a float from its unquoted text form.
    ///
    /// # Errors
    ///
    /// If the text is not a valid base-10 float literal, an error is returned.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        text.parse::<f64>().map(Self).map_err(|e| CodecError::Format {
            target: "float value",
            reason: format!("'{}' is not a valid float: {}", text, e),
        })
    }

    /// Returns the JSON form of this value: the text form, quoted.
    pub fn encode_json(&self) -> String {
        format!("\"{}\"", self)
    }

    /// Decodes a value from its raw JSON form.
    ///
    /// # Errors
    ///
    /// If the input is not bounded by double quotes, or the quoted text is not a valid float, an error is returned.
    pub fn decode_json(raw: &[u8]) -> Result<Self, CodecError> {
        Self::parse(unquote(raw, "float value")?)
    }

    pub(crate) fn from_json_value(value: &Value, target: &'static str) -> Result<Self, CodecError> {
        match value {
            Value::String(text) => Self::parse(text).map_err(|e| retarget(e, target)),
            other => Format {
                target,
                reason: format!("must be a quoted string, got {}", json_kind(other)),
            }
            .fail(),
        }
    }
}

impl PartialEq for FloatValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatValue {}

impl Hash for FloatValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for FloatValue {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<FloatValue> for f64 {
    fn from(value: FloatValue) -> Self {
        value.0
    }
}

impl FromStr for FloatValue {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FloatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match non_finite_text(self.0) {
            Some(text) => f.write_str(text),
            // `Display` for `f64` already emits the shortest round-trip digits without an exponent.
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for FloatValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FloatValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;

        impl<'vde> de::Visitor<'vde> for Visitor {
            type Value = FloatValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a float value as a quoted string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                FloatValue::parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

/// A histogram count.
///
/// Depending on the wire-format profile in use, counts are either unsigned integers or floats. Both are encoded as
/// JSON strings: integers as bare decimal digits, floats using the same text form as [`FloatValue`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CountValue {
    /// An unsigned 64-bit integer count.
    Integer(u64),

    /// A floating-point count.
    Float(FloatValue),
}

impl CountValue {
    /// Returns the count as a float.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Integer(value) => *value as f64,
            Self::Float(value) => value.get(),
        }
    }

    /// Parses an integer count from its unquoted text form.
    ///
    /// Only bare decimal digits are accepted: signs, fractions and exponents are all rejected.
    ///
    /// # Errors
    ///
    /// If the text is not a non-negative integer that fits in 64 bits, an error is returned.
    pub fn parse_integer(text: &str) -> Result<Self, CodecError> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Format {
                target: "count value",
                reason: format!("'{}' is not a non-negative integer", text),
            }
            .fail();
        }

        text.parse::<u64>().map(Self::Integer).map_err(|e| CodecError::Format {
            target: "count value",
            reason: format!("'{}' is out of range: {}", text, e),
        })
    }

    /// Parses a float count from its unquoted text form.
    ///
    /// # Errors
    ///
    /// If the text is not a valid base-10 float literal, an error is returned.
    pub fn parse_float(text: &str) -> Result<Self, CodecError> {
        FloatValue::parse(text)
            .map(Self::Float)
            .map_err(|e| retarget(e, "count value"))
    }

    /// Returns the JSON form of this value: the text form, quoted.
    pub fn encode_json(&self) -> String {
        format!("\"{}\"", self)
    }

    /// Decodes an integer count from its raw JSON form.
    ///
    /// # Errors
    ///
    /// If the input is not bounded by double quotes, or the quoted text is not a valid integer count, an error is
    /// returned.
    pub fn decode_json_integer(raw: &[u8]) -> Result<Self, CodecError> {
        Self::parse_integer(unquote(raw, "count value")?)
    }

    /// Decodes a float count from its raw JSON form.
    ///
    /// # Errors
    ///
    /// If the input is not bounded by double quotes, or the quoted text is not a valid float, an error is returned.
    pub fn decode_json_float(raw: &[u8]) -> Result<Self, CodecError> {
        Self::parse_float(unquote(raw, "count value")?)
    }
}

impl Default for CountValue {
    fn default() -> Self {
        Self::Float(FloatValue::default())
    }
}

impl From<u64> for CountValue {
    fn from(value: u64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for CountValue {
    fn from(value: f64) -> Self {
        Self::Float(FloatValue(value))
    }
}

impl From<FloatValue> for CountValue {
    fn from(value: FloatValue) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for CountValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => fmt::Display::fmt(value, f),
        }
    }
}

impl Serialize for CountValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CountValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Without a profile to go on, counts are read the way the default profile reads them.
        FloatValue::deserialize(deserializer).map(Self::Float)
    }
}

/// How floats are rendered in human-readable output.
///
/// This only affects `Display` output meant for logs and debugging, never the wire format.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FloatFormat {
    /// Shortest digits, switching to exponent form for very small or very large magnitudes, in the style of `%g`.
    #[default]
    Compact,

    /// A fixed number of digits after the decimal point.
    Fixed(usize),
}

impl FloatFormat {
    /// Returns a displayable wrapper that renders `value` according to this format.
    pub fn display(self, value: f64) -> FormattedFloat {
        FormattedFloat { format: self, value }
    }
}

/// A float rendered with a particular [`FloatFormat`].
pub struct FormattedFloat {
    format: FloatFormat,
    value: f64,
}

impl fmt::Display for FormattedFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = non_finite_text(self.value) {
            return f.write_str(text);
        }

        match self.format {
            FloatFormat::Fixed(precision) => write!(f, "{:.*}", precision, self.value),
            FloatFormat::Compact => {
                // `LowerExp` gives us the shortest digits along with the decimal exponent, which is all we need to
                // decide between plain and exponent notation.
                let scientific = format!("{:e}", self.value);
                let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
                let exponent = exponent.parse::<i32>().unwrap_or(0);
                if !(-4..6).contains(&exponent) {
                    let sign = if exponent < 0 { '-' } else { '+' };
                    write!(f, "{}e{}{:02}", mantissa, sign, exponent.unsigned_abs())
                } else {
                    write!(f, "{}", self.value)
                }
            }
        }
    }
}

fn non_finite_text(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NaN")
    } else if value == f64::INFINITY {
        Some("+Inf")
    } else if value == f64::NEG_INFINITY {
        Some("-Inf")
    } else {
        None
    }
}

fn unquote<'a>(raw: &'a [u8], target: &'static str) -> Result<&'a str, CodecError> {
    if raw.len() < 2 || raw[0] != b'"' || raw[raw.len() - 1] != b'"' {
        return Format {
            target,
            reason: "must be a quoted string",
        }
        .fail();
    }

    std::str::from_utf8(&raw[1..raw.len() - 1]).map_err(|e| CodecError::Format {
        target,
        reason: format!("invalid UTF-8: {}", e),
    })
}

/// Replaces the target of a format error, leaving other errors untouched.
pub(crate) fn retarget(error: CodecError, target: &'static str) -> CodecError {
    match error {
        CodecError::Format { reason, .. } => CodecError::Format { target, reason },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::CodecErrorKind;

    #[test]
    fn float_text_is_shortest_round_trip() {
        let cases = [
            (4466.7196729968955, "4466.7196729968955"),
            (4870.992343051145, "4870.992343051145"),
            (4500.0, "4500"),
            (0.1, "0.1"),
            (1e21, "1000000000000000000000"),
            (1e-7, "0.0000001"),
            (-2.5, "-2.5"),
        ];

        for (value, expected) in cases {
            assert_eq!(FloatValue(value).to_string(), expected);
        }
    }

    #[test]
    fn float_non_finite_text() {
        assert_eq!(FloatValue(f64::INFINITY).to_string(), "+Inf");
        assert_eq!(FloatValue(f64::NEG_INFINITY).to_string(), "-Inf");
        assert_eq!(FloatValue(f64::NAN).to_string(), "NaN");

        assert_eq!(FloatValue::parse("+Inf").unwrap(), FloatValue(f64::INFINITY));
        assert_eq!(FloatValue::parse("-Inf").unwrap(), FloatValue(f64::NEG_INFINITY));
        assert!(FloatValue::parse("NaN").unwrap().get().is_nan());
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(FloatValue(f64::NAN), FloatValue(f64::NAN));
        assert_ne!(FloatValue(0.0), FloatValue(-0.0));
        assert_ne!(FloatValue(0.1 + 0.2), FloatValue(0.3));
    }

    #[test]
    fn float_decode_json_requires_quotes() {
        let cases: [&[u8]; 5] = [b"1.5", b"\"", b"", b"\"1.5", b"1.5\""];
        for raw in cases {
            let error = FloatValue::decode_json(raw).unwrap_err();
            assert_eq!(error.kind(), CodecErrorKind::Format);
        }

        assert_eq!(FloatValue::decode_json(b"\"1.5\"").unwrap(), FloatValue(1.5));
    }

    #[test]
    fn float_decode_json_rejects_garbage() {
        for raw in [&b"\"\""[..], b"\"abc\"", b"\"1.5.5\"", b"\" 1.5\""] {
            assert_eq!(FloatValue::decode_json(raw).unwrap_err().kind(), CodecErrorKind::Format);
        }
    }

    #[test]
    fn float_serde_uses_strings() {
        let encoded = serde_json::to_string(&FloatValue(4466.7196729968955)).unwrap();
        assert_eq!(encoded, "\"4466.7196729968955\"");

        let decoded: FloatValue = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, FloatValue(4466.7196729968955));

        assert!(serde_json::from_str::<FloatValue>("4466.7196729968955").is_err());
    }

    #[test]
    fn integer_count_rejects_non_digits() {
        for text in ["", "-1", "+1", "1.0", "1e3", " 1", "18446744073709551616"] {
            let error = CountValue::parse_integer(text).unwrap_err();
            assert_eq!(error.kind(), CodecErrorKind::Format, "input: {:?}", text);
        }

        assert_eq!(CountValue::parse_integer("18446744073709551615").unwrap(), CountValue::Integer(u64::MAX));
    }

    #[test]
    fn count_text_follows_variant() {
        assert_eq!(CountValue::Integer(42).encode_json(), "\"42\"");
        assert_eq!(CountValue::from(1.0).encode_json(), "\"1\"");
        assert_eq!(CountValue::from(0.5).encode_json(), "\"0.5\"");
        assert_ne!(CountValue::Integer(1), CountValue::from(1.0));
    }

    #[test]
    fn count_decode_json() {
        assert_eq!(CountValue::decode_json_integer(b"\"7\"").unwrap(), CountValue::Integer(7));
        assert_eq!(CountValue::decode_json_float(b"\"7.5\"").unwrap(), CountValue::from(7.5));
        assert_eq!(CountValue::decode_json_integer(b"7").unwrap_err().kind(), CodecErrorKind::Format);
    }

    #[test]
    fn compact_format_matches_percent_g() {
        let cases = [
            (4466.7196729968955, "4466.7196729968955"),
            (100000.0, "100000"),
            (1000000.0, "1e+06"),
            (1234567.0, "1.234567e+06"),
            (0.0001, "0.0001"),
            (0.00001, "1e-05"),
            (0.0, "0"),
            (f64::INFINITY, "+Inf"),
        ];

        for (value, expected) in cases {
            assert_eq!(FloatFormat::Compact.display(value).to_string(), expected);
        }
    }

    #[test]
    fn fixed_format() {
        assert_eq!(FloatFormat::Fixed(2).display(4466.7196729968955).to_string(), "4466.72");
        assert_eq!(FloatFormat::Fixed(6).display(1.0).to_string(), "1.000000");
        assert_eq!(FloatFormat::Fixed(2).display(f64::NEG_INFINITY).to_string(), "-Inf");
    }

    proptest! {
        #[test]
        fn property_test_float_text_round_trip(value in any::<f64>()) {
            let encoded = FloatValue(value).encode_json();
            let decoded = FloatValue::decode_json(encoded.as_bytes()).unwrap();

            if value.is_nan() {
                prop_assert!(decoded.get().is_nan());
            } else {
                prop_assert_eq!(decoded, FloatValue(value));
            }
        }

        #[test]
        fn property_test_integer_count_round_trip(value in any::<u64>()) {
            let encoded = CountValue::Integer(value).encode_json();
            prop_assert_eq!(CountValue::decode_json_integer(encoded.as_bytes()).unwrap(), CountValue::Integer(value));
        }
    }
}
