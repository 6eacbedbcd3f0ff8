//! Wire-format profiles and codec configuration.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::Snafu;

use crate::{
    bucket::HistogramBucket,
    codec::json_kind,
    error::{CodecError, Format},
    histogram::SampleHistogram,
    numeric::{CountValue, FloatFormat, FloatValue},
};

/// A histogram wire-format profile.
///
/// Two variants of the histogram wire format exist in the wild. They share the same shape, and differ only in how
/// bucket counts and boundary schemas are typed:
///
/// - `LegacyFloatCount` carries counts as quoted floats, and allows any 32-bit boundary schema. This is what query
///   engines emit today, and it is the default.
/// - `IntegerCount` carries counts as quoted unsigned integers, and restricts boundary schemas to a single byte.
///
/// The profile governs decoding, and what encoding is willing to emit. Values always encode in the form of their own
/// count variant, so a profile only rejects values it could not read back.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistogramCodecProfile {
    /// Counts are quoted floats.
    #[default]
    LegacyFloatCount,

    /// Counts are quoted unsigned integers.
    IntegerCount,
}

impl HistogramCodecProfile {
    /// Returns the configuration name of this profile.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LegacyFloatCount => "legacy-float-count",
            Self::IntegerCount => "integer-count",
        }
    }

    /// Returns the zero count for this profile.
    pub const fn zero_count(&self) -> CountValue {
        match self {
            Self::LegacyFloatCount => CountValue::Float(FloatValue::new(0.0)),
            Self::IntegerCount => CountValue::Integer(0),
        }
    }

    /// Parses a count from its unquoted text form.
    ///
    /// # Errors
    ///
    /// If the text is not a valid count for this profile, an error is returned.
    pub fn parse_count(&self, text: &str) -> Result<CountValue, CodecError> {
        match self {
            Self::LegacyFloatCount => CountValue::parse_float(text),
            Self::IntegerCount => CountValue::parse_integer(text),
        }
    }

    /// Decodes a count from its raw JSON form.
    ///
    /// # Errors
    ///
    /// If the input is not a quoted string holding a valid count for this profile, an error is returned.
    pub fn decode_count_json(&self, raw: &[u8]) -> Result<CountValue, CodecError> {
        match self {
            Self::LegacyFloatCount => CountValue::decode_json_float(raw),
            Self::IntegerCount => CountValue::decode_json_integer(raw),
        }
    }

    /// Checks that a bucket can be represented in this profile.
    ///
    /// # Errors
    ///
    /// If the bucket's boundary schema or count cannot be represented, an error is returned.
    pub fn check_bucket(&self, bucket: &HistogramBucket) -> Result<(), CodecError> {
        self.check_boundaries(i64::from(bucket.boundaries))?;
        self.check_count(&bucket.count)
    }

    /// Checks that a histogram, and all of its buckets, can be represented in this profile.
    ///
    /// # Errors
    ///
    /// If any count or boundary schema cannot be represented, an error is returned.
    pub fn check_histogram(&self, histogram: &SampleHistogram) -> Result<(), CodecError> {
        self.check_count(&histogram.count)?;
        histogram.buckets.iter().try_for_each(|bucket| self.check_bucket(bucket))
    }

    pub(crate) fn count_from_json_value(&self, value: &Value) -> Result<CountValue, CodecError> {
        match value {
            Value::String(text) => self.parse_count(text),
            other => Format {
                target: "count value",
                reason: format!("must be a quoted string, got {}", json_kind(other)),
            }
            .fail(),
        }
    }

    pub(crate) fn boundaries_from_json_value(&self, value: &Value) -> Result<i32, CodecError> {
        let raw = match value {
            Value::Number(number) => number.as_i64().ok_or_else(|| CodecError::Format {
                target: "boundary schema",
                reason: format!("{} is not an integer", number),
            })?,
            other => {
                return Format {
                    target: "boundary schema",
                    reason: format!("must be a bare integer, got {}", json_kind(other)),
                }
                .fail()
            }
        };

        self.check_boundaries(raw)
    }

    fn check_boundaries(&self, raw: i64) -> Result<i32, CodecError> {
        let in_range = match self {
            Self::LegacyFloatCount => i32::try_from(raw).is_ok(),
            Self::IntegerCount => u8::try_from(raw).is_ok(),
        };

        if !in_range {
            return Format {
                target: "boundary schema",
                reason: format!("{} is out of range for the {} profile", raw, self),
            }
            .fail();
        }

        // Both ranges fit in an `i32`.
        Ok(raw as i32)
    }

    fn check_count(&self, count: &CountValue) -> Result<(), CodecError> {
        match (self, count) {
            (Self::IntegerCount, CountValue::Float(value)) => Format {
                target: "count value",
                reason: format!("float count {} cannot be written in the {} profile", value, self),
            }
            .fail(),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for HistogramCodecProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown profile name.
#[derive(Debug, Snafu)]
#[snafu(display("unknown histogram codec profile '{}' (expected 'legacy-float-count' or 'integer-count')", name))]
pub struct ParseProfileError {
    name: String,
}

impl FromStr for HistogramCodecProfile {
    type Err = ParseProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy-float-count" => Ok(Self::LegacyFloatCount),
            "integer-count" => Ok(Self::IntegerCount),
            _ => Err(ParseProfileError { name: s.to_string() }),
        }
    }
}

/// How bucket lists are rendered in human-readable output.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BucketDisplay {
    /// Every bucket is rendered.
    #[default]
    Full,

    /// Only the number of buckets is rendered, keeping log lines bounded.
    Redacted,
}

/// Rendering policy for human-readable output.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct DisplayPolicy {
    /// How bucket boundaries are rendered.
    pub float_format: FloatFormat,

    /// How bucket lists are rendered.
    pub buckets: BucketDisplay,
}

/// Codec configuration.
///
/// Meant to be embedded in a larger configuration document. All fields have defaults.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct CodecConfiguration {
    /// Wire-format profile.
    pub profile: HistogramCodecProfile,

    /// Rendering policy for human-readable output.
    pub display: DisplayPolicy,
}
