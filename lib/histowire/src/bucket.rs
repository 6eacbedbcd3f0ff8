use std::fmt;

use serde::{ser::SerializeTuple as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{
    codec::{json_kind, FromJsonValue, WithProfile},
    error::{Arity, CodecError, Format},
    numeric::{CountValue, FloatFormat, FloatValue},
    profile::{DisplayPolicy, HistogramCodecProfile},
};

const BUCKET_FIELDS: usize = 4;

/// A single histogram bucket.
///
/// Buckets are encoded as a positional array, `[boundaries, "lower", "upper", "count"]`, where the boundary schema is
/// a bare integer and the remaining fields are quoted numeric strings.
///
/// The boundary schema decides which ends of the `lower..upper` range are inclusive:
///
/// | schema | range            |
/// |--------|------------------|
/// | 0      | `(lower, upper]` |
/// | 1      | `[lower, upper)` |
/// | 2      | `(lower, upper)` |
/// | 3      | `[lower, upper]` |
///
/// Any other schema is treated as open at both ends. The codec does not check that `lower <= upper`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct HistogramBucket {
    /// Boundary schema.
    pub boundaries: i32,

    /// Lower bound.
    pub lower: FloatValue,

    /// Upper bound.
    pub upper: FloatValue,

    /// Number of observations in the bucket.
    pub count: CountValue,
}

impl HistogramBucket {
    /// Lower bound exclusive, upper bound inclusive.
    pub const UPPER_INCLUSIVE: i32 = 0;

    /// Lower bound inclusive, upper bound exclusive.
    pub const LOWER_INCLUSIVE: i32 = 1;

    /// Both bounds exclusive.
    pub const BOTH_EXCLUSIVE: i32 = 2;

    /// Both bounds inclusive.
    pub const BOTH_INCLUSIVE: i32 = 3;

    /// Creates a new `HistogramBucket`.
    pub fn new(
        boundaries: i32, lower: impl Into<FloatValue>, upper: impl Into<FloatValue>, count: impl Into<CountValue>,
    ) -> Self {
        Self {
            boundaries,
            lower: lower.into(),
            upper: upper.into(),
            count: count.into(),
        }
    }

    /// Returns `true` if the lower bound is part of the bucket.
    pub fn lower_inclusive(&self) -> bool {
        self.boundaries == Self::LOWER_INCLUSIVE || self.boundaries == Self::BOTH_INCLUSIVE
    }

    /// Returns `true` if the upper bound is part of the bucket.
    pub fn upper_inclusive(&self) -> bool {
        self.boundaries == Self::UPPER_INCLUSIVE || self.boundaries == Self::BOTH_INCLUSIVE
    }

    /// Returns a displayable wrapper that renders this bucket according to the given policy.
    pub fn display_with(&self, policy: &DisplayPolicy) -> DisplayBucket<'_> {
        DisplayBucket {
            bucket: self,
            float_format: policy.float_format,
        }
    }
}

impl FromJsonValue for HistogramBucket {
    fn from_json_value(value: &Value, profile: HistogramCodecProfile) -> Result<Self, CodecError> {
        let fields = match value {
            Value::Array(fields) => fields,
            other => {
                return Format {
                    target: "histogram bucket",
                    reason: format!("must be an array, got {}", json_kind(other)),
                }
                .fail()
            }
        };

        if fields.len() != BUCKET_FIELDS {
            return Arity {
                target: "histogram bucket",
                expected: BUCKET_FIELDS,
                actual: fields.len(),
            }
            .fail();
        }

        Ok(Self {
            boundaries: profile.boundaries_from_json_value(&fields[0])?,
            lower: FloatValue::from_json_value(&fields[1], "bucket lower bound")?,
            upper: FloatValue::from_json_value(&fields[2], "bucket upper bound")?,
            count: profile.count_from_json_value(&fields[3])?,
        })
    }
}

impl Serialize for HistogramBucket {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut fields = serializer.serialize_tuple(BUCKET_FIELDS)?;
        fields.serialize_element(&self.boundaries)?;
        fields.serialize_element(&self.lower)?;
        fields.serialize_element(&self.upper)?;
        fields.serialize_element(&self.count)?;
        fields.end()
    }
}

impl<'de> Deserialize<'de> for HistogramBucket {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        WithProfile::default().deserialize_value(deserializer)
    }
}

impl fmt::Display for HistogramBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display_with(&DisplayPolicy::default()), f)
    }
}

/// A [`HistogramBucket`] rendered in interval notation, such as `(1,2]:5`.
pub struct DisplayBucket<'a> {
    bucket: &'a HistogramBucket,
    float_format: FloatFormat,
}

impl fmt::Display for DisplayBucket<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bucket = self.bucket;
        let open = if bucket.lower_inclusive() { '[' } else { '(' };
        let close = if bucket.upper_inclusive() { ']' } else { ')' };

        write!(
            f,
            "{}{},{}{}:{}",
            open,
            self.float_format.display(bucket.lower.get()),
            self.float_format.display(bucket.upper.get()),
            close,
            bucket.count
        )
    }
}
