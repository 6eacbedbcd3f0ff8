use std::{
    fmt,
    hash::{Hash, Hasher},
    ptr,
};

use serde::{ser::SerializeTuple as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{
    codec::{json_kind, FromJsonValue, WithProfile},
    error::{Arity, CodecError, Format},
    histogram::{DisplayHistogram, SampleHistogram},
    profile::{DisplayPolicy, HistogramCodecProfile},
    time::Time,
};

const PAIR_FIELDS: usize = 2;

/// A timestamped histogram sample.
///
/// Encoded as a two-element array: the timestamp as a bare number of seconds, followed by the histogram object.
///
/// ```text
/// [1234.567,{"count":"1","sum":"4500","buckets":[[0,"4466.7196729968955","4870.992343051145","1"]]}]
/// ```
#[derive(Clone, Debug, Default)]
pub struct SampleHistogramPair {
    /// Time at which the sample was taken.
    pub timestamp: Time,

    /// The sampled histogram.
    pub histogram: SampleHistogram,
}

impl SampleHistogramPair {
    /// Creates a new `SampleHistogramPair`.
    pub fn new(timestamp: Time, histogram: SampleHistogram) -> Self {
        Self { timestamp, histogram }
    }

    /// Returns a displayable wrapper that renders this pair according to the given policy.
    pub fn display_with<'a>(&'a self, policy: &'a DisplayPolicy) -> DisplayPair<'a> {
        DisplayPair {
            timestamp: self.timestamp,
            histogram: self.histogram.display_with(policy),
        }
    }
}

impl PartialEq for SampleHistogramPair {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other) || (self.timestamp == other.timestamp && self.histogram == other.histogram)
    }
}

impl Eq for SampleHistogramPair {}

impl Hash for SampleHistogramPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.timestamp.hash(state);
        self.histogram.hash(state);
    }
}

impl FromJsonValue for SampleHistogramPair {
    fn from_json_value(value: &Value, profile: HistogramCodecProfile) -> Result<Self, CodecError> {
        let fields = match value {
            Value::Array(fields) => fields,
            other => {
                return Format {
                    target: "histogram pair",
                    reason: format!("must be an array, got {}", json_kind(other)),
                }
                .fail()
            }
        };

        if fields.len() != PAIR_FIELDS {
            return Arity {
                target: "histogram pair",
                expected: PAIR_FIELDS,
                actual: fields.len(),
            }
            .fail();
        }

        let timestamp = Time::from_json_value(&fields[0])?;
        if fields[1].is_null() {
            return Err(CodecError::MissingHistogram);
        }
        let histogram = SampleHistogram::from_json_value(&fields[1], profile)?;

        Ok(Self { timestamp, histogram })
    }
}

impl Serialize for SampleHistogramPair {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut fields = serializer.serialize_tuple(PAIR_FIELDS)?;
        fields.serialize_element(&self.timestamp)?;
        fields.serialize_element(&self.histogram)?;
        fields.end()
    }
}

impl<'de> Deserialize<'de> for SampleHistogramPair {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        WithProfile::default().deserialize_value(deserializer)
    }
}

impl fmt::Display for SampleHistogramPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display_with(&DisplayPolicy::default()), f)
    }
}

/// A [`SampleHistogramPair`] rendered as a histogram summary followed by its timestamp.
pub struct DisplayPair<'a> {
    timestamp: Time,
    histogram: DisplayHistogram<'a>,
}

impl fmt::Display for DisplayPair<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @[{}]", self.histogram, self.timestamp)
    }
}
