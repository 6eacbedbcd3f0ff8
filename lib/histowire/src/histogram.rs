use std::{
    fmt,
    hash::{Hash, Hasher},
    ptr, slice,
};

use serde::{ser::SerializeSeq as _, ser::SerializeStruct as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{
    bucket::HistogramBucket,
    codec::{json_kind, FromJsonValue, WithProfile},
    error::{CodecError, Format},
    numeric::{CountValue, FloatFormat, FloatValue},
    profile::{BucketDisplay, DisplayPolicy, HistogramCodecProfile},
};

/// An ordered list of histogram buckets.
///
/// Order is significant: buckets are encoded in insertion order, and two lists are equal only if they hold equal
/// buckets in the same order.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct HistogramBuckets(Vec<HistogramBucket>);

impl HistogramBuckets {
    /// Creates an empty bucket list.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a bucket to the end of the list.
    pub fn push(&mut self, bucket: HistogramBucket) {
        self.0.push(bucket);
    }

    /// Returns the number of buckets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no buckets.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the buckets, in order.
    pub fn iter(&self) -> slice::Iter<'_, HistogramBucket> {
        self.0.iter()
    }

    /// Returns the buckets as a slice.
    pub fn as_slice(&self) -> &[HistogramBucket] {
        &self.0
    }

    /// Consumes the list and returns the underlying buckets.
    pub fn into_inner(self) -> Vec<HistogramBucket> {
        self.0
    }
}

impl From<Vec<HistogramBucket>> for HistogramBuckets {
    fn from(buckets: Vec<HistogramBucket>) -> Self {
        Self(buckets)
    }
}

impl FromIterator<HistogramBucket> for HistogramBuckets {
    fn from_iter<I: IntoIterator<Item = HistogramBucket>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for HistogramBuckets {
    type Item = HistogramBucket;
    type IntoIter = std::vec::IntoIter<HistogramBucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a HistogramBuckets {
    type Item = &'a HistogramBucket;
    type IntoIter = slice::Iter<'a, HistogramBucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for HistogramBuckets {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for bucket in &self.0 {
            seq.serialize_element(bucket)?;
        }
        seq.end()
    }
}

/// A histogram sample: a count, a sum, and the buckets the observations fell into.
///
/// Encoded as a JSON object with the keys `count`, `sum` and `buckets`, in that order.
#[derive(Clone, Debug, Default)]
pub struct SampleHistogram {
    /// Total number of observations.
    pub count: CountValue,

    /// Sum of all observations.
    pub sum: FloatValue,

    /// Buckets, in encoding order.
    pub buckets: HistogramBuckets,
}

impl SampleHistogram {
    /// Creates a new `SampleHistogram`.
    pub fn new(count: impl Into<CountValue>, sum: impl Into<FloatValue>, buckets: impl Into<HistogramBuckets>) -> Self {
        Self {
            count: count.into(),
            sum: sum.into(),
            buckets: buckets.into(),
        }
    }

    /// Returns a displayable wrapper that renders this histogram according to the given policy.
    pub fn display_with<'a>(&'a self, policy: &'a DisplayPolicy) -> DisplayHistogram<'a> {
        DisplayHistogram {
            histogram: self,
            policy,
        }
    }
}

impl PartialEq for SampleHistogram {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other) || (self.count == other.count && self.sum == other.sum && self.buckets == other.buckets)
    }
}

impl Eq for SampleHistogram {}

impl Hash for SampleHistogram {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.count.hash(state);
        self.sum.hash(state);
        self.buckets.hash(state);
    }
}

impl FromJsonValue for SampleHistogram {
    fn from_json_value(value: &Value, profile: HistogramCodecProfile) -> Result<Self, CodecError> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Format {
                    target: "histogram",
                    reason: format!("must be an object, got {}", json_kind(other)),
                }
                .fail()
            }
        };

        // Unknown keys are ignored. Absent keys take their zero value, but keys that are present must be well-formed.
        let count = match fields.get("count") {
            Some(value) => profile.count_from_json_value(value)?,
            None => profile.zero_count(),
        };

        let sum = match fields.get("sum") {
            Some(value) => FloatValue::from_json_value(value, "histogram sum")?,
            None => FloatValue::default(),
        };

        let buckets = match fields.get("buckets") {
            None | Some(Value::Null) => HistogramBuckets::new(),
            Some(Value::Array(buckets)) => buckets
                .iter()
                .map(|bucket| HistogramBucket::from_json_value(bucket, profile))
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Format {
                    target: "histogram buckets",
                    reason: format!("must be an array, got {}", json_kind(other)),
                }
                .fail()
            }
        };

        Ok(Self { count, sum, buckets })
    }
}

impl Serialize for SampleHistogram {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut fields = serializer.serialize_struct("SampleHistogram", 3)?;
        fields.serialize_field("count", &self.count)?;
        fields.serialize_field("sum", &self.sum)?;
        fields.serialize_field("buckets", &self.buckets)?;
        fields.end()
    }
}

impl<'de> Deserialize<'de> for SampleHistogram {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        WithProfile::default().deserialize_value(deserializer)
    }
}

impl fmt::Display for SampleHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display_with(&DisplayPolicy::default()), f)
    }
}

/// A [`SampleHistogram`] rendered as a one-line summary.
pub struct DisplayHistogram<'a> {
    histogram: &'a SampleHistogram,
    policy: &'a DisplayPolicy,
}

impl fmt::Display for DisplayHistogram<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = FloatFormat::Fixed(6);
        write!(
            f,
            "Count: {}, Sum: {}, Buckets: ",
            summary.display(self.histogram.count.as_f64()),
            summary.display(self.histogram.sum.get())
        )?;

        let buckets = &self.histogram.buckets;
        match self.policy.buckets {
            BucketDisplay::Redacted => write!(f, "[<{} buckets>]", buckets.len()),
            BucketDisplay::Full => {
                f.write_str("[")?;
                for (i, bucket) in buckets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    fmt::Display::fmt(&bucket.display_with(self.policy), f)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use similar_asserts::assert_eq;

    use super::*;
    use crate::error::CodecErrorKind;

    fn example_histogram() -> SampleHistogram {
        SampleHistogram::new(
            1.0,
            4500.0,
            vec![HistogramBucket::new(0, 4466.7196729968955, 4870.992343051145, 1.0)],
        )
    }

    fn decode(input: &str, profile: HistogramCodecProfile) -> Result<SampleHistogram, CodecError> {
        let value = serde_json::from_str(input).unwrap();
        SampleHistogram::from_json_value(&value, profile)
    }

    #[test]
    fn encode() {
        let encoded = serde_json::to_string(&example_histogram()).unwrap();
        assert_eq!(
            encoded,
            r#"{"count":"1","sum":"4500","buckets":[[0,"4466.7196729968955","4870.992343051145","1"]]}"#
        );
    }

    #[test]
    fn encode_empty_buckets() {
        let histogram = SampleHistogram::new(0u64, 0.0, HistogramBuckets::new());
        let encoded = serde_json::to_string(&histogram).unwrap();
        assert_eq!(encoded, r#"{"count":"0","sum":"0","buckets":[]}"#);
    }

    #[test]
    fn decode_lenient_keys() {
        let profile = HistogramCodecProfile::LegacyFloatCount;

        let histogram = decode(r#"{"count":"2","sum":"3"}"#, profile).unwrap();
        assert!(histogram.buckets.is_empty());

        let histogram = decode(r#"{"count":"2","sum":"3","buckets":null}"#, profile).unwrap();
        assert!(histogram.buckets.is_empty());

        let histogram = decode(r#"{"count":"2","sum":"3","buckets":[],"extra":{"ignored":true}}"#, profile).unwrap();
        assert_eq!(histogram, SampleHistogram::new(2.0, 3.0, HistogramBuckets::new()));

        let histogram = decode(r#"{}"#, HistogramCodecProfile::IntegerCount).unwrap();
        assert_eq!(histogram.count, CountValue::Integer(0));
    }

    #[test]
    fn decode_rejects_malformed_fields() {
        let profile = HistogramCodecProfile::LegacyFloatCount;
        let cases = [
            r#"[]"#,
            r#"{"count":1,"sum":"3","buckets":[]}"#,
            r#"{"count":null,"sum":"3","buckets":[]}"#,
            r#"{"count":"2","sum":3,"buckets":[]}"#,
            r#"{"count":"2","sum":"3","buckets":{}}"#,
            r#"{"count":"2","sum":"3","buckets":[[0,"1","2",3]]}"#,
        ];

        for input in cases {
            let error = decode(input, profile).unwrap_err();
            assert_eq!(error.kind(), CodecErrorKind::Format, "input: {}", input);
        }

        let error = decode(r#"{"count":"2","sum":"3","buckets":[[0,"1","2"]]}"#, profile).unwrap_err();
        assert_eq!(error.kind(), CodecErrorKind::Arity);
    }

    #[test]
    fn bucket_order_matters() {
        let first = HistogramBucket::new(0, 0.0, 1.0, 1.0);
        let second = HistogramBucket::new(0, 1.0, 2.0, 1.0);

        let forward = SampleHistogram::new(2.0, 1.5, vec![first, second]);
        let reverse = SampleHistogram::new(2.0, 1.5, vec![second, first]);
        let shorter = SampleHistogram::new(2.0, 1.5, vec![first]);

        assert_eq!(forward, forward.clone());
        assert_ne!(forward, reverse);
        assert_ne!(forward, shorter);

        assert_eq!(reverse.buckets.into_inner(), vec![second, first]);
    }

    #[test]
    fn equal_histograms_hash_equal() {
        let mut seen = HashSet::new();
        assert!(seen.insert(example_histogram()));
        assert!(!seen.insert(example_histogram()));
        assert!(seen.insert(SampleHistogram::new(1.0, 4500.0, HistogramBuckets::new())));
        assert!(seen.insert(SampleHistogram::new(1u64, 4500.0, example_histogram().buckets)));
    }

    #[test]
    fn display() {
        assert_eq!(
            example_histogram().to_string(),
            "Count: 1.000000, Sum: 4500.000000, Buckets: [(4466.7196729968955,4870.992343051145]:1]"
        );

        let policy = DisplayPolicy {
            buckets: BucketDisplay::Redacted,
            ..Default::default()
        };
        assert_eq!(
            example_histogram().display_with(&policy).to_string(),
            "Count: 1.000000, Sum: 4500.000000, Buckets: [<1 buckets>]"
        );
    }
}
