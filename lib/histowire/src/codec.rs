//! Raw bytes in, raw bytes out.
//!
//! Encoding streams each value field by field straight into the output writer through its `Serialize` impl, without
//! building an intermediate document. Decoding parses the input once and then walks it field by field, so that every
//! rejection can say precisely which rule was broken.

use std::{io, marker::PhantomData};

use serde::{
    de::{self, DeserializeSeed},
    Deserialize, Deserializer, Serialize,
};
use serde_json::Value;
use snafu::ResultExt as _;
use tracing::debug;

use crate::{
    bucket::HistogramBucket,
    error::{CodecError, Json},
    histogram::SampleHistogram,
    pair::SampleHistogramPair,
    profile::{CodecConfiguration, HistogramCodecProfile},
};

// Rough sizes used to pre-size output buffers.
const PAIR_OVERHEAD_BYTES: usize = 64;
const BUCKET_BYTES: usize = 64;

/// A value that can be decoded from a parsed JSON document.
pub trait FromJsonValue: Sized {
    /// Decodes a value using the given wire-format profile.
    ///
    /// # Errors
    ///
    /// If the document does not have the expected shape, or any scalar in it is malformed, an error is returned.
    fn from_json_value(value: &Value, profile: HistogramCodecProfile) -> Result<Self, CodecError>;
}

/// Deserialization seed that decodes a value with a specific wire-format profile.
///
/// The plain `Deserialize` impls of the histogram types always use the default profile. Containers that embed them and
/// need another profile can drive deserialization through this seed instead.
pub struct WithProfile<T> {
    profile: HistogramCodecProfile,
    _value: PhantomData<fn() -> T>,
}

impl<T> WithProfile<T> {
    /// Creates a new `WithProfile` for the given profile.
    pub const fn new(profile: HistogramCodecProfile) -> Self {
        Self {
            profile,
            _value: PhantomData,
        }
    }
}

impl<T> Default for WithProfile<T> {
    fn default() -> Self {
        Self::new(HistogramCodecProfile::default())
    }
}

impl<T: FromJsonValue> WithProfile<T> {
    pub(crate) fn deserialize_value<'de, D>(self, deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        T::from_json_value(&value, self.profile).map_err(de::Error::custom)
    }
}

impl<'de, T: FromJsonValue> DeserializeSeed<'de> for WithProfile<T> {
    type Value = T;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        self.deserialize_value(deserializer)
    }
}

/// Histogram codec.
///
/// Encodes and decodes histogram buckets, histograms and histogram pairs to and from their JSON wire form, according to
/// a particular [`HistogramCodecProfile`].
#[derive(Clone, Copy, Debug, Default)]
pub struct HistogramCodec {
    profile: HistogramCodecProfile,
}

impl HistogramCodec {
    /// Creates a new `HistogramCodec` for the given profile.
    pub const fn new(profile: HistogramCodecProfile) -> Self {
        Self { profile }
    }

    /// Creates a new `HistogramCodec` from the given configuration.
    pub fn from_configuration(config: &CodecConfiguration) -> Self {
        Self::new(config.profile)
    }

    /// Returns the wire-format profile of this codec.
    pub const fn profile(&self) -> HistogramCodecProfile {
        self.profile
    }

    /// Returns a deserialization seed that decodes with this codec's profile.
    pub fn seed<T: FromJsonValue>(&self) -> WithProfile<T> {
        WithProfile::new(self.profile)
    }

    /// Encodes a histogram pair.
    ///
    /// # Errors
    ///
    /// If the pair holds counts or boundary schemas that this codec's profile cannot represent, an error is returned.
    pub fn encode_pair(&self, pair: &SampleHistogramPair) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(PAIR_OVERHEAD_BYTES + pair.histogram.buckets.len() * BUCKET_BYTES);
        self.encode_pair_into(pair, &mut buf)?;
        Ok(buf)
    }

    /// Encodes a histogram pair into the given writer.
    ///
    /// # Errors
    ///
    /// If the pair holds counts or boundary schemas that this codec's profile cannot represent, or the writer fails, an
    /// error is returned. Nothing is written in the former case.
    pub fn encode_pair_into<W: io::Write>(&self, pair: &SampleHistogramPair, writer: W) -> Result<(), CodecError> {
        self.profile.check_histogram(&pair.histogram)?;
        write_json(pair, writer)
    }

    /// Encodes a histogram.
    ///
    /// # Errors
    ///
    /// If the histogram holds counts or boundary schemas that this codec's profile cannot represent, an error is
    /// returned.
    pub fn encode_histogram(&self, histogram: &SampleHistogram) -> Result<Vec<u8>, CodecError> {
        self.profile.check_histogram(histogram)?;

        let mut buf = Vec::with_capacity(PAIR_OVERHEAD_BYTES + histogram.buckets.len() * BUCKET_BYTES);
        write_json(histogram, &mut buf)?;
        Ok(buf)
    }

    /// Encodes a single histogram bucket.
    ///
    /// # Errors
    ///
    /// If the bucket holds a count or boundary schema that this codec's profile cannot represent, an error is returned.
    pub fn encode_bucket(&self, bucket: &HistogramBucket) -> Result<Vec<u8>, CodecError> {
        self.profile.check_bucket(bucket)?;

        let mut buf = Vec::with_capacity(BUCKET_BYTES);
        write_json(bucket, &mut buf)?;
        Ok(buf)
    }

    /// Decodes a value from its raw JSON form.
    ///
    /// # Errors
    ///
    /// If the input is not valid JSON, or does not have the wire shape of `T`, an error is returned.
    pub fn decode<T: FromJsonValue>(&self, raw: &[u8]) -> Result<T, CodecError> {
        let result = parse_json(raw).and_then(|value| T::from_json_value(&value, self.profile));
        if let Err(e) = &result {
            debug!(profile = %self.profile, error = %e, "Failed to decode {}.", std::any::type_name::<T>());
        }
        result
    }

    /// Decodes a value from an already-parsed JSON document.
    ///
    /// # Errors
    ///
    /// If the document does not have the wire shape of `T`, an error is returned.
    pub fn decode_value<T: FromJsonValue>(&self, value: &Value) -> Result<T, CodecError> {
        T::from_json_value(value, self.profile)
    }

    /// Decodes a histogram pair.
    ///
    /// # Errors
    ///
    /// If the input is not a two-element array holding a timestamp and a non-null histogram, an error is returned.
    pub fn decode_pair(&self, raw: &[u8]) -> Result<SampleHistogramPair, CodecError> {
        self.decode(raw)
    }

    /// Decodes a histogram.
    ///
    /// # Errors
    ///
    /// If the input is not a histogram object, an error is returned.
    pub fn decode_histogram(&self, raw: &[u8]) -> Result<SampleHistogram, CodecError> {
        self.decode(raw)
    }

    /// Decodes a single histogram bucket.
    ///
    /// # Errors
    ///
    /// If the input is not a four-element bucket array, an error is returned.
    pub fn decode_bucket(&self, raw: &[u8]) -> Result<HistogramBucket, CodecError> {
        self.decode(raw)
    }
}

fn write_json<T: Serialize, W: io::Write>(value: &T, writer: W) -> Result<(), CodecError> {
    serde_json::to_writer(writer, value).context(Json)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses a raw JSON document into a generic value.
fn parse_json(raw: &[u8]) -> Result<Value, CodecError> {
    serde_json::from_slice(raw).context(Json)
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::{error::CodecErrorKind, numeric::CountValue, time::Time};

    const EXAMPLE: &str =
        r#"[1234.567,{"count":"1","sum":"4500","buckets":[[0,"4466.7196729968955","4870.992343051145","1"]]}]"#;

    #[test]
    fn decode_with_each_profile() {
        let legacy = HistogramCodec::new(HistogramCodecProfile::LegacyFloatCount);
        let integer = HistogramCodec::new(HistogramCodecProfile::IntegerCount);

        let pair = legacy.decode_pair(EXAMPLE.as_bytes()).unwrap();
        assert_eq!(pair.histogram.count, CountValue::from(1.0));

        let pair = integer.decode_pair(EXAMPLE.as_bytes()).unwrap();
        assert_eq!(pair.histogram.count, CountValue::Integer(1));
        assert_eq!(pair.histogram.buckets.iter().next().unwrap().count, CountValue::Integer(1));
    }

    #[test]
    fn encode_is_byte_identical_across_profiles() {
        for profile in [HistogramCodecProfile::LegacyFloatCount, HistogramCodecProfile::IntegerCount] {
            let codec = HistogramCodec::new(profile);
            let pair = codec.decode_pair(EXAMPLE.as_bytes()).unwrap();
            let encoded = codec.encode_pair(&pair).unwrap();
            assert_eq!(String::from_utf8(encoded).unwrap(), EXAMPLE);
        }
    }

    #[test]
    fn integer_profile_refuses_float_counts() {
        let legacy = HistogramCodec::new(HistogramCodecProfile::LegacyFloatCount);
        let integer = HistogramCodec::new(HistogramCodecProfile::IntegerCount);

        let pair = legacy.decode_pair(EXAMPLE.as_bytes()).unwrap();
        let mut buf = Vec::new();
        let error = integer.encode_pair_into(&pair, &mut buf).unwrap_err();
        assert_eq!(error.kind(), CodecErrorKind::Format);
        assert!(buf.is_empty());
    }

    #[test]
    fn invalid_json() {
        let codec = HistogramCodec::default();
        let error = codec.decode_pair(b"[1234.567,").unwrap_err();
        assert_eq!(error.kind(), CodecErrorKind::Json);
    }

    #[test]
    fn seed_applies_profile() {
        let codec = HistogramCodec::new(HistogramCodecProfile::IntegerCount);
        let mut deserializer = serde_json::Deserializer::from_str(EXAMPLE);
        let pair = codec.seed::<SampleHistogramPair>().deserialize(&mut deserializer).unwrap();

        assert_eq!(pair.timestamp, Time::from_unix_millis(1234567));
        assert_eq!(pair.histogram.count, CountValue::Integer(1));
    }

    #[test]
    fn decode_from_parsed_document() {
        let codec = HistogramCodec::new(HistogramCodecProfile::IntegerCount);
        let document: Value = serde_json::from_str(&format!(r#"{{"data":[{}]}}"#, EXAMPLE)).unwrap();

        let pair: SampleHistogramPair = codec.decode_value(&document["data"][0]).unwrap();
        assert_eq!(pair.timestamp, Time::from_unix_millis(1234567));
        assert_eq!(pair.histogram.count, CountValue::Integer(1));

        let error = codec.decode_value::<SampleHistogramPair>(&document["data"]).unwrap_err();
        assert_eq!(error.kind(), CodecErrorKind::Arity);
    }

    #[test]
    fn single_values() {
        let codec = HistogramCodec::default();

        let bucket = codec.decode_bucket(br#"[3,"1","2","5"]"#).unwrap();
        assert_eq!(codec.encode_bucket(&bucket).unwrap(), br#"[3,"1","2","5"]"#.to_vec());

        let histogram = codec.decode_histogram(br#"{"count":"5","sum":"7.5","buckets":[]}"#).unwrap();
        assert_eq!(
            codec.encode_histogram(&histogram).unwrap(),
            br#"{"count":"5","sum":"7.5","buckets":[]}"#.to_vec()
        );
    }
}
