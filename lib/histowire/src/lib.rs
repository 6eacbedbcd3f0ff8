//! Wire codec for native histogram samples.
//!
//! `histowire` encodes and decodes timestamped histogram samples in the compact JSON form used by Prometheus-style
//! query APIs:
//!
//! ```text
//! [1234.567,{"count":"1","sum":"4500","buckets":[[0,"4466.7196729968955","4870.992343051145","1"]]}]
//! ```
//!
//! Timestamps are bare numbers of seconds. Every other scalar is a quoted numeric string, so that floating-point values
//! survive a round trip bit-for-bit, including `+Inf`, `-Inf` and `NaN`.
//!
//! All value types implement `Serialize` and `Deserialize`, so they can be embedded in larger documents. For decoding
//! with a non-default [`HistogramCodecProfile`], or for typed errors, use [`HistogramCodec`].
#![deny(warnings)]
#![deny(missing_docs)]

mod bucket;
pub use self::bucket::{DisplayBucket, HistogramBucket};

mod codec;
pub use self::codec::{FromJsonValue, HistogramCodec, WithProfile};

mod error;
pub use self::error::{CodecError, CodecErrorKind};

mod histogram;
pub use self::histogram::{DisplayHistogram, HistogramBuckets, SampleHistogram};

mod numeric;
pub use self::numeric::{CountValue, FloatFormat, FloatValue, FormattedFloat};

mod pair;
pub use self::pair::{DisplayPair, SampleHistogramPair};

mod profile;
pub use self::profile::{BucketDisplay, CodecConfiguration, DisplayPolicy, HistogramCodecProfile, ParseProfileError};

mod time;
pub use self::time::Time;
