use snafu::Snafu;

/// The broad category of a [`CodecError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CodecErrorKind {
    /// A scalar had the wrong JSON kind or could not be parsed.
    Format,

    /// A positional array had the wrong number of elements.
    Arity,

    /// A histogram pair carried `null` in place of its histogram.
    MissingHistogram,

    /// The input was not valid JSON, or the output could not be written.
    Json,
}

/// A codec error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
#[snafu(visibility(pub(crate)))]
pub enum CodecError {
    /// A scalar value was malformed.
    #[snafu(display("malformed {}: {}", target, reason))]
    Format {
        /// What was being decoded.
        target: &'static str,

        /// Why the value was rejected.
        reason: String,
    },

    /// A positional array had the wrong number of elements.
    #[snafu(display("wrong number of fields in {}: {} != {}", target, actual, expected))]
    Arity {
        /// What was being decoded.
        target: &'static str,

        /// Number of elements required.
        expected: usize,

        /// Number of elements found.
        actual: usize,
    },

    /// The histogram slot of a pair was `null`.
    #[snafu(display("histogram is null"))]
    MissingHistogram,

    /// The underlying JSON reader or writer failed.
    #[snafu(display("JSON error: {}", source))]
    Json {
        /// Error source.
        source: serde_json::Error,
    },
}

impl CodecError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> CodecErrorKind {
        match self {
            Self::Format { .. } => CodecErrorKind::Format,
            Self::Arity { .. } => CodecErrorKind::Arity,
            Self::MissingHistogram => CodecErrorKind::MissingHistogram,
            Self::Json { .. } => CodecErrorKind::Json,
        }
    }
}
