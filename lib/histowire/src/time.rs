//! Sample timestamps.

use std::{fmt, str::FromStr};

use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{value::RawValue, Number, Value};

use crate::{
    codec::json_kind,
    error::{CodecError, Format},
};

const MILLIS_PER_SECOND: i64 = 1000;

// Number of fractional digits carried by the text form.
const DOT_PRECISION: usize = 3;

/// A point in time, with millisecond precision.
///
/// On the wire, timestamps are bare JSON numbers holding the number of seconds since the Unix epoch, with up to three
/// fractional digits: `1234567` milliseconds is written as `1234.567`, and `1234000` milliseconds as `1234`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Time(i64);

impl Time {
    /// Creates a new `Time` from the number of milliseconds since the Unix epoch.
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the number of milliseconds since the Unix epoch.
    pub const fn unix_millis(self) -> i64 {
        self.0
    }

    /// Creates a new `Time` from a number of seconds since the Unix epoch, rounded to the nearest millisecond.
    ///
    /// Returns `None` if `seconds` is not finite or is out of range.
    pub fn from_unix_seconds_f64(seconds: f64) -> Option<Self> {
        let millis = (seconds * MILLIS_PER_SECOND as f64).round();
        if !millis.is_finite() || millis < i64::MIN as f64 || millis >= i64::MAX as f64 {
            return None;
        }

        Some(Self(millis as i64))
    }

    /// Returns the number of seconds since the Unix epoch.
    pub fn as_unix_seconds_f64(self) -> f64 {
        self.0 as f64 / MILLIS_PER_SECOND as f64
    }

    /// Returns the canonical numeric text for this timestamp.
    pub fn encode_as_number(&self) -> String {
        self.to_string()
    }

    pub(crate) fn from_json_value(value: &Value) -> Result<Self, CodecError> {
        match value {
            // Numbers keep their source text, so JSON input follows the exact same rules as `FromStr`.
            Value::Number(number) => number.to_string().parse(),
            other => Format {
                target: "timestamp",
                reason: format!("must be a number, got {}", json_kind(other)),
            }
            .fail(),
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.0 / MILLIS_PER_SECOND;
        let fraction = (self.0 % MILLIS_PER_SECOND).unsigned_abs();

        // Integer division drops the sign of sub-second negative values, so it has to be written out by hand.
        if self.0 < 0 && seconds == 0 {
            f.write_str("-0")?;
        } else {
            write!(f, "{}", seconds)?;
        }

        if fraction != 0 {
            let digits = format!("{:03}", fraction);
            write!(f, ".{}", digits.trim_end_matches('0'))?;
        }

        Ok(())
    }
}

impl FromStr for Time {
    type Err = CodecError;

    /// Parses the numeric text form of a timestamp.
    ///
    /// Fractional digits beyond millisecond precision are truncated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| CodecError::Format {
            target: "timestamp",
            reason,
        };

        let mut parts = s.split('.');
        let whole = parts.next().unwrap_or_default();
        let fraction = parts.next();
        if parts.next().is_some() {
            return Err(invalid(format!("'{}' has more than one decimal point", s)));
        }

        let seconds = whole
            .parse::<i64>()
            .map_err(|e| invalid(format!("'{}' is not a valid timestamp: {}", s, e)))?;
        let millis = seconds
            .checked_mul(MILLIS_PER_SECOND)
            .ok_or_else(|| invalid(format!("'{}' is out of range", s)))?;

        let fraction = match fraction {
            None => return Ok(Self(millis)),
            Some(fraction) => fraction,
        };

        if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!("'{}' has an invalid fractional part", s)));
        }

        let mut digits = fraction[..fraction.len().min(DOT_PRECISION)].to_string();
        while digits.len() < DOT_PRECISION {
            digits.push('0');
        }
        let sub_millis = digits
            .parse::<i64>()
            .map_err(|e| invalid(format!("'{}' has an invalid fractional part: {}", s, e)))?;

        let total = if whole.starts_with('-') {
            millis.checked_sub(sub_millis)
        } else {
            millis.checked_add(sub_millis)
        };

        total
            .map(Self)
            .ok_or_else(|| invalid(format!("'{}' is out of range", s)))
    }
}

impl Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Written verbatim: going through `f64` loses precision past 2^53 milliseconds.
        let number = RawValue::from_string(self.encode_as_number()).map_err(ser::Error::custom)?;
        number.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let number = Number::deserialize(deserializer)?;
        number.to_string().parse().map_err(de::Error::custom)
    }
}
