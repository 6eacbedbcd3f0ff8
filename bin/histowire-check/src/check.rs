use std::{fmt, io::BufRead};

use anyhow::{bail, Context as _, Result};
use histowire::{DisplayPolicy, HistogramCodec};
use tracing::{debug, warn};

use crate::config::CheckConfiguration;

/// Summary of a checker run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CheckReport {
    /// Non-blank lines read.
    pub lines: usize,

    /// Lines that decoded successfully.
    pub decoded: usize,

    /// Lines that failed to decode, or to re-encode.
    pub failures: usize,

    /// Lines that decoded, but whose re-encoded form differs from the input.
    pub mismatches: usize,
}

impl CheckReport {
    /// Returns `true` if every line decoded successfully.
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines, {} decoded, {} failed, {} not canonical",
            self.lines, self.decoded, self.failures, self.mismatches
        )
    }
}

/// Validates newline-delimited histogram pairs.
pub struct Checker {
    codec: HistogramCodec,
    display: DisplayPolicy,
    fail_fast: bool,
    reencode: bool,
}

impl Checker {
    /// Creates a new `Checker` from the given configuration.
    pub fn from_configuration(config: &CheckConfiguration) -> Self {
        Self {
            codec: HistogramCodec::from_configuration(&config.codec),
            display: config.codec.display,
            fail_fast: config.fail_fast,
            reencode: config.reencode,
        }
    }

    /// Checks every line of `reader`.
    ///
    /// Blank lines are skipped. Lines that fail to decode are logged and counted, and only abort the run when
    /// `fail_fast` is set.
    ///
    /// # Errors
    ///
    /// If reading from `reader` fails, or `fail_fast` is set and a line fails, an error is returned.
    pub fn check_reader<R: BufRead>(&self, reader: R) -> Result<CheckReport> {
        let mut report = CheckReport::default();

        for (i, line) in reader.lines().enumerate() {
            let line_number = i + 1;
            let line = line.with_context(|| format!("Failed to read line {}.", line_number))?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            report.lines += 1;
            match self.check_line(line_number, line) {
                LineOutcome::Canonical => report.decoded += 1,
                LineOutcome::Mismatch => {
                    report.decoded += 1;
                    report.mismatches += 1;
                }
                LineOutcome::Failed => {
                    report.failures += 1;
                    if self.fail_fast {
                        bail!("Line {} failed to check; stopping early.", line_number);
                    }
                }
            }
        }

        Ok(report)
    }

    fn check_line(&self, line_number: usize, line: &str) -> LineOutcome {
        let pair = match self.codec.decode_pair(line.as_bytes()) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(line = line_number, kind = ?e.kind(), error = %e, "Failed to decode histogram pair.");
                return LineOutcome::Failed;
            }
        };

        debug!(line = line_number, pair = %pair.display_with(&self.display), "Decoded histogram pair.");

        if !self.reencode {
            return LineOutcome::Canonical;
        }

        let encoded = match self.codec.encode_pair(&pair) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(line = line_number, error = %e, "Failed to re-encode histogram pair.");
                return LineOutcome::Failed;
            }
        };

        if encoded != line.trim().as_bytes() {
            warn!(
                line = line_number,
                input = line.trim(),
                reencoded = %String::from_utf8_lossy(&encoded),
                "Re-encoded histogram pair differs from input."
            );
            return LineOutcome::Mismatch;
        }

        LineOutcome::Canonical
    }
}

enum LineOutcome {
    Canonical,
    Mismatch,
    Failed,
}

#[cfg(test)]
mod tests {
    use histowire::{CodecConfiguration, HistogramCodecProfile};
    use similar_asserts::assert_eq;

    use super::*;

    const CANONICAL: &str =
        r#"[1234.567,{"count":"1","sum":"4500","buckets":[[0,"4466.7196729968955","4870.992343051145","1"]]}]"#;
    const NOT_CANONICAL: &str = r#"[1234.567, {"count":"1.0","sum":"4500","buckets":[]}]"#;
    const NULL_HISTOGRAM: &str = "[1234.567,null]";

    fn checker(profile: HistogramCodecProfile, fail_fast: bool, reencode: bool) -> Checker {
        Checker::from_configuration(&CheckConfiguration {
            codec: CodecConfiguration {
                profile,
                ..Default::default()
            },
            fail_fast,
            reencode,
        })
    }

    fn input(lines: &[&str]) -> Vec<u8> {
        lines.join("\n").into_bytes()
    }

    #[test]
    fn counts_lines() {
        let checker = checker(HistogramCodecProfile::LegacyFloatCount, false, false);
        let report = checker
            .check_reader(&input(&[CANONICAL, "", NOT_CANONICAL, NULL_HISTOGRAM, "   "])[..])
            .unwrap();

        assert_eq!(
            report,
            CheckReport {
                lines: 3,
                decoded: 2,
                failures: 1,
                mismatches: 0,
            }
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn reencode_reports_mismatches() {
        let checker = checker(HistogramCodecProfile::LegacyFloatCount, false, true);
        let report = checker.check_reader(&input(&[CANONICAL, NOT_CANONICAL])[..]).unwrap();

        assert_eq!(report.decoded, 2);
        assert_eq!(report.mismatches, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn fail_fast_stops_at_first_failure() {
        let checker = checker(HistogramCodecProfile::LegacyFloatCount, true, false);
        let error = checker
            .check_reader(&input(&[CANONICAL, NULL_HISTOGRAM, CANONICAL])[..])
            .unwrap_err();

        assert!(error.to_string().contains("Line 2"));
    }

    #[test]
    fn integer_profile_rejects_fractional_counts() {
        let checker = checker(HistogramCodecProfile::IntegerCount, false, false);
        let report = checker.check_reader(&input(&[CANONICAL, NOT_CANONICAL])[..]).unwrap();

        assert_eq!(report.decoded, 1);
        assert_eq!(report.failures, 1);
    }

    #[test]
    fn report_display() {
        let report = CheckReport {
            lines: 4,
            decoded: 3,
            failures: 1,
            mismatches: 2,
        };
        assert_eq!(report.to_string(), "4 lines, 3 decoded, 1 failed, 2 not canonical");
    }
}
