//! Checks newline-delimited histogram pairs against the histogram wire format.
//!
//! Each input line is decoded as a histogram pair. Failures are logged with the rule they broke, and, when re-encoding
//! is enabled, lines that decode but are not in canonical form are reported as well.

#![deny(warnings)]
#![deny(missing_docs)]

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use histowire::HistogramCodecProfile;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

mod check;
use self::check::Checker;

mod config;
use self::config::CheckConfiguration;

const STDIN_PATH: &str = "-";

#[derive(Parser)]
#[command(about)]
struct Cli {
    /// Path to a YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wire-format profile to decode with. Overrides `codec.profile` from the configuration.
    #[arg(long)]
    profile: Option<HistogramCodecProfile>,

    /// Stop at the first line that fails to decode.
    #[arg(long)]
    fail_fast: bool,

    /// Re-encode every decoded pair and report lines that are not in canonical form.
    #[arg(long)]
    reencode: bool,

    /// File holding one histogram pair per line. Reads from standard input if omitted, or if `-`.
    input: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(true)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => info!("histowire-check finished."),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = CheckConfiguration::load(cli.config.as_deref())?;
    if let Some(profile) = cli.profile {
        config.codec.profile = profile;
    }
    config.fail_fast |= cli.fail_fast;
    config.reencode |= cli.reencode;

    info!(
        profile = %config.codec.profile,
        fail_fast = config.fail_fast,
        reencode = config.reencode,
        "histowire-check starting..."
    );

    let checker = Checker::from_configuration(&config);
    let report = checker.check_reader(open_input(cli.input.as_deref())?)?;

    info!("Checked input: {}.", report);

    if !report.is_clean() {
        bail!("{} of {} lines failed to decode.", report.failures, report.lines);
    }

    Ok(())
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        None => Ok(Box::new(io::stdin().lock())),
        Some(path) if path == Path::new(STDIN_PATH) => Ok(Box::new(io::stdin().lock())),
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open input file '{}'.", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn cli_arguments() {
        let cli = Cli::try_parse_from(["histowire-check", "--profile", "integer-count", "--reencode", "pairs.jsonl"])
            .unwrap();
        assert_eq!(cli.profile, Some(HistogramCodecProfile::IntegerCount));
        assert!(cli.reencode);
        assert!(!cli.fail_fast);
        assert_eq!(cli.input.as_deref(), Some(Path::new("pairs.jsonl")));

        assert!(Cli::try_parse_from(["histowire-check", "--profile", "integer"]).is_err());
    }

    #[test]
    fn open_input_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[0,{{\"count\":\"0\",\"sum\":\"0\",\"buckets\":[]}}]").unwrap();

        let config = CheckConfiguration::default();
        let report = Checker::from_configuration(&config)
            .check_reader(open_input(Some(file.path())).unwrap())
            .unwrap();
        assert_eq!(report.decoded, 1);

        assert!(open_input(Some(Path::new("/nonexistent/pairs.jsonl"))).is_err());
    }
}
