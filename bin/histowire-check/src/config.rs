use std::path::Path;

use anyhow::{bail, Context as _, Result};
use figment::{
    providers::{Env, Format as _, Yaml},
    Figment,
};
use histowire::CodecConfiguration;
use serde::Deserialize;

const ENV_PREFIX: &str = "HISTOWIRE_";
const ENV_NESTING_SEPARATOR: &str = "__";

/// Checker configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct CheckConfiguration {
    /// Codec settings: wire-format profile and display policy.
    pub codec: CodecConfiguration,

    /// Whether to stop at the first line that fails to decode.
    pub fail_fast: bool,

    /// Whether to re-encode every decoded pair and compare it against the input line.
    ///
    /// Lines that decode fine but are not in canonical form (`"1.0"` instead of `"1"`, extra whitespace, and so on) are
    /// reported as mismatches.
    pub reencode: bool,
}

impl CheckConfiguration {
    /// Loads the configuration.
    ///
    /// Values are layered, in increasing order of precedence: defaults, the YAML file at `path` (if given), and then
    /// environment variables prefixed with `HISTOWIRE_`, using `__` to address nested fields. For example,
    /// `HISTOWIRE_CODEC__PROFILE=integer-count` sets `codec.profile`.
    ///
    /// # Errors
    ///
    /// If `path` is given but does not exist, or any source holds invalid values, an error is returned.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(path) = path {
            // `Yaml::file` silently skips missing files, which would hide a typo in the path.
            if !path.exists() {
                bail!("Configuration file '{}' does not exist.", path.display());
            }

            figment = figment.admerge(Yaml::file(path));
        }

        figment
            .admerge(Env::prefixed(ENV_PREFIX).split(ENV_NESTING_SEPARATOR))
            .extract()
            .context("Failed to load configuration.")
    }
}
