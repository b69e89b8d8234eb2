// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Batch configuration.
//!
//! Parses `mapforge.toml`, which sits next to the compilation unit and sets
//! batch-wide generator options and default marker values:
//!
//! ```toml
//! [generator]
//! parallelism = 4
//! fault-message-limit = 200
//! out-dir = "src/Generated"
//! report-url = "https://git.example.org/mapforge/issues"
//!
//! [defaults]
//! update = true
//! optional-chain = "rewrite"
//! collections = "skip"
//! ```
//!
//! Defaults sit below scope and method markers; anything left unset falls
//! back to the built-in defaults.

use camino::{Utf8Path, Utf8PathBuf};
use mapforge_core::GeneratorOptions;
use mapforge_core::unit::{CollectionPolicy, Marker, OptionalChainPolicy};
use miette::{Context, IntoDiagnostic, Result};
use serde::Deserialize;
use std::fs;

/// File name looked up next to the compilation unit.
pub const CONFIG_FILE: &str = "mapforge.toml";

/// The top-level structure parsed from `mapforge.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The `[generator]` section.
    #[serde(default)]
    pub generator: GeneratorSection,
    /// The `[defaults]` section.
    #[serde(default)]
    pub defaults: DefaultsSection,
}

/// Engine settings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GeneratorSection {
    /// Worker threads; unset or zero uses the available parallelism.
    pub parallelism: Option<usize>,
    /// Maximum characters of fault text in a crash diagnostic.
    pub fault_message_limit: Option<usize>,
    /// Output directory, relative to the unit's directory.
    pub out_dir: Option<Utf8PathBuf>,
    /// Link shown with crash diagnostics.
    pub report_url: Option<String>,
}

/// Batch-wide marker defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DefaultsSection {
    pub expression: Option<bool>,
    pub update: Option<bool>,
    pub optional_chain: Option<OptionalChainPolicy>,
    pub collections: Option<CollectionPolicy>,
}

impl Config {
    /// Builds generator options from this configuration.
    pub fn generator_options(&self) -> GeneratorOptions {
        let mut options = GeneratorOptions::new().with_defaults(Marker {
            expression: self.defaults.expression,
            update: self.defaults.update,
            optional_chain: self.defaults.optional_chain,
            collections: self.defaults.collections,
        });
        if let Some(workers) = self.generator.parallelism {
            options = options.with_parallelism(workers);
        }
        if let Some(limit) = self.generator.fault_message_limit {
            options = options.with_fault_message_limit(limit);
        }
        if let Some(url) = &self.generator.report_url {
            options = options.with_report_url(url.as_str());
        }
        options
    }
}

/// Parse a `mapforge.toml` file.
pub fn parse_config(path: &Utf8Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read config '{path}'"))?;

    toml::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to parse config '{path}'"))
}

/// Look for `mapforge.toml` in the given directory and parse it if found.
///
/// Returns `None` if no config file exists. Returns an error if the file
/// exists but is malformed.
pub fn find_config(dir: &Utf8Path) -> Result<Option<Config>> {
    let path = dir.join(CONFIG_FILE);
    if path
        .try_exists()
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to stat config '{path}'"))?
    {
        tracing::debug!(%path, "using config");
        parse_config(&path).map(Some)
    } else {
        tracing::debug!(%dir, "no {CONFIG_FILE} found, using defaults");
        Ok(None)
    }
}
