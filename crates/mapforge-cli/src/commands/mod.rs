// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! CLI command implementations.

pub mod check;
pub mod generate;

use crate::config;
use crate::diagnostic::GenerateDiagnostic;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use mapforge_core::unit::CompilationUnit;
use mapforge_core::{GenerationOutput, GeneratorOptions, generate};
use miette::{Context, IntoDiagnostic, Result};
use serde::Serialize;
use std::fs;

/// Default output directory, relative to the unit file.
const DEFAULT_OUT_DIR: &str = "generated";

/// Arguments shared by commands that process one compilation unit.
#[derive(Debug, Args)]
pub struct UnitArgs {
    /// Typed compilation unit (JSON) produced by the front end
    pub unit: Utf8PathBuf,

    /// Output directory for artifacts (default: `generated/` next to the unit)
    #[arg(long)]
    pub out: Option<Utf8PathBuf>,

    /// Config file (default: `mapforge.toml` next to the unit)
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,

    /// Original source file, used to show diagnostic locations
    #[arg(long)]
    pub source: Option<Utf8PathBuf>,

    /// Worker threads (0 = available parallelism)
    #[arg(long, short)]
    pub jobs: Option<usize>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// How results are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable diagnostics on stderr
    #[default]
    Text,
    /// One JSON document on stdout
    Json,
}

/// A loaded unit plus everything needed to generate and report on it.
#[derive(Debug)]
pub struct Session {
    pub unit: CompilationUnit,
    pub options: GeneratorOptions,
    pub out_dir: Utf8PathBuf,
    source: Option<(Utf8PathBuf, String)>,
}

impl Session {
    /// Reads the unit, its config and the optional source file.
    pub fn load(args: &UnitArgs) -> Result<Self> {
        let content = fs::read_to_string(&args.unit)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read unit '{}'", args.unit))?;
        let unit: CompilationUnit = serde_json::from_str(&content)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to parse unit '{}'", args.unit))?;

        let unit_dir = args
            .unit
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_path_buf);

        let config = match &args.config {
            Some(path) => Some(config::parse_config(path)?),
            None => config::find_config(&unit_dir)?,
        };
        let mut options = config
            .as_ref()
            .map_or_else(GeneratorOptions::new, config::Config::generator_options);
        if let Some(jobs) = args.jobs {
            options = options.with_parallelism(jobs);
        }

        let source = match &args.source {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("Failed to read source '{path}'"))?;
                Some((path.clone(), text))
            }
            None => None,
        };

        let configured_out = config.as_ref().and_then(|c| c.generator.out_dir.as_ref());
        let out_dir = match (&args.out, configured_out) {
            (Some(out), _) => out.clone(),
            (None, Some(configured)) => unit_dir.join(configured),
            (None, None) => unit_dir.join(DEFAULT_OUT_DIR),
        };

        Ok(Self {
            unit,
            options,
            out_dir,
            source,
        })
    }

    /// Runs the engine over the unit.
    pub fn generate(&self) -> GenerationOutput {
        tracing::info!(scopes = self.unit.scopes.len(), "generating");
        generate(&self.unit, &self.options)
    }

    /// Reports diagnostics in the requested format.
    pub fn report(&self, output: &GenerationOutput, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Text => {
                let source = self
                    .source
                    .as_ref()
                    .map(|(path, text)| (path.as_str(), text.as_str()));
                for diagnostic in &output.diagnostics {
                    let report = miette::Report::new(GenerateDiagnostic::from_core_diagnostic(
                        diagnostic, source,
                    ));
                    eprintln!("{report:?}");
                }
                Ok(())
            }
            OutputFormat::Json => {
                let report = JsonReport {
                    artifacts: output
                        .artifacts
                        .iter()
                        .map(|a| JsonArtifact {
                            name: a.name.as_str(),
                            kind: a.kind,
                            spec: a.spec.to_string(),
                        })
                        .collect(),
                    diagnostics: &output.diagnostics,
                };
                let json = serde_json::to_string_pretty(&report)
                    .into_diagnostic()
                    .wrap_err("Failed to serialize report")?;
                println!("{json}");
                Ok(())
            }
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    artifacts: Vec<JsonArtifact<'a>>,
    diagnostics: &'a [mapforge_core::diagnostics::Diagnostic],
}

#[derive(Serialize)]
struct JsonArtifact<'a> {
    name: &'a str,
    kind: mapforge_core::codegen::ArtifactKind,
    spec: String,
}
