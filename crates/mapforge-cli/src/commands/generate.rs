// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Generate artifacts for a compilation unit.

use super::{Session, UnitArgs};
use camino::Utf8Path;
use mapforge_core::codegen::Artifact;
use miette::{Context, IntoDiagnostic, Result};
use std::fs;
use tracing::{debug, info, instrument};

/// Generate and write every artifact of the unit.
///
/// Artifacts are written even when some specifications fail; the command
/// fails afterwards if any error diagnostic was reported.
#[instrument(skip_all, fields(unit = %args.unit))]
pub fn run(args: &UnitArgs) -> Result<()> {
    let session = Session::load(args)?;
    let output = session.generate();

    let written = write_artifacts(&session.out_dir, &output.artifacts)?;
    info!(
        artifacts = output.artifacts.len(),
        written,
        out = %session.out_dir,
        "generation finished"
    );
    session.report(&output, args.format)?;

    let errors = output
        .diagnostics
        .iter()
        .filter(|d| d.severity == mapforge_core::diagnostics::Severity::Error)
        .count();
    if errors > 0 {
        miette::bail!("generation finished with {errors} error(s)");
    }
    Ok(())
}

/// Writes artifacts into `out_dir`, leaving files whose content is already
/// current untouched. Returns the number of files written.
pub fn write_artifacts(out_dir: &Utf8Path, artifacts: &[Artifact]) -> Result<usize> {
    fs::create_dir_all(out_dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to create output directory '{out_dir}'"))?;

    let mut written = 0;
    for artifact in artifacts {
        let path = out_dir.join(artifact.name.as_str());
        if fs::read_to_string(&path).is_ok_and(|existing| existing == artifact.text) {
            debug!(%path, "unchanged");
            continue;
        }
        fs::write(&path, &artifact.text)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to write '{path}'"))?;
        debug!(%path, "written");
        written += 1;
    }
    Ok(written)
}
