// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Check that artifacts on disk match what the unit generates.
//!
//! Nothing is written. Out-of-date artifacts are shown as unified diffs on
//! stdout, so the command can gate CI on committed generated code.

use super::{Session, UnitArgs};
use camino::Utf8Path;
use mapforge_core::codegen::Artifact;
use miette::{Context, IntoDiagnostic, Result};
use similar::TextDiff;
use std::collections::BTreeSet;
use std::fs;
use tracing::{debug, instrument};

/// Suffix shared by every generated file.
const ARTIFACT_SUFFIX: &str = ".g.cs";

/// One way an output directory can disagree with the generated set.
#[derive(Debug, PartialEq, Eq)]
pub enum Mismatch {
    /// The artifact is not on disk.
    Missing(String),
    /// The artifact is on disk with different content.
    Changed { name: String, diff: String },
    /// A generated file on disk that the unit no longer produces.
    Orphaned(String),
}

/// Regenerate in memory and compare against the output directory.
#[instrument(skip_all, fields(unit = %args.unit))]
pub fn run(args: &UnitArgs) -> Result<()> {
    let session = Session::load(args)?;
    let output = session.generate();
    session.report(&output, args.format)?;

    let mismatches = compare(&session.out_dir, &output.artifacts)?;
    for mismatch in &mismatches {
        match mismatch {
            Mismatch::Missing(name) => println!("missing: {name}"),
            Mismatch::Orphaned(name) => println!("orphaned: {name}"),
            Mismatch::Changed { diff, .. } => print!("{diff}"),
        }
    }

    if !mismatches.is_empty() {
        miette::bail!(
            help = "run `mapforge generate` to update them",
            "{} artifact(s) in '{}' are out of date",
            mismatches.len(),
            session.out_dir
        );
    }
    if output.has_errors() {
        miette::bail!("generation reported errors");
    }
    Ok(())
}

/// Compares `artifacts` with the files in `out_dir`, in artifact order, with
/// orphaned files last.
pub fn compare(out_dir: &Utf8Path, artifacts: &[Artifact]) -> Result<Vec<Mismatch>> {
    let mut mismatches = Vec::new();
    for artifact in artifacts {
        let path = out_dir.join(artifact.name.as_str());
        match fs::read_to_string(&path) {
            Ok(existing) if existing == artifact.text => debug!(%path, "up to date"),
            Ok(existing) => mismatches.push(Mismatch::Changed {
                name: artifact.name.to_string(),
                diff: unified_diff(&artifact.name, &existing, &artifact.text),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                mismatches.push(Mismatch::Missing(artifact.name.to_string()));
            }
            Err(err) => {
                return Err(err)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("Failed to read '{path}'"));
            }
        }
    }

    let expected: BTreeSet<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
    if out_dir.is_dir() {
        let mut orphaned = Vec::new();
        for entry in out_dir
            .read_dir_utf8()
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to list '{out_dir}'"))?
        {
            let entry = entry.into_diagnostic()?;
            let name = entry.file_name();
            if name.ends_with(ARTIFACT_SUFFIX) && !expected.contains(name) {
                orphaned.push(name.to_string());
            }
        }
        orphaned.sort();
        mismatches.extend(orphaned.into_iter().map(Mismatch::Orphaned));
    }
    Ok(mismatches)
}

fn unified_diff(name: &str, old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::generate;
    use crate::commands::test_support::unit_args;
    use tempfile::TempDir;

    #[test]
    fn test_check_passes_after_generate() {
        let temp = TempDir::new().unwrap();
        let args = unit_args(&temp);
        generate::run(&args).unwrap();
        run(&args).unwrap();
    }

    #[test]
    fn test_check_fails_before_generate() {
        let temp = TempDir::new().unwrap();
        let args = unit_args(&temp);
        let err = format!("{:?}", run(&args).unwrap_err());
        assert!(err.contains("2 artifact(s)"), "{err}");
    }

    #[test]
    fn test_compare_reports_each_kind() {
        let temp = TempDir::new().unwrap();
        let args = unit_args(&temp);
        let session = Session::load(&args).unwrap();
        let output = session.generate();
        generate::write_artifacts(&session.out_dir, &output.artifacts).unwrap();

        let update = session.out_dir.join("Mappers.Map.Update.g.cs");
        let edited = fs::read_to_string(&update)
            .unwrap()
            .replace("dest.Name = s.Name;", "dest.Name = \"hand edited\";");
        fs::write(&update, edited).unwrap();
        fs::remove_file(session.out_dir.join("Mappers.Map.Expression.g.cs")).unwrap();
        fs::write(session.out_dir.join("Mappers.Old.Update.g.cs"), "stale").unwrap();
        fs::write(session.out_dir.join("notes.txt"), "not generated").unwrap();

        let mismatches = compare(&session.out_dir, &output.artifacts).unwrap();
        assert_eq!(mismatches.len(), 3);
        assert_eq!(
            mismatches[0],
            Mismatch::Missing("Mappers.Map.Expression.g.cs".to_string())
        );
        let Mismatch::Changed { name, diff } = &mismatches[1] else {
            panic!("expected a changed artifact, got {:?}", mismatches[1]);
        };
        assert_eq!(name, "Mappers.Map.Update.g.cs");
        assert!(diff.contains("--- a/Mappers.Map.Update.g.cs"), "{diff}");
        assert!(diff.contains("-        dest.Name = \"hand edited\";"), "{diff}");
        assert!(diff.contains("+        dest.Name = s.Name;"), "{diff}");
        assert_eq!(
            mismatches[2],
            Mismatch::Orphaned("Mappers.Old.Update.g.cs".to_string())
        );
    }

    #[test]
    fn test_compare_with_missing_directory() {
        let temp = TempDir::new().unwrap();
        let args = unit_args(&temp);
        let session = Session::load(&args).unwrap();
        let output = session.generate();
        let mismatches = compare(&session.out_dir, &output.artifacts).unwrap();
        assert!(
            mismatches
                .iter()
                .all(|m| matches!(m, Mismatch::Missing(_)))
        );
    }
}
