// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Error diagnostics using miette.
//!
//! Converts mapforge-core diagnostics into miette reports carrying:
//! - The stable `MFxxxx` code
//! - The severity the engine assigned
//! - The remediation hint, if any
//! - A label on the declaration, when the original source text is available

use mapforge_core::diagnostics::{Diagnostic as CoreDiagnostic, Severity};
use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode, SourceSpan};
use std::fmt;

/// A generation diagnostic with rich formatting.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct GenerateDiagnostic {
    /// Stable code, e.g. `MF0004`.
    pub code: &'static str,
    /// Error or warning.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Remediation hint.
    pub help: Option<String>,
    /// Source code for context.
    pub src: Option<NamedSource<String>>,
    /// Location of the declaration.
    pub span: Option<SourceSpan>,
}

impl GenerateDiagnostic {
    /// Create a new diagnostic from a mapforge-core diagnostic.
    ///
    /// `source` is the original source file as `(path, text)`; spans are only
    /// attached when they fall inside it.
    pub fn from_core_diagnostic(diagnostic: &CoreDiagnostic, source: Option<(&str, &str)>) -> Self {
        let span = diagnostic.span;
        let located = source.filter(|(_, text)| {
            !span.is_empty() && usize::try_from(span.end()).is_ok_and(|end| end <= text.len())
        });
        Self {
            code: diagnostic.code.as_str(),
            severity: diagnostic.severity,
            message: diagnostic.message.to_string(),
            help: diagnostic.hint.as_ref().map(ToString::to_string),
            src: located.map(|(path, text)| NamedSource::new(path, text.to_string())),
            span: located.map(|_| span.into()),
        }
    }
}

impl Diagnostic for GenerateDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.code))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|help| Box::new(help) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.src.as_ref().map(|src| src as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = match self.severity {
            Severity::Error => "error here",
            Severity::Warning => "warning here",
        };
        self.span.map(|span| {
            Box::new(std::iter::once(LabeledSpan::new_with_span(
                Some(label.to_string()),
                span,
            ))) as Box<dyn Iterator<Item = LabeledSpan>>
        })
    }
}
