// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Diagnostics reported to the hosting harness.
//!
//! Every problem the engine detects ends up here as a [`Diagnostic`] with a
//! stable [`DiagnosticCode`]. Codes never change meaning between releases, so
//! hosts can filter or suppress them.

use crate::ast::CallableId;
use crate::span::Span;
use ecow::EcoString;
use serde::Serialize;
use std::fmt;

/// Hint attached to the crash diagnostic when no report link is known.
pub const INTERNAL_FAULT_HINT: &str =
    "this is a bug in mapforge; please report it together with the compilation unit";

/// `repository` from the package metadata, empty when unset.
const REPOSITORY: &str = env!("CARGO_PKG_REPOSITORY");

/// The issue tracker of the package repository, if the package names one.
#[must_use]
pub fn default_report_url() -> Option<EcoString> {
    let repository = REPOSITORY.trim_end_matches('/');
    (!repository.is_empty()).then(|| ecow::eco_format!("{repository}/issues"))
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A problem that prevented an artifact from being generated.
    Error,
    /// A problem that caused an artifact to be skipped or degraded.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DiagnosticCode {
    /// A marked method has a statement body.
    UnsupportedBody,
    /// A marked method does not take exactly one source parameter.
    UnsupportedSignature,
    /// An optional chain survives into an expression form under policy None.
    OptionalChainUnsupported,
    /// The specification is part of, or depends on, a call cycle.
    CallCycle,
    /// Update form requested for a value-type result.
    ValueTypeUpdate,
    /// Update form requested for an empty object construction.
    NothingToUpdate,
    /// Update form requested for a body that is not an object construction.
    UpdateNeedsConstruction,
    /// The engine itself faulted while processing the batch.
    InternalFault,
}

impl DiagnosticCode {
    /// The code as shown to users.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedBody => "MF0001",
            Self::UnsupportedSignature => "MF0002",
            Self::OptionalChainUnsupported => "MF0003",
            Self::CallCycle => "MF0004",
            Self::ValueTypeUpdate => "MF0005",
            Self::NothingToUpdate => "MF0006",
            Self::UpdateNeedsConstruction => "MF0007",
            Self::InternalFault => "MF0999",
        }
    }

    /// The severity this code is always reported with.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::OptionalChainUnsupported | Self::InternalFault => Severity::Error,
            Self::UnsupportedBody
            | Self::UnsupportedSignature
            | Self::CallCycle
            | Self::ValueTypeUpdate
            | Self::NothingToUpdate
            | Self::UpdateNeedsConstruction => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Stable code.
    pub code: DiagnosticCode,
    /// The severity of the diagnostic.
    pub severity: Severity,
    /// The rendered message.
    pub message: EcoString,
    /// Location of the declaration the diagnostic is about.
    pub span: Span,
    /// The mapping specification the diagnostic names, if any.
    pub spec: Option<CallableId>,
    /// Optional remediation hint or link.
    pub hint: Option<EcoString>,
}

impl Diagnostic {
    /// Creates a diagnostic with the code's default severity.
    #[must_use]
    pub fn new(code: DiagnosticCode, message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            span,
            spec: None,
            hint: None,
        }
    }

    /// Creates a new error diagnostic.
    #[must_use]
    pub fn error(code: DiagnosticCode, message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::new(code, message, span)
        }
    }

    /// Creates a new warning diagnostic.
    #[must_use]
    pub fn warning(code: DiagnosticCode, message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::new(code, message, span)
        }
    }

    /// Attaches the specification this diagnostic is about.
    #[must_use]
    pub fn for_spec(mut self, spec: &CallableId) -> Self {
        self.spec = Some(spec.clone());
        self
    }

    /// Attaches a remediation hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<EcoString>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Builds the single crash diagnostic for a caught internal fault.
    ///
    /// The fault text is cut to at most `limit` characters. The hint is
    /// `report_url` when one is given.
    #[must_use]
    pub fn internal_fault(fault: &str, limit: usize, report_url: Option<&str>) -> Self {
        let fault = fault.replace(['\r', '\n'], " ");
        let mut message: String = fault.chars().take(limit).collect();
        if fault.chars().count() > limit {
            message.push_str("...");
        }
        Self::new(
            DiagnosticCode::InternalFault,
            ecow::eco_format!("mapping generator faulted: {message}"),
            Span::default(),
        )
        .with_hint(report_url.unwrap_or(INTERNAL_FAULT_HINT))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

/// Collects diagnostics from the batch-level passes and the per-specification
/// pipelines, in the order they are reported.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(code = %diagnostic.code, severity = %diagnostic.severity, "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    /// Records several diagnostics.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.report(diagnostic);
        }
    }

    /// Returns true if an error-severity diagnostic was reported.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Consumes the sink.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(DiagnosticCode::UnsupportedBody.as_str(), "MF0001");
        assert_eq!(DiagnosticCode::CallCycle.as_str(), "MF0004");
        assert_eq!(DiagnosticCode::UpdateNeedsConstruction.as_str(), "MF0007");
        assert_eq!(DiagnosticCode::InternalFault.as_str(), "MF0999");
    }

    #[test]
    fn severity_follows_code() {
        let d = Diagnostic::new(DiagnosticCode::CallCycle, "cycle", Span::default());
        assert_eq!(d.severity, Severity::Warning);
        let d = Diagnostic::new(
            DiagnosticCode::OptionalChainUnsupported,
            "chain",
            Span::default(),
        );
        assert_eq!(d.severity, Severity::Error);
    }

    #[test]
    fn internal_fault_is_truncated_with_hint() {
        let long = "x".repeat(500);
        let d = Diagnostic::internal_fault(
            &long,
            20,
            Some("https://git.example.org/mapforge/issues"),
        );
        assert_eq!(d.code, DiagnosticCode::InternalFault);
        assert!(d.message.len() < 60, "message not truncated: {}", d.message);
        assert!(d.message.ends_with("..."));
        assert_eq!(
            d.hint.as_deref(),
            Some("https://git.example.org/mapforge/issues")
        );
    }

    #[test]
    fn internal_fault_without_link_explains_itself() {
        let d = Diagnostic::internal_fault("boom", 200, None);
        assert_eq!(d.hint.as_deref(), Some(INTERNAL_FAULT_HINT));
    }

    #[test]
    fn default_report_url_follows_package_metadata() {
        match default_report_url() {
            Some(url) => {
                assert!(url.starts_with(REPOSITORY.trim_end_matches('/')));
                assert!(url.ends_with("/issues"));
            }
            None => assert!(REPOSITORY.is_empty()),
        }
    }

    #[test]
    fn internal_fault_flattens_newlines() {
        let d = Diagnostic::internal_fault("line one\nline two", 200, None);
        assert!(!d.message.contains('\n'));
    }

    #[test]
    fn display_includes_code() {
        let d = Diagnostic::warning(DiagnosticCode::NothingToUpdate, "nothing", Span::default());
        assert_eq!(d.to_string(), "warning[MF0006]: nothing");
    }

    #[test]
    fn sink_tracks_errors() {
        let mut sink = DiagnosticSink::new();
        sink.report(Diagnostic::warning(
            DiagnosticCode::CallCycle,
            "w",
            Span::default(),
        ));
        assert!(!sink.has_errors());
        sink.report(Diagnostic::error(
            DiagnosticCode::OptionalChainUnsupported,
            "e",
            Span::default(),
        ));
        assert!(sink.has_errors());
        assert_eq!(sink.into_diagnostics().len(), 2);
    }
}
