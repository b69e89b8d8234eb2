// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Batch driver.
//!
//! One call to [`generate`] processes a whole compilation unit:
//!
//! 1. **Barrier.** Discovery, call graph and cycle detection run once for the
//!    batch. Every unsafe specification gets exactly one `MF0004` warning.
//! 2. **Per specification.** Inlining, optional-chain rewriting, and
//!    generation of the requested forms. Specifications share only immutable
//!    batch data, so they run on a pool of scoped worker threads.
//! 3. **Reassembly.** Results are put back in declaration order; the
//!    expression form of a specification precedes its update form.
//!
//! A generation error for one specification becomes a diagnostic naming it
//! and never aborts the batch. A panic in one specification's pipeline is
//! caught around that specification; every other specification still runs,
//! and the batch reports a single `MF0999` diagnostic for the earliest fault.
//! A panic in the batch-level passes is caught here as well.

use crate::analysis::{CallGraph, CycleReport, Unsafety};
use crate::ast::NullableContext;
use crate::codegen::{Artifact, CodeGenError, expression_artifact, plan_update, update_artifact};
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, default_report_url};
use crate::discovery::{Discovery, discover};
use crate::spec::{Callables, MappingSpec};
use crate::transform::{Inliner, rewrite};
use crate::unit::{CompilationUnit, Marker};
use ecow::EcoString;
use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

/// Default cap on the length of the crash diagnostic's fault text.
pub const DEFAULT_FAULT_MESSAGE_LIMIT: usize = 200;

/// Options for a generation batch.
///
/// Use [`GeneratorOptions::new`] to create default options, then chain
/// builder methods to customize.
///
/// # Example
///
/// ```
/// use mapforge_core::pipeline::GeneratorOptions;
/// use mapforge_core::unit::{Marker, OptionalChainPolicy};
///
/// let options = GeneratorOptions::new()
///     .with_parallelism(2)
///     .with_defaults(Marker {
///         optional_chain: Some(OptionalChainPolicy::Rewrite),
///         ..Marker::default()
///     });
/// assert_eq!(options.fault_message_limit(), 200);
/// ```
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Worker threads; `None` uses the available parallelism.
    parallelism: Option<NonZeroUsize>,
    /// Maximum characters of fault text in the crash diagnostic.
    fault_message_limit: usize,
    /// Batch defaults, below scope markers.
    defaults: Marker,
    /// Link attached to the crash diagnostic.
    report_url: Option<EcoString>,
    /// Name of a specification whose pipeline panics, for exercising the
    /// fault boundary.
    #[cfg(test)]
    fault_on: Option<&'static str>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parallelism: None,
            fault_message_limit: DEFAULT_FAULT_MESSAGE_LIMIT,
            defaults: Marker::default(),
            report_url: default_report_url(),
            #[cfg(test)]
            fault_on: None,
        }
    }

    /// Sets the worker count. Zero means "use the available parallelism".
    #[must_use]
    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = NonZeroUsize::new(workers);
        self
    }

    /// Sets the fault text limit of the crash diagnostic.
    #[must_use]
    pub fn with_fault_message_limit(mut self, limit: usize) -> Self {
        self.fault_message_limit = limit;
        self
    }

    /// Sets the batch-wide default marker.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Marker) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets the link the crash diagnostic points at.
    #[must_use]
    pub fn with_report_url(mut self, url: impl Into<EcoString>) -> Self {
        self.report_url = Some(url.into());
        self
    }

    /// The configured fault text limit.
    #[must_use]
    pub fn fault_message_limit(&self) -> usize {
        self.fault_message_limit
    }

    /// The batch-wide default marker.
    #[must_use]
    pub fn defaults(&self) -> &Marker {
        &self.defaults
    }

    /// The link attached to the crash diagnostic, if any.
    #[must_use]
    pub fn report_url(&self) -> Option<&str> {
        self.report_url.as_deref()
    }

    fn worker_count(&self, jobs: usize) -> usize {
        let available = self
            .parallelism
            .or_else(|| std::thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get);
        available.min(jobs).max(1)
    }
}

/// Everything one batch produced.
#[derive(Debug, Default)]
pub struct GenerationOutput {
    /// Artifacts in declaration order.
    pub artifacts: Vec<Artifact>,
    /// Diagnostics: discovery and cycle warnings first, then per
    /// specification in declaration order, then any crash diagnostic.
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationOutput {
    /// Returns true if any error-severity diagnostic was produced.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == crate::diagnostics::Severity::Error)
    }
}

/// Runs the whole engine over one compilation unit.
///
/// Never panics: internal faults are reported as an
/// [`DiagnosticCode::InternalFault`] diagnostic.
#[must_use]
pub fn generate(unit: &CompilationUnit, options: &GeneratorOptions) -> GenerationOutput {
    let mut artifacts = Vec::new();
    let mut sink = DiagnosticSink::new();

    let fault = match catch_unwind(AssertUnwindSafe(|| {
        run_batch(unit, options, &mut artifacts, &mut sink)
    })) {
        Ok(fault) => fault,
        Err(payload) => Some(panic_message(payload.as_ref())),
    };
    if let Some(fault) = fault {
        tracing::warn!(fault = %fault, "mapping generator faulted");
        sink.report(Diagnostic::internal_fault(
            &fault,
            options.fault_message_limit,
            options.report_url(),
        ));
    }

    tracing::debug!(artifacts = artifacts.len(), "batch finished");
    GenerationOutput {
        artifacts,
        diagnostics: sink.into_diagnostics(),
    }
}

/// Immutable data shared by every per-specification pipeline.
struct Shared<'a> {
    callables: &'a Callables,
    cycles: &'a CycleReport,
    ctx: NullableContext,
    #[cfg(test)]
    fault_on: Option<&'static str>,
}

#[derive(Debug, Default)]
struct SpecOutput {
    artifacts: Vec<Artifact>,
    diagnostics: Vec<Diagnostic>,
}

/// Runs the batch; returns the fault text if a worker panicked.
fn run_batch(
    unit: &CompilationUnit,
    options: &GeneratorOptions,
    artifacts: &mut Vec<Artifact>,
    sink: &mut DiagnosticSink,
) -> Option<String> {
    let Discovery {
        specs,
        callables,
        diagnostics,
    } = discover(unit, &options.defaults);
    sink.extend(diagnostics);

    let graph = CallGraph::build(&callables);
    let cycles = CycleReport::detect(&graph);
    for spec in &specs {
        if let Some(unsafety) = cycles.unsafety(&spec.id) {
            sink.report(cycle_warning(spec, unsafety));
        }
    }

    let shared = Shared {
        callables: &callables,
        cycles: &cycles,
        ctx: unit.nullable,
        #[cfg(test)]
        fault_on: options.fault_on,
    };
    let workers = options.worker_count(specs.len());
    tracing::debug!(specs = specs.len(), workers, "running specification pipelines");

    let (outputs, fault) = run_specs(&specs, &shared, workers);
    for output in outputs {
        artifacts.extend(output.artifacts);
        sink.extend(output.diagnostics);
    }
    fault
}

/// Runs every specification on `workers` scoped threads and returns the
/// finished outputs in declaration order.
///
/// A panicking specification produces no output but never stops the others.
/// When several panic, the fault of the earliest one in declaration order is
/// returned, so the result does not depend on thread timing.
fn run_specs(
    specs: &[MappingSpec],
    shared: &Shared<'_>,
    workers: usize,
) -> (Vec<SpecOutput>, Option<String>) {
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, Result<SpecOutput, String>)>();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            scope.spawn(move || {
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(spec) = specs.get(index) else {
                        break;
                    };
                    let result = catch_unwind(AssertUnwindSafe(|| generate_spec(spec, shared)))
                        .map_err(|payload| panic_message(payload.as_ref()));
                    if let Err(fault) = &result {
                        tracing::warn!(spec = %spec.id, %fault, "specification pipeline panicked");
                    }
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(tx);

    let mut finished: Vec<(usize, Result<SpecOutput, String>)> = rx.into_iter().collect();
    finished.sort_by_key(|(index, _)| *index);

    let mut outputs = Vec::with_capacity(finished.len());
    let mut fault = None;
    for (_, result) in finished {
        match result {
            Ok(output) => outputs.push(output),
            Err(message) => {
                fault.get_or_insert(message);
            }
        }
    }
    (outputs, fault)
}

#[tracing::instrument(level = "debug", skip_all, fields(spec = %spec.id))]
fn generate_spec(spec: &MappingSpec, shared: &Shared<'_>) -> SpecOutput {
    #[cfg(test)]
    if shared.fault_on == Some(spec.name()) {
        panic!("injected fault in {}", spec.id);
    }

    let policy = spec.options.optional_chain;
    let inlined = Inliner::new(shared.callables, shared.cycles, policy).inline(&spec.body);
    let body = rewrite(&inlined, policy, shared.ctx);
    tracing::debug!(?policy, "body inlined and rewritten");

    let mut output = SpecOutput::default();
    if spec.options.expression {
        match expression_artifact(spec, &body, shared.ctx) {
            Ok(artifact) => output.artifacts.push(artifact),
            Err(err) => output.diagnostics.push(failure(spec, &err)),
        }
    }
    if spec.options.update && !shared.cycles.is_unsafe(&spec.id) {
        match plan_update(spec, &body, shared.ctx) {
            Ok(plan) => output
                .artifacts
                .push(update_artifact(spec, &plan, shared.ctx)),
            Err(err) => output.diagnostics.push(failure(spec, &err)),
        }
    }
    output
}

fn failure(spec: &MappingSpec, err: &CodeGenError) -> Diagnostic {
    Diagnostic::new(err.code(), err.to_string(), spec.span).for_spec(&spec.id)
}

fn cycle_warning(spec: &MappingSpec, unsafety: &Unsafety) -> Diagnostic {
    let message = match unsafety {
        Unsafety::OnCycle(members) => {
            let members = members
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            format!(
                "'{}' is part of a call cycle ({members}); calls on the cycle are not inlined \
                 and no update form is generated",
                spec.id
            )
        }
        Unsafety::DependsOn(callee) => format!(
            "'{}' calls '{callee}', which leads into a call cycle; that call is not inlined \
             and no update form is generated",
            spec.id
        ),
    };
    Diagnostic::new(DiagnosticCode::CallCycle, message, spec.span).for_spec(&spec.id)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CallableId, Expr, MemberInit, TypeRef};
    use crate::codegen::ArtifactKind;
    use crate::span::Span;
    use crate::unit::{MethodBody, MethodDecl, Param, ScopeDecl};

    fn source_ty() -> TypeRef {
        TypeRef::reference("Source")
    }

    fn method(name: &str, body: Expr, marker: Option<Marker>) -> MethodDecl {
        MethodDecl {
            name: name.into(),
            parameters: vec![Param::new("source", source_ty())],
            return_type: TypeRef::reference("Dest"),
            body: MethodBody::Expression(body),
            marker,
            span: Span::default(),
        }
    }

    fn name_body() -> Expr {
        Expr::new_object(
            TypeRef::reference("Dest"),
            vec![MemberInit::new(
                "Name",
                TypeRef::string(),
                Expr::member(
                    Expr::parameter("source", source_ty()),
                    "Name",
                    TypeRef::string(),
                ),
            )],
        )
    }

    fn both_forms() -> Option<Marker> {
        Some(Marker {
            update: Some(true),
            ..Marker::default()
        })
    }

    fn unit(methods: Vec<MethodDecl>) -> CompilationUnit {
        CompilationUnit {
            scopes: vec![ScopeDecl {
                namespace: None,
                name: "Mappers".into(),
                is_static: true,
                marker: None,
                methods,
                span: Span::default(),
            }],
            ..CompilationUnit::default()
        }
    }

    #[test]
    fn artifacts_follow_declaration_order() {
        let unit = unit(vec![
            method("Zeta", name_body(), both_forms()),
            method("Alpha", name_body(), both_forms()),
            method("Mid", name_body(), both_forms()),
        ]);
        let output = generate(&unit, &GeneratorOptions::new().with_parallelism(3));
        let names: Vec<_> = output.artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Mappers.Zeta.Expression.g.cs",
                "Mappers.Zeta.Update.g.cs",
                "Mappers.Alpha.Expression.g.cs",
                "Mappers.Alpha.Update.g.cs",
                "Mappers.Mid.Expression.g.cs",
                "Mappers.Mid.Update.g.cs",
            ]
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn output_is_identical_across_worker_counts() {
        let unit = unit(
            (0..12)
                .map(|i| method(&format!("Map{i}"), name_body(), both_forms()))
                .collect(),
        );
        let one = generate(&unit, &GeneratorOptions::new().with_parallelism(1));
        let many = generate(&unit, &GeneratorOptions::new().with_parallelism(8));
        assert_eq!(one.artifacts, many.artifacts);
        assert_eq!(one.diagnostics, many.diagnostics);
    }

    #[test]
    fn one_failure_does_not_abort_the_batch() {
        let empty = Expr::new_object(TypeRef::reference("Dest"), vec![]);
        let unit = unit(vec![
            method("Empty", empty, both_forms()),
            method("Good", name_body(), both_forms()),
        ]);
        let output = generate(&unit, &GeneratorOptions::new());
        assert_eq!(output.artifacts.len(), 3);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::NothingToUpdate);
        assert_eq!(
            output.diagnostics[0].spec,
            Some(CallableId::new("Mappers", "Empty", &[source_ty()]))
        );
    }

    #[test]
    fn self_recursive_spec_gets_one_warning_and_no_update() {
        let id = CallableId::new("Mappers", "Loop", &[source_ty()]);
        let body = Expr::new_object(
            TypeRef::reference("Dest"),
            vec![MemberInit::new(
                "Next",
                TypeRef::reference("Dest"),
                Expr::call(
                    id,
                    vec![Expr::parameter("source", source_ty())],
                    TypeRef::reference("Dest"),
                ),
            )],
        );
        let unit = unit(vec![method("Loop", body, both_forms())]);
        let output = generate(&unit, &GeneratorOptions::new());
        let kinds: Vec<_> = output.artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ArtifactKind::Expression]);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::CallCycle);
        assert!(output.artifacts[0].text.contains("Next = Mappers.Loop(source)"));
    }

    #[test]
    fn panics_become_one_crash_diagnostic() {
        let unit = unit(vec![
            method("First", name_body(), None),
            method("Boom", name_body(), Some(Marker::default())),
        ]);
        let mut options = GeneratorOptions::new()
            .with_parallelism(1)
            .with_fault_message_limit(10);
        options.fault_on = Some("Boom");
        let output = generate(&unit, &options);
        let crashes: Vec<_> = output
            .diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::InternalFault)
            .collect();
        assert_eq!(crashes.len(), 1);
        assert!(crashes[0].message.ends_with("..."));
        assert!(output.has_errors());
    }

    #[test]
    fn finished_artifacts_survive_a_fault() {
        let unit = unit(vec![
            method("Good", name_body(), Some(Marker::default())),
            method("Boom", name_body(), Some(Marker::default())),
        ]);
        let mut options = GeneratorOptions::new().with_parallelism(1);
        options.fault_on = Some("Boom");
        let output = generate(&unit, &options);
        assert_eq!(output.artifacts.len(), 1);
        assert_eq!(output.artifacts[0].name, "Mappers.Good.Expression.g.cs");
    }

    #[test]
    fn an_early_fault_leaves_every_other_spec_generated() {
        let unit = unit(
            (0..48)
                .map(|i| {
                    let name = if i == 3 { "Boom".to_string() } else { format!("Map{i}") };
                    method(&name, name_body(), Some(Marker::default()))
                })
                .collect(),
        );
        let mut options = GeneratorOptions::new()
            .with_parallelism(8)
            .with_report_url("https://git.example.org/mapforge/issues");
        options.fault_on = Some("Boom");

        let first = generate(&unit, &options);
        assert_eq!(first.artifacts.len(), 47);
        assert!(
            first
                .artifacts
                .iter()
                .all(|a| a.name != "Mappers.Boom.Expression.g.cs")
        );
        assert_eq!(first.diagnostics.len(), 1);
        assert_eq!(first.diagnostics[0].code, DiagnosticCode::InternalFault);
        assert_eq!(
            first.diagnostics[0].hint.as_deref(),
            Some("https://git.example.org/mapforge/issues")
        );

        for _ in 0..20 {
            let again = generate(&unit, &options);
            assert_eq!(first.artifacts, again.artifacts);
            assert_eq!(first.diagnostics, again.diagnostics);
        }
    }

    #[test]
    fn worker_count_is_bounded_by_jobs() {
        let options = GeneratorOptions::new().with_parallelism(16);
        assert_eq!(options.worker_count(3), 3);
        assert_eq!(options.worker_count(0), 1);
        assert!(GeneratorOptions::new().worker_count(4) >= 1);
    }
}
