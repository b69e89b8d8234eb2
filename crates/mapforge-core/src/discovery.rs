// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Discovery of mapping specifications in a compilation unit.
//!
//! Walks every scope in declaration order and:
//!
//! - registers each single-expression method as an inlinable [`Callable`],
//! - turns each marked method into a [`MappingSpec`], layering the method
//!   marker over the scope marker over the configured defaults,
//! - in a marked scope, also turns each unmarked single-expression,
//!   single-parameter method into a [`MappingSpec`],
//! - reports marked methods that cannot be specifications.

use crate::ast::{CallableId, TypeRef};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::spec::{Callable, Callables, MappingSpec, ScopeInfo, SpecOptions};
use crate::unit::{CompilationUnit, Marker, MethodDecl, ScopeDecl};

/// Result of discovery over one compilation unit.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Specifications in declaration order.
    pub specs: Vec<MappingSpec>,
    /// Every single-expression method in the unit.
    pub callables: Callables,
    /// Problems with marked methods.
    pub diagnostics: Vec<Diagnostic>,
}

/// Discovers specifications and callables in `unit`.
///
/// `defaults` is the batch-wide marker from configuration; it sits below
/// scope markers and above the built-in defaults.
#[must_use]
pub fn discover(unit: &CompilationUnit, defaults: &Marker) -> Discovery {
    let mut discovery = Discovery::default();
    for scope in &unit.scopes {
        discover_scope(scope, defaults, &mut discovery);
    }
    tracing::debug!(
        specs = discovery.specs.len(),
        callables = discovery.callables.len(),
        "discovery finished"
    );
    discovery
}

fn discover_scope(scope: &ScopeDecl, defaults: &Marker, discovery: &mut Discovery) {
    let info = ScopeInfo {
        namespace: scope.namespace.clone(),
        name: scope.name.clone(),
        is_static: scope.is_static,
    };
    let scope_marker = scope.marker.unwrap_or_default().or(defaults);

    for method in &scope.methods {
        let parameter_types: Vec<TypeRef> =
            method.parameters.iter().map(|p| p.ty.clone()).collect();
        let id = CallableId::new(scope.name.clone(), method.name.clone(), &parameter_types);

        if let Some(body) = method.body.expression() {
            discovery.callables.insert(Callable {
                id: id.clone(),
                parameters: method.parameters.clone(),
                body: body.clone(),
            });
        }

        let marker = match (method.marker, scope.marker) {
            (Some(marker), _) => marker,
            (None, Some(_)) if is_spec_shaped(method) => Marker::default(),
            _ => continue,
        };

        let Some(body) = method.body.expression() else {
            discovery.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::UnsupportedBody,
                    format!(
                        "'{id}' is marked for generation but its body is not a single expression"
                    ),
                    method.span,
                )
                .for_spec(&id)
                .with_hint("rewrite the method as `=> expression`"),
            );
            continue;
        };

        let [parameter] = method.parameters.as_slice() else {
            discovery.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::UnsupportedSignature,
                    format!(
                        "'{id}' must take exactly one source parameter, found {}",
                        method.parameters.len()
                    ),
                    method.span,
                )
                .for_spec(&id),
            );
            continue;
        };

        let options = SpecOptions::from_marker(&marker.or(&scope_marker));
        discovery.specs.push(MappingSpec {
            id,
            scope: info.clone(),
            parameter: parameter.clone(),
            return_type: method.return_type.clone(),
            body: body.clone(),
            options,
            span: method.span,
        });
    }
}

/// Unmarked methods in a marked scope that do not fit are left as helpers.
fn is_spec_shaped(method: &MethodDecl) -> bool {
    method.body.expression().is_some() && method.parameters.len() == 1
}
