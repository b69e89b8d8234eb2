// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Discovered mapping specifications and the table of inlinable callables.

use crate::ast::{CallableId, Expr, TypeRef};
use crate::span::Span;
use crate::unit::{CollectionPolicy, Marker, OptionalChainPolicy, Param};
use ecow::EcoString;
use std::collections::BTreeMap;

/// Resolved generation options for one specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecOptions {
    /// Generate the expression form.
    pub expression: bool,
    /// Generate the update form.
    pub update: bool,
    /// Optional-chain policy.
    pub optional_chain: OptionalChainPolicy,
    /// Collection policy.
    pub collections: CollectionPolicy,
}

impl SpecOptions {
    /// Resolves a fully layered marker, applying built-in defaults for any
    /// field still unset: expression form on, update form off.
    #[must_use]
    pub fn from_marker(marker: &Marker) -> Self {
        Self {
            expression: marker.expression.unwrap_or(true),
            update: marker.update.unwrap_or(false),
            optional_chain: marker.optional_chain.unwrap_or_default(),
            collections: marker.collections.unwrap_or_default(),
        }
    }
}

/// The containing scope of a specification, as needed to emit a `partial`
/// augmentation of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeInfo {
    /// Enclosing namespace, if any.
    pub namespace: Option<EcoString>,
    /// Scope name.
    pub name: EcoString,
    /// Whether the scope is `static`.
    pub is_static: bool,
}

/// A mapping specification: a marked single-expression method taking one
/// source parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingSpec {
    /// Callable identity.
    pub id: CallableId,
    /// Containing scope.
    pub scope: ScopeInfo,
    /// The source parameter.
    pub parameter: Param,
    /// Declared return (destination) type.
    pub return_type: TypeRef,
    /// The typed body expression.
    pub body: Expr,
    /// Resolved generation options.
    pub options: SpecOptions,
    /// Declaration location.
    pub span: Span,
}

impl MappingSpec {
    /// The method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.id.name
    }
}

/// A method whose single-expression body can be inlined at call sites.
#[derive(Debug, Clone, PartialEq)]
pub struct Callable {
    /// Callable identity.
    pub id: CallableId,
    /// Formal parameters in order.
    pub parameters: Vec<Param>,
    /// The body expression.
    pub body: Expr,
}

/// All single-expression callables known to the batch, keyed by identity.
///
/// Ordered so that every traversal over the table is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Callables {
    by_id: BTreeMap<CallableId, Callable>,
}

impl Callables {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callable. A later registration with the same identity
    /// replaces the earlier one.
    pub fn insert(&mut self, callable: Callable) {
        self.by_id.insert(callable.id.clone(), callable);
    }

    /// Looks up a callable by identity.
    #[must_use]
    pub fn get(&self, id: &CallableId) -> Option<&Callable> {
        self.by_id.get(id)
    }

    /// Returns true if `id` is a known callable.
    #[must_use]
    pub fn contains(&self, id: &CallableId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Iterates callables in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &Callable> {
        self.by_id.values()
    }

    /// Number of known callables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if no callables are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
