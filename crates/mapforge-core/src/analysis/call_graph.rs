// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Call graph over the batch's single-expression callables.
//!
//! **Stage:** batch barrier. Built once before any specification is
//! transformed, read-only afterwards.
//!
//! The graph is an adjacency index from [`CallableId`] to the callees its
//! body invokes. Only calls that the inliner could expand produce edges:
//! static and extension-style calls whose target is a known callable.
//! Instance calls are never inlined, so they never make a cycle dangerous.

use crate::ast::{CallStyle, CallableId, Expr};
use crate::ast_walker::walk_expression;
use crate::spec::Callables;
use std::collections::BTreeMap;

/// Directed graph: "A's body contains an invocation of B".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    edges: BTreeMap<CallableId, Vec<CallableId>>,
}

impl CallGraph {
    /// Builds the graph from every known callable. Mapping specifications
    /// are callables too, so their bodies are scanned here as well.
    #[must_use]
    pub fn build(callables: &Callables) -> Self {
        let mut edges = BTreeMap::new();
        for callable in callables.iter() {
            edges.insert(
                callable.id.clone(),
                outgoing_calls(&callable.body, callables),
            );
        }
        let graph = Self { edges };
        tracing::debug!(
            nodes = graph.edges.len(),
            edges = graph.edge_count(),
            "call graph built"
        );
        graph
    }

    /// Builds a graph directly from an adjacency list.
    #[must_use]
    pub fn from_edges(edges: impl IntoIterator<Item = (CallableId, Vec<CallableId>)>) -> Self {
        let mut map: BTreeMap<CallableId, Vec<CallableId>> = BTreeMap::new();
        for (caller, callees) in edges {
            for callee in &callees {
                map.entry(callee.clone()).or_default();
            }
            map.entry(caller).or_default().extend(callees);
        }
        Self { edges: map }
    }

    /// The callees invoked by `id`, in first-call order.
    #[must_use]
    pub fn callees(&self, id: &CallableId) -> &[CallableId] {
        self.edges.get(id).map_or(&[], Vec::as_slice)
    }

    /// All nodes in identity order.
    pub fn nodes(&self) -> impl Iterator<Item = &CallableId> {
        self.edges.keys()
    }

    /// Total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Returns the reverse adjacency (callee to callers), in identity order.
    #[must_use]
    pub fn callers(&self) -> BTreeMap<&CallableId, Vec<&CallableId>> {
        let mut reverse: BTreeMap<&CallableId, Vec<&CallableId>> = BTreeMap::new();
        for (caller, callees) in &self.edges {
            reverse.entry(caller).or_default();
            for callee in callees {
                reverse.entry(callee).or_default().push(caller);
            }
        }
        reverse
    }
}

/// Collects the distinct known callables invoked by `body`, in first-call
/// order.
#[must_use]
pub fn outgoing_calls(body: &Expr, callables: &Callables) -> Vec<CallableId> {
    let mut calls: Vec<CallableId> = Vec::new();
    walk_expression(body, &mut |expr| {
        if let Expr::Call { target, style, .. } = expr
            && *style != CallStyle::Instance
            && callables.contains(target)
            && !calls.contains(target)
        {
            calls.push(target.clone());
        }
    });
    calls
}
