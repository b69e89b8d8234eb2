// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Cycle detection over the [`CallGraph`].
//!
//! **Stage:** batch barrier.
//!
//! Strongly connected components are found with an iterative Tarjan walk so
//! deep helper chains cannot overflow the stack. A callable is:
//!
//! - **cyclic** when its component has more than one member, or it calls
//!   itself directly;
//! - **tainted** when it is not cyclic but its body calls, directly or
//!   transitively, a cyclic callable.
//!
//! Both are *unsafe*: the inliner never expands them, and update forms are not
//! generated for specifications that are unsafe. Everything else is safe, and
//! the graph restricted to safe callables is acyclic by construction.

use super::call_graph::CallGraph;
use crate::ast::CallableId;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Why a callable is unsafe to expand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unsafety {
    /// The callable lies on a cycle; the members of its component, sorted.
    OnCycle(Vec<CallableId>),
    /// The callable calls this unsafe callee.
    DependsOn(CallableId),
}

/// The outcome of cycle detection for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    unsafe_callables: BTreeMap<CallableId, Unsafety>,
}

impl CycleReport {
    /// Runs detection over `graph`. Total: never panics, always terminates.
    #[must_use]
    pub fn detect(graph: &CallGraph) -> Self {
        let mut unsafe_callables = BTreeMap::new();

        for component in strongly_connected_components(graph) {
            let is_cycle = match component.as_slice() {
                [single] => graph.callees(single).contains(single),
                _ => true,
            };
            if !is_cycle {
                continue;
            }
            let mut members: Vec<CallableId> = component.into_iter().cloned().collect();
            members.sort();
            for member in &members {
                unsafe_callables.insert(member.clone(), Unsafety::OnCycle(members.clone()));
            }
        }

        // Walk callers backwards from every cyclic callable.
        let callers = graph.callers();
        let mut queue: VecDeque<CallableId> = unsafe_callables.keys().cloned().collect();
        while let Some(node) = queue.pop_front() {
            for caller in callers.get(&node).into_iter().flatten() {
                if !unsafe_callables.contains_key(*caller) {
                    unsafe_callables.insert((*caller).clone(), Unsafety::DependsOn(node.clone()));
                    queue.push_back((*caller).clone());
                }
            }
        }

        if !unsafe_callables.is_empty() {
            tracing::debug!(count = unsafe_callables.len(), "unsafe callables found");
        }
        Self { unsafe_callables }
    }

    /// Returns true if `id` must not be inlined or expanded.
    #[must_use]
    pub fn is_unsafe(&self, id: &CallableId) -> bool {
        self.unsafe_callables.contains_key(id)
    }

    /// Returns why `id` is unsafe, if it is.
    #[must_use]
    pub fn unsafety(&self, id: &CallableId) -> Option<&Unsafety> {
        self.unsafe_callables.get(id)
    }

    /// Iterates unsafe callables in identity order.
    pub fn unsafe_callables(&self) -> impl Iterator<Item = (&CallableId, &Unsafety)> {
        self.unsafe_callables.iter()
    }
}

/// Tarjan's algorithm, iterative. Components come out in reverse
/// topological order; nodes are visited in identity order.
fn strongly_connected_components(graph: &CallGraph) -> Vec<Vec<&CallableId>> {
    let mut next_index = 0usize;
    let mut index: HashMap<&CallableId, usize> = HashMap::new();
    let mut lowlink: HashMap<&CallableId, usize> = HashMap::new();
    let mut on_stack: HashSet<&CallableId> = HashSet::new();
    let mut stack: Vec<&CallableId> = Vec::new();
    let mut components = Vec::new();

    for root in graph.nodes() {
        if index.contains_key(root) {
            continue;
        }
        // (node, position of the next callee to visit)
        let mut work: Vec<(&CallableId, usize)> = vec![(root, 0)];
        index.insert(root, next_index);
        lowlink.insert(root, next_index);
        next_index += 1;
        stack.push(root);
        on_stack.insert(root);

        while let Some(frame) = work.last_mut() {
            let node = frame.0;
            let callees = graph.callees(node);
            if let Some(callee) = callees.get(frame.1) {
                frame.1 += 1;
                if let Some(&callee_index) = index.get(callee) {
                    if on_stack.contains(callee) {
                        let low = lowlink[node].min(callee_index);
                        lowlink.insert(node, low);
                    }
                } else {
                    index.insert(callee, next_index);
                    lowlink.insert(callee, next_index);
                    next_index += 1;
                    stack.push(callee);
                    on_stack.insert(callee);
                    work.push((callee, 0));
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                let low = lowlink[parent].min(lowlink[node]);
                lowlink.insert(parent, low);
            }
            if lowlink[node] == index[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack.remove(member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }
    components
}
