// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Call inlining.
//!
//! A call is expanded when its target is a known single-expression callable
//! that is safe according to the batch [`CycleReport`], the call is not an
//! instance call, and the number of actual arguments (the receiver of an
//! extension call counts as the first) matches the callee's parameters.
//!
//! The callee body is inlined first and then instantiated by structural
//! substitution: every reference to a formal parameter is replaced by the
//! whole argument expression. Because only safe callees are expanded and the
//! safe part of the graph is acyclic, expansion terminates.
//!
//! A call at the tail of an optional chain (`x?.Helper()`) expands to an
//! [`Expr::OptionalGuard`] holding `x` and the instantiated body, which the
//! optional-chain rewriter resolves afterwards. Under
//! [`OptionalChainPolicy::None`] such calls are left alone.
//!
//! ```text
//! Combine(a, b) => a + " " + b
//! Combine(p.First, p.Last)   ==>   p.First + " " + p.Last
//! ```

use super::map_children;
use crate::analysis::CycleReport;
use crate::ast::{CallStyle, CallableId, Expr};
use crate::ast_walker::{for_each_child, walk_expression};
use crate::spec::Callables;
use crate::unit::OptionalChainPolicy;
use ecow::{EcoString, eco_format};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

/// Expands calls to safe callables inside one specification body.
///
/// An inliner is cheap to build and is meant to live for one specification;
/// it caches fully inlined callee bodies for that specification only.
#[derive(Debug)]
pub struct Inliner<'a> {
    callables: &'a Callables,
    cycles: &'a CycleReport,
    policy: OptionalChainPolicy,
    expanded: RefCell<HashMap<CallableId, Expr>>,
}

impl<'a> Inliner<'a> {
    /// Creates an inliner for a specification with the given optional-chain
    /// policy.
    #[must_use]
    pub fn new(
        callables: &'a Callables,
        cycles: &'a CycleReport,
        policy: OptionalChainPolicy,
    ) -> Self {
        Self {
            callables,
            cycles,
            policy,
            expanded: RefCell::new(HashMap::new()),
        }
    }

    /// Returns `expr` with every eligible call expanded, bottom-up.
    #[must_use]
    pub fn inline(&self, expr: &Expr) -> Expr {
        let rebuilt = map_children(expr, |child| self.inline(child));
        self.expand(&rebuilt).unwrap_or(rebuilt)
    }

    fn expand(&self, call: &Expr) -> Option<Expr> {
        let Expr::Call {
            target,
            style,
            receiver,
            arguments,
            optional,
            ty,
        } = call
        else {
            return None;
        };
        if *style == CallStyle::Instance || self.cycles.is_unsafe(target) {
            return None;
        }
        if *optional && self.policy == OptionalChainPolicy::None {
            return None;
        }
        let callee = self.callables.get(target)?;
        let actuals: Vec<&Expr> = receiver.as_deref().into_iter().chain(arguments).collect();
        if actuals.len() != callee.parameters.len() {
            tracing::trace!(callee = %target, "arity mismatch, call kept");
            return None;
        }

        let body = self.inlined_body(target, &callee.body);
        let bindings: HashMap<EcoString, Expr> = callee
            .parameters
            .iter()
            .zip(actuals)
            .map(|(param, actual)| (param.name.clone(), actual.clone()))
            .collect();
        let instantiated = substitute(&body, &bindings);
        tracing::trace!(callee = %target, optional = *optional, "inlined call");

        if *optional {
            let receiver = receiver.as_deref()?;
            return Some(Expr::OptionalGuard {
                receiver: Box::new(receiver.clone()),
                body: Box::new(instantiated),
                ty: ty.clone(),
            });
        }
        Some(instantiated)
    }

    fn inlined_body(&self, id: &CallableId, body: &Expr) -> Expr {
        if let Some(cached) = self.expanded.borrow().get(id) {
            return cached.clone();
        }
        let inlined = self.inline(body);
        self.expanded
            .borrow_mut()
            .insert(id.clone(), inlined.clone());
        inlined
    }
}

/// Replaces free references to the bound parameters with their arguments.
fn substitute(expr: &Expr, bindings: &HashMap<EcoString, Expr>) -> Expr {
    if bindings.is_empty() {
        return expr.clone();
    }
    match expr {
        Expr::Parameter { name, .. } => bindings.get(name).cloned().unwrap_or_else(|| expr.clone()),
        Expr::Projection {
            source,
            element,
            transform,
            materialize,
            ty,
        } => {
            let source = substitute(source, bindings);
            let mut inner = bindings.clone();
            inner.remove(element);

            let captures = inner
                .values()
                .any(|arg| free_parameters(arg).contains(element));
            let (element, transform) = if captures {
                let mut avoid = names_in(transform);
                for arg in inner.values() {
                    avoid.extend(free_parameters(arg));
                }
                let fresh = fresh_name(element, &avoid);
                let renamed = rename(transform, element, &fresh);
                (fresh, renamed)
            } else {
                (element.clone(), (**transform).clone())
            };

            Expr::Projection {
                source: Box::new(source),
                transform: Box::new(substitute(&transform, &inner)),
                element,
                materialize: materialize.clone(),
                ty: ty.clone(),
            }
        }
        _ => map_children(expr, |child| substitute(child, bindings)),
    }
}

/// Renames free references to `from` as `to`.
fn rename(expr: &Expr, from: &str, to: &EcoString) -> Expr {
    match expr {
        Expr::Parameter { name, ty } if name == from => Expr::parameter(to.clone(), ty.clone()),
        Expr::Projection {
            source,
            element,
            transform,
            materialize,
            ty,
        } if element == from => Expr::Projection {
            source: Box::new(rename(source, from, to)),
            element: element.clone(),
            transform: transform.clone(),
            materialize: materialize.clone(),
            ty: ty.clone(),
        },
        _ => map_children(expr, |child| rename(child, from, to)),
    }
}

/// Parameter names referenced by `expr` and not bound by a projection
/// inside it.
fn free_parameters(expr: &Expr) -> BTreeSet<EcoString> {
    fn collect(expr: &Expr, bound: &mut Vec<EcoString>, free: &mut BTreeSet<EcoString>) {
        match expr {
            Expr::Parameter { name, .. } => {
                if !bound.contains(name) {
                    free.insert(name.clone());
                }
            }
            Expr::Projection {
                source,
                element,
                transform,
                ..
            } => {
                collect(source, bound, free);
                bound.push(element.clone());
                collect(transform, bound, free);
                bound.pop();
            }
            _ => for_each_child(expr, |child| collect(child, bound, free)),
        }
    }

    let mut free = BTreeSet::new();
    collect(expr, &mut Vec::new(), &mut free);
    free
}

/// Every parameter name and projection element appearing in `expr`.
fn names_in(expr: &Expr) -> BTreeSet<EcoString> {
    let mut names = BTreeSet::new();
    walk_expression(expr, &mut |node| match node {
        Expr::Parameter { name, .. } => {
            names.insert(name.clone());
        }
        Expr::Projection { element, .. } => {
            names.insert(element.clone());
        }
        _ => {}
    });
    names
}

fn fresh_name(base: &str, avoid: &BTreeSet<EcoString>) -> EcoString {
    (1u32..)
        .map(|n| eco_format!("{base}{n}"))
        .find(|candidate| !avoid.contains(candidate))
        .unwrap_or_else(|| EcoString::from(base))
}
