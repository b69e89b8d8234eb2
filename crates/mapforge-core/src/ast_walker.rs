// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Shared expression walker for read-only analyses.
//!
//! Provides three functions used by the call-graph builder, the classifier,
//! the inliner and the optional-chain checks:
//!
//! - [`walk_expression`] - pre-order recursive walk of an expression tree,
//!   calling a visitor closure on every node.
//! - [`for_each_child`] - visits only the direct children of one node, for
//!   passes that track scoping themselves.
//! - [`any_expression`] - short-circuiting search for a node matching a
//!   predicate.
//!
//! Passes that rebuild the tree (inlining, optional-chain rewriting) keep
//! their own recursion since they need to return new nodes.

use crate::ast::Expr;

/// Recursively walks an expression tree in pre-order, calling `f` on every node.
///
/// The visitor is called on the current node **before** recursing into its
/// children. Children are visited in source order.
pub fn walk_expression<F>(expr: &Expr, f: &mut F)
where
    F: FnMut(&Expr),
{
    f(expr);
    for_each_child(expr, |child| walk_expression(child, f));
}

/// Calls `f` on each direct child of `expr`, in source order.
pub fn for_each_child<'a, F>(expr: &'a Expr, mut f: F)
where
    F: FnMut(&'a Expr),
{
    match expr {
        Expr::Member { receiver, .. } => f(receiver),
        Expr::Call {
            receiver,
            arguments,
            ..
        } => {
            if let Some(receiver) = receiver {
                f(receiver);
            }
            arguments.iter().for_each(f);
        }
        Expr::New {
            arguments,
            initializers,
            ..
        } => {
            arguments.iter().for_each(&mut f);
            for init in initializers {
                f(&init.value);
            }
        }
        Expr::Conditional {
            condition,
            when_true,
            when_false,
            ..
        } => {
            f(condition);
            f(when_true);
            f(when_false);
        }
        Expr::Coalesce { left, right, .. } | Expr::Binary { left, right, .. } => {
            f(left);
            f(right);
        }
        Expr::Throw { exception, .. } => f(exception),
        Expr::Projection {
            source, transform, ..
        } => {
            f(source);
            f(transform);
        }
        Expr::OptionalGuard { receiver, body, .. } => {
            f(receiver);
            f(body);
        }
        // Leaf nodes, nothing to visit.
        Expr::Literal { .. } | Expr::Parameter { .. } => {}
    }
}

/// Returns true if any node in the tree satisfies `predicate`.
pub fn any_expression<P>(expr: &Expr, mut predicate: P) -> bool
where
    P: FnMut(&Expr) -> bool,
{
    let mut found = false;
    walk_expression(expr, &mut |node| {
        if !found && predicate(node) {
            found = true;
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, MemberInit, TypeRef};

    fn sample() -> Expr {
        let s = Expr::parameter("s", TypeRef::reference("S"));
        Expr::new_object(
            TypeRef::reference("D"),
            vec![
                MemberInit::new(
                    "Name",
                    TypeRef::string(),
                    Expr::binary(
                        BinaryOp::Add,
                        Expr::member(s.clone(), "First", TypeRef::string()),
                        Expr::string(" "),
                        TypeRef::string(),
                    ),
                ),
                MemberInit::new(
                    "City",
                    TypeRef::string(),
                    Expr::optional_member(
                        Expr::member(s, "Address", TypeRef::reference("A")),
                        "City",
                        TypeRef::string(),
                    ),
                ),
            ],
        )
    }

    #[test]
    fn visits_every_node_in_pre_order() {
        let mut kinds = Vec::new();
        walk_expression(&sample(), &mut |e| {
            kinds.push(match e {
                Expr::New { .. } => "new",
                Expr::Binary { .. } => "binary",
                Expr::Member { .. } => "member",
                Expr::Parameter { .. } => "param",
                Expr::Literal { .. } => "lit",
                _ => "other",
            });
        });
        assert_eq!(
            kinds,
            vec![
                "new", "binary", "member", "param", "lit", "member", "member", "param"
            ]
        );
    }

    #[test]
    fn any_expression_finds_optional_links() {
        assert!(any_expression(&sample(), Expr::is_optional_link));
        assert!(!any_expression(&sample(), Expr::is_throw));
    }
}
