// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Tree-rebuilding passes applied to each specification body.
//!
//! **Stage:** per specification, in order:
//!
//! 1. [`inline`] replaces calls to safe single-expression callables with
//!    their bodies.
//! 2. [`optional_chain`] resolves optional chains according to the
//!    specification's policy.
//!
//! Both passes return new trees; the discovered body is never modified.

pub mod inline;
pub mod optional_chain;

pub use inline::Inliner;
pub use optional_chain::{contains_optional_chain, rewrite};

use crate::ast::{Expr, MemberInit};

/// Rebuilds `expr` with `f` applied to each direct child, keeping the node
/// itself (flags, names, types) unchanged.
pub(crate) fn map_children<F>(expr: &Expr, mut f: F) -> Expr
where
    F: FnMut(&Expr) -> Expr,
{
    match expr {
        Expr::Literal { .. } | Expr::Parameter { .. } => expr.clone(),
        Expr::Member {
            receiver,
            member,
            optional,
            ty,
        } => Expr::Member {
            receiver: Box::new(f(receiver)),
            member: member.clone(),
            optional: *optional,
            ty: ty.clone(),
        },
        Expr::Call {
            target,
            style,
            receiver,
            arguments,
            optional,
            ty,
        } => Expr::Call {
            target: target.clone(),
            style: *style,
            receiver: receiver.as_deref().map(|r| Box::new(f(r))),
            arguments: arguments.iter().map(&mut f).collect(),
            optional: *optional,
            ty: ty.clone(),
        },
        Expr::New {
            ty,
            arguments,
            initializers,
        } => Expr::New {
            ty: ty.clone(),
            arguments: arguments.iter().map(&mut f).collect(),
            initializers: initializers
                .iter()
                .map(|init| MemberInit {
                    member: init.member.clone(),
                    member_ty: init.member_ty.clone(),
                    value: f(&init.value),
                })
                .collect(),
        },
        Expr::Conditional {
            condition,
            when_true,
            when_false,
            ty,
        } => Expr::conditional(f(condition), f(when_true), f(when_false), ty.clone()),
        Expr::Coalesce { left, right, ty } => Expr::coalesce(f(left), f(right), ty.clone()),
        Expr::Binary {
            op,
            left,
            right,
            ty,
        } => Expr::binary(*op, f(left), f(right), ty.clone()),
        Expr::Throw { exception, ty } => Expr::throw(f(exception), ty.clone()),
        Expr::Projection {
            source,
            element,
            transform,
            materialize,
            ty,
        } => Expr::Projection {
            source: Box::new(f(source)),
            element: element.clone(),
            transform: Box::new(f(transform)),
            materialize: materialize.clone(),
            ty: ty.clone(),
        },
        Expr::OptionalGuard { receiver, body, ty } => Expr::OptionalGuard {
            receiver: Box::new(f(receiver)),
            body: Box::new(f(body)),
            ty: ty.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeRef;

    #[test]
    fn map_children_is_shallow() {
        let s = Expr::parameter("s", TypeRef::reference("S"));
        let outer = Expr::member(
            Expr::member(s, "A", TypeRef::reference("A")),
            "B",
            TypeRef::string(),
        );
        let mut visited = 0;
        let rebuilt = map_children(&outer, |child| {
            visited += 1;
            child.clone()
        });
        assert_eq!(visited, 1);
        assert_eq!(rebuilt, outer);
    }
}
