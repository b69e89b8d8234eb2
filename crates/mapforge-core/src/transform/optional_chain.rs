// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Optional-chain resolution.
//!
//! An optional chain is a run of member accesses, calls, projections and
//! inlined guards linked through their receivers, where at least one link is
//! optional (`a?.B`). The three policies:
//!
//! - [`OptionalChainPolicy::None`] leaves the tree untouched.
//! - [`OptionalChainPolicy::Ignore`] turns every optional link into a plain
//!   one; guards collapse to their body. `??` is kept.
//! - [`OptionalChainPolicy::Rewrite`] expands every optional link into an
//!   explicit null test, outermost receiver first:
//!
//! ```text
//! a?.B?.C   ==>   a != null ? (a.B != null ? a.B.C : (T?)null) : (T?)null
//! ```
//!
//! The `null` branches are typed with the chain's lifted type so both arms
//! of every ternary agree. The result contains no optional links, so a
//! second rewrite is the identity.

use super::map_children;
use crate::ast::{Expr, Literal, NullableContext, TypeRef};
use crate::ast_walker::any_expression;
use crate::unit::OptionalChainPolicy;

/// Resolves the optional chains in `expr` according to `policy`.
#[must_use]
pub fn rewrite(expr: &Expr, policy: OptionalChainPolicy, ctx: NullableContext) -> Expr {
    match policy {
        OptionalChainPolicy::None => expr.clone(),
        OptionalChainPolicy::Ignore => strip(expr),
        OptionalChainPolicy::Rewrite => Rewriter { ctx }.rewrite(expr),
    }
}

/// Returns true if `expr` still contains an optional link or guard.
#[must_use]
pub fn contains_optional_chain(expr: &Expr) -> bool {
    any_expression(expr, Expr::is_optional_link)
}

/// The receiver through which `expr` continues a chain, if any.
fn chain_receiver(expr: &Expr) -> Option<&Expr> {
    match expr {
        Expr::Member { receiver, .. } | Expr::OptionalGuard { receiver, .. } => Some(receiver),
        Expr::Call {
            receiver: Some(receiver),
            ..
        } => Some(receiver),
        Expr::Projection { source, .. } => Some(source),
        _ => None,
    }
}

fn strip(expr: &Expr) -> Expr {
    match expr {
        Expr::OptionalGuard { body, .. } => strip(body),
        _ => clear_optional(map_children(expr, strip)),
    }
}

fn clear_optional(mut expr: Expr) -> Expr {
    if let Expr::Member { optional, .. } | Expr::Call { optional, .. } = &mut expr {
        *optional = false;
    }
    expr
}

/// Replaces every subtree equal to `from` with `to`.
fn replace(expr: &Expr, from: &Expr, to: &Expr) -> Expr {
    if expr == from {
        return to.clone();
    }
    map_children(expr, |child| replace(child, from, to))
}

struct Rewriter {
    ctx: NullableContext,
}

impl Rewriter {
    fn rewrite(&self, expr: &Expr) -> Expr {
        if chain_receiver(expr).is_some() && Self::chain_is_optional(expr) {
            return self.rewrite_chain(expr);
        }
        map_children(expr, |child| self.rewrite(child))
    }

    fn chain_is_optional(top: &Expr) -> bool {
        let mut cursor = Some(top);
        while let Some(link) = cursor {
            if link.is_optional_link() {
                return true;
            }
            cursor = chain_receiver(link);
        }
        false
    }

    fn rewrite_chain(&self, top: &Expr) -> Expr {
        let mut links = Vec::new();
        let mut base = top;
        while let Some(receiver) = chain_receiver(base) {
            links.push(base);
            base = receiver;
        }
        links.reverse();

        let null_ty = top.ty().lifted(self.ctx);
        tracing::trace!(links = links.len(), "rewriting optional chain");
        self.build(self.rewrite(base), &links, &null_ty)
    }

    /// Applies `links` (innermost first) to `current`, testing `current`
    /// before each optional link.
    fn build(&self, current: Expr, links: &[&Expr], null_ty: &TypeRef) -> Expr {
        let Some((link, rest)) = links.split_first() else {
            return current;
        };
        if !link.is_optional_link() {
            let applied = self.apply(link, current);
            return self.build(applied, rest, null_ty);
        }
        let check = Expr::not_null_check(current.clone());
        let applied = self.apply(link, current);
        let when_present = self.build(applied, rest, null_ty);
        let when_absent = Expr::Literal {
            value: Literal::TypedNull,
            ty: null_ty.clone(),
        };
        Expr::conditional(check, when_present, when_absent, null_ty.clone())
    }

    /// Re-applies one link to a rewritten, non-null receiver.
    fn apply(&self, link: &Expr, receiver: Expr) -> Expr {
        match link {
            Expr::Member { member, ty, .. } => Expr::Member {
                receiver: Box::new(receiver),
                member: member.clone(),
                optional: false,
                ty: ty.clone(),
            },
            Expr::Call {
                target,
                style,
                arguments,
                ty,
                ..
            } => Expr::Call {
                target: target.clone(),
                style: *style,
                receiver: Some(Box::new(receiver)),
                arguments: arguments.iter().map(|arg| self.rewrite(arg)).collect(),
                optional: false,
                ty: ty.clone(),
            },
            Expr::Projection {
                element,
                transform,
                materialize,
                ty,
                ..
            } => Expr::Projection {
                source: Box::new(receiver),
                element: element.clone(),
                transform: Box::new(self.rewrite(transform)),
                materialize: materialize.clone(),
                ty: ty.clone(),
            },
            Expr::OptionalGuard {
                receiver: original,
                body,
                ..
            } => self.rewrite(&replace(body, original, &receiver)),
            // Not a chain link; chain_receiver never yields these.
            _ => self.rewrite(link),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    fn s() -> Expr {
        Expr::parameter("s", TypeRef::reference("Source"))
    }

    fn address() -> TypeRef {
        TypeRef::reference("Address")
    }

    fn typed_null(ty: TypeRef) -> Expr {
        Expr::Literal {
            value: Literal::TypedNull,
            ty,
        }
    }

    fn city_chain() -> Expr {
        // s.Address?.City
        Expr::optional_member(
            Expr::member(s(), "Address", address()),
            "City",
            TypeRef::string(),
        )
    }

    #[test]
    fn none_leaves_chains() {
        let chain = city_chain();
        let out = rewrite(&chain, OptionalChainPolicy::None, NullableContext::Disabled);
        assert_eq!(out, chain);
        assert!(contains_optional_chain(&out));
    }

    #[test]
    fn ignore_clears_flags_and_keeps_coalesce() {
        let expr = Expr::coalesce(city_chain(), Expr::string("-"), TypeRef::string());
        let out = rewrite(&expr, OptionalChainPolicy::Ignore, NullableContext::Disabled);
        assert!(!contains_optional_chain(&out));
        assert_eq!(
            out,
            Expr::coalesce(
                Expr::member(
                    Expr::member(s(), "Address", address()),
                    "City",
                    TypeRef::string()
                ),
                Expr::string("-"),
                TypeRef::string(),
            )
        );
    }

    #[test]
    fn ignore_collapses_guards() {
        let guard = Expr::OptionalGuard {
            receiver: Box::new(city_chain()),
            body: Box::new(Expr::string("x")),
            ty: TypeRef::string(),
        };
        let out = rewrite(&guard, OptionalChainPolicy::Ignore, NullableContext::Disabled);
        assert_eq!(out, Expr::string("x"));
    }

    #[test]
    fn rewrite_single_link() {
        let out = rewrite(
            &city_chain(),
            OptionalChainPolicy::Rewrite,
            NullableContext::Disabled,
        );
        let receiver = Expr::member(s(), "Address", address());
        let expected = Expr::conditional(
            Expr::not_null_check(receiver.clone()),
            Expr::member(receiver, "City", TypeRef::string()),
            typed_null(TypeRef::string()),
            TypeRef::string(),
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn rewrite_tests_outermost_receiver_first() {
        // s?.Address?.Zip where Zip is an int
        let chain = Expr::optional_member(
            Expr::optional_member(s(), "Address", address()),
            "Zip",
            TypeRef::value("int").nullable(),
        );
        let out = rewrite(&chain, OptionalChainPolicy::Rewrite, NullableContext::Disabled);
        let lifted = TypeRef::value("int").nullable();
        let addr = Expr::member(s(), "Address", address());
        let expected = Expr::conditional(
            Expr::not_null_check(s()),
            Expr::conditional(
                Expr::not_null_check(addr.clone()),
                Expr::member(addr, "Zip", lifted.clone()),
                typed_null(lifted.clone()),
                lifted.clone(),
            ),
            typed_null(lifted.clone()),
            lifted,
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn rewrite_lifts_value_types_and_annotates_references_when_enabled() {
        let zip = Expr::optional_member(s(), "Zip", TypeRef::value("int"));
        let out = rewrite(&zip, OptionalChainPolicy::Rewrite, NullableContext::Disabled);
        let Expr::Conditional { when_false, ty, .. } = &out else {
            panic!("expected conditional, got {out:?}");
        };
        assert!(ty.nullable);
        assert!(when_false.ty().nullable);

        let addr = Expr::optional_member(s(), "Address", address());
        let disabled = rewrite(&addr, OptionalChainPolicy::Rewrite, NullableContext::Disabled);
        assert!(!disabled.ty().nullable);
        let enabled = rewrite(&addr, OptionalChainPolicy::Rewrite, NullableContext::Enabled);
        assert!(enabled.ty().nullable);
    }

    #[test]
    fn rewrite_continues_plain_links_after_optional_one() {
        // s?.Address.City.Length
        let chain = Expr::member(
            Expr::member(
                Expr::optional_member(s(), "Address", address()),
                "City",
                TypeRef::string(),
            ),
            "Length",
            TypeRef::value("int"),
        );
        let out = rewrite(&chain, OptionalChainPolicy::Rewrite, NullableContext::Disabled);
        let plain = Expr::member(
            Expr::member(
                Expr::member(s(), "Address", address()),
                "City",
                TypeRef::string(),
            ),
            "Length",
            TypeRef::value("int"),
        );
        let lifted = TypeRef::value("int").nullable();
        assert_eq!(
            out,
            Expr::conditional(
                Expr::not_null_check(s()),
                plain,
                typed_null(lifted.clone()),
                lifted
            )
        );
    }

    #[test]
    fn rewrite_resolves_inlined_guards() {
        // s?.Nick inlined as Shout(s?.Nick) => s?.Nick + "!"
        let nick = Expr::optional_member(s(), "Nick", TypeRef::string());
        let guard = Expr::OptionalGuard {
            receiver: Box::new(nick.clone()),
            body: Box::new(Expr::binary(
                BinaryOp::Add,
                nick,
                Expr::string("!"),
                TypeRef::string(),
            )),
            ty: TypeRef::string(),
        };
        let out = rewrite(&guard, OptionalChainPolicy::Rewrite, NullableContext::Disabled);
        assert!(!contains_optional_chain(&out));
        let plain_nick = Expr::member(s(), "Nick", TypeRef::string());
        let expected = Expr::conditional(
            Expr::not_null_check(s()),
            Expr::conditional(
                Expr::not_null_check(plain_nick.clone()),
                Expr::binary(
                    BinaryOp::Add,
                    plain_nick,
                    Expr::string("!"),
                    TypeRef::string(),
                ),
                typed_null(TypeRef::string()),
                TypeRef::string(),
            ),
            typed_null(TypeRef::string()),
            TypeRef::string(),
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn rewrite_is_idempotent() {
        let chain = Expr::coalesce(city_chain(), Expr::string("?"), TypeRef::string());
        let once = rewrite(&chain, OptionalChainPolicy::Rewrite, NullableContext::Enabled);
        let twice = rewrite(&once, OptionalChainPolicy::Rewrite, NullableContext::Enabled);
        assert_eq!(once, twice);
    }
}
