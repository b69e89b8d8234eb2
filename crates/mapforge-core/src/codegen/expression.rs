// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Expression printer.
//!
//! Renders an [`Expr`] as C# source. Parentheses are inserted only where
//! operator precedence requires them, so printing a tree and re-parsing it
//! yields the same tree. Object initializers are laid out one member per
//! line:
//!
//! ```text
//! new Dest
//! {
//!     Name = source.Name,
//!     Nested = new Nested
//!     {
//!         Value = source.Child.Value
//!     }
//! }
//! ```

use super::document::{Document, INDENT, block, join, line, nest};
use crate::ast::{CallStyle, Expr, Literal, NullableContext, TypeRef};
use crate::docvec;
use ecow::EcoString;

/// Operator precedence levels, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Throw,
    Conditional,
    Coalesce,
    Or,
    And,
    Equality,
    Relational,
    Additive,
    Multiplicative,
    Unary,
    Primary,
}

impl Precedence {
    const fn tighter(self) -> Self {
        match self {
            Self::Throw => Self::Conditional,
            Self::Conditional => Self::Coalesce,
            Self::Coalesce => Self::Or,
            Self::Or => Self::And,
            Self::And => Self::Equality,
            Self::Equality => Self::Relational,
            Self::Relational => Self::Additive,
            Self::Additive => Self::Multiplicative,
            Self::Multiplicative => Self::Unary,
            Self::Unary | Self::Primary => Self::Primary,
        }
    }
}

fn precedence(expr: &Expr) -> Precedence {
    use crate::ast::BinaryOp as Op;
    match expr {
        Expr::Literal {
            value: Literal::TypedNull,
            ..
        } => Precedence::Unary,
        Expr::Literal {
            value: Literal::Integer(n),
            ..
        } if *n < 0 => Precedence::Unary,
        Expr::Literal {
            value: Literal::Float(f),
            ..
        } if f.is_sign_negative() => Precedence::Unary,
        Expr::Literal { .. }
        | Expr::Parameter { .. }
        | Expr::Member { .. }
        | Expr::Call { .. }
        | Expr::New { .. }
        | Expr::Projection { .. } => Precedence::Primary,
        Expr::Binary { op, .. } => match op {
            Op::Multiply | Op::Divide | Op::Remainder => Precedence::Multiplicative,
            Op::Add | Op::Subtract => Precedence::Additive,
            Op::Less | Op::LessOrEqual | Op::Greater | Op::GreaterOrEqual => Precedence::Relational,
            Op::Equal | Op::NotEqual => Precedence::Equality,
            Op::And => Precedence::And,
            Op::Or => Precedence::Or,
        },
        Expr::Coalesce { .. } => Precedence::Coalesce,
        Expr::Conditional { .. } | Expr::OptionalGuard { .. } => Precedence::Conditional,
        Expr::Throw { .. } => Precedence::Throw,
    }
}

/// Prints expressions under one nullable context.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionPrinter {
    ctx: NullableContext,
}

impl ExpressionPrinter {
    /// Creates a printer for the given context.
    #[must_use]
    pub const fn new(ctx: NullableContext) -> Self {
        Self { ctx }
    }

    /// Renders a type name as it appears in source.
    #[must_use]
    pub fn type_name(&self, ty: &TypeRef) -> EcoString {
        ty.display(self.ctx)
    }

    /// Lays out `expr` in a context where any expression, including a throw,
    /// is allowed.
    #[must_use]
    pub fn document(&self, expr: &Expr) -> Document<'static> {
        self.at(expr, Precedence::Throw)
    }

    /// Lays out `expr` as a statement operand, where a throw is not allowed.
    #[must_use]
    pub fn operand(&self, expr: &Expr) -> Document<'static> {
        self.at(expr, Precedence::Conditional)
    }

    /// Lays out `expr`, parenthesized unless it binds at least as tightly as
    /// `min`.
    fn at(&self, expr: &Expr, min: Precedence) -> Document<'static> {
        let doc = self.bare(expr);
        if precedence(expr) < min {
            docvec!["(", doc, ")"]
        } else {
            doc
        }
    }

    /// Like [`Self::at`], but a throw is accepted as is.
    fn branch(&self, expr: &Expr, min: Precedence) -> Document<'static> {
        if expr.is_throw() {
            self.bare(expr)
        } else {
            self.at(expr, min)
        }
    }

    fn bare(&self, expr: &Expr) -> Document<'static> {
        match expr {
            Expr::Literal { value, ty } => self.literal(value, ty),
            Expr::Parameter { name, .. } => docvec![name],
            Expr::Member {
                receiver,
                member,
                optional,
                ..
            } => docvec![
                self.at(receiver, Precedence::Primary),
                access(*optional),
                member
            ],
            Expr::Call {
                target,
                style,
                receiver,
                arguments,
                optional,
                ..
            } => {
                let callee = match (style, receiver) {
                    (CallStyle::Static, _) => docvec![&target.scope, ".", &target.name],
                    (CallStyle::Extension | CallStyle::Instance, Some(receiver)) => docvec![
                        self.at(receiver, Precedence::Primary),
                        access(*optional),
                        &target.name
                    ],
                    (CallStyle::Extension | CallStyle::Instance, None) => docvec![&target.name],
                };
                docvec![callee, self.arguments(arguments)]
            }
            Expr::New {
                ty,
                arguments,
                initializers,
            } => {
                let head = docvec!["new ", self.type_name(ty).to_string()];
                if initializers.is_empty() {
                    return docvec![head, self.arguments(arguments)];
                }
                let head = if arguments.is_empty() {
                    head
                } else {
                    docvec![head, self.arguments(arguments)]
                };
                let members = initializers.iter().map(|init| {
                    docvec![line(), &init.member, " = ", self.document(&init.value)]
                });
                docvec![head, block(join(members, &Document::Str(",")))]
            }
            Expr::Conditional {
                condition,
                when_true,
                when_false,
                ..
            } => docvec![
                self.at(condition, Precedence::Coalesce),
                " ? ",
                self.branch(when_true, Precedence::Coalesce),
                " : ",
                self.branch(when_false, Precedence::Conditional),
            ],
            Expr::Coalesce { left, right, .. } => docvec![
                self.at(left, Precedence::Or),
                " ?? ",
                self.branch(right, Precedence::Coalesce),
            ],
            Expr::Binary {
                op, left, right, ..
            } => {
                let level = precedence(expr);
                docvec![
                    self.at(left, level),
                    " ",
                    op.symbol(),
                    " ",
                    self.at(right, level.tighter()),
                ]
            }
            Expr::Throw { exception, .. } => {
                docvec!["throw ", self.at(exception, Precedence::Coalesce)]
            }
            Expr::Projection {
                source,
                element,
                transform,
                materialize,
                ..
            } => {
                let select = docvec![
                    self.at(source, Precedence::Primary),
                    ".Select(",
                    element,
                    " => ",
                    self.document(transform),
                    ")",
                ];
                match materialize {
                    Some(method) => docvec![select, ".", method, "()"],
                    None => select,
                }
            }
            Expr::OptionalGuard { receiver, body, ty } => {
                let lifted = ty.lifted(self.ctx);
                let expanded = Expr::conditional(
                    Expr::not_null_check((**receiver).clone()),
                    (**body).clone(),
                    Expr::Literal {
                        value: Literal::TypedNull,
                        ty: lifted.clone(),
                    },
                    lifted,
                );
                self.bare(&expanded)
            }
        }
    }

    fn arguments(&self, arguments: &[Expr]) -> Document<'static> {
        let args = arguments
            .iter()
            .map(|arg| self.at(arg, Precedence::Conditional));
        docvec!["(", join(args, &Document::Str(", ")), ")"]
    }

    fn literal(&self, value: &Literal, ty: &TypeRef) -> Document<'static> {
        match value {
            Literal::Null => Document::Str("null"),
            Literal::TypedNull => docvec!["(", self.type_name(ty).to_string(), ")null"],
            Literal::Bool(true) => Document::Str("true"),
            Literal::Bool(false) => Document::Str("false"),
            Literal::Integer(n) => Document::String(n.to_string()),
            Literal::Float(f) => Document::String(float_literal(*f)),
            Literal::String(s) => Document::String(string_literal(s)),
        }
    }
}

const fn access(optional: bool) -> &'static str {
    if optional { "?." } else { "." }
}

fn float_literal(value: f64) -> String {
    if value.is_nan() {
        "double.NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_negative() {
            "double.NegativeInfinity".to_string()
        } else {
            "double.PositiveInfinity".to_string()
        }
    } else {
        // Debug keeps a fractional part (`1.0`), so the literal stays a double.
        format!("{value:?}")
    }
}

/// Quotes and escapes a string literal.
fn string_literal(value: &str) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Prints `expr` as a standalone expression.
#[must_use]
pub fn print_expression(expr: &Expr, ctx: NullableContext) -> String {
    ExpressionPrinter::new(ctx).document(expr).to_pretty_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, CallableId, MemberInit};

    fn s() -> Expr {
        Expr::parameter("source", TypeRef::reference("Source"))
    }

    fn int(n: i64) -> Expr {
        Expr::integer(n)
    }

    fn print(expr: &Expr) -> String {
        print_expression(expr, NullableContext::Disabled)
    }

    fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::binary(op, left, right, TypeRef::value("int"))
    }

    #[test]
    fn member_and_optional_access() {
        let name = Expr::member(s(), "Name", TypeRef::string());
        assert_eq!(print(&name), "source.Name");
        let city = Expr::optional_member(
            Expr::member(s(), "Address", TypeRef::reference("Address")),
            "City",
            TypeRef::string(),
        );
        assert_eq!(print(&city), "source.Address?.City");
    }

    #[test]
    fn precedence_drives_parentheses() {
        let sum = bin(BinaryOp::Add, int(1), int(2));
        assert_eq!(print(&bin(BinaryOp::Multiply, sum.clone(), int(3))), "(1 + 2) * 3");
        assert_eq!(print(&bin(BinaryOp::Add, sum.clone(), int(3))), "1 + 2 + 3");
        assert_eq!(print(&bin(BinaryOp::Subtract, int(3), sum)), "3 - (1 + 2)");
        let product = bin(BinaryOp::Multiply, int(2), int(3));
        assert_eq!(print(&bin(BinaryOp::Add, int(1), product)), "1 + 2 * 3");
    }

    #[test]
    fn conditional_and_coalesce() {
        let name = Expr::member(s(), "Name", TypeRef::string());
        let fallback = Expr::coalesce(name.clone(), Expr::string("n/a"), TypeRef::string());
        assert_eq!(print(&fallback), "source.Name ?? \"n/a\"");

        let nested = Expr::conditional(
            Expr::not_null_check(s()),
            Expr::conditional(
                Expr::not_null_check(name.clone()),
                name.clone(),
                Expr::null(TypeRef::string()),
                TypeRef::string(),
            ),
            Expr::null(TypeRef::string()),
            TypeRef::string(),
        );
        assert_eq!(
            print(&nested),
            "source != null ? (source.Name != null ? source.Name : null) : null"
        );

        let in_condition = Expr::conditional(
            Expr::binary(
                BinaryOp::Equal,
                fallback,
                Expr::string("x"),
                TypeRef::boolean(),
            ),
            int(1),
            int(2),
            TypeRef::value("int"),
        );
        assert_eq!(print(&in_condition), "(source.Name ?? \"n/a\") == \"x\" ? 1 : 2");
    }

    #[test]
    fn throw_is_bare_in_branches_and_after_coalesce() {
        let error = Expr::New {
            ty: TypeRef::reference("System.ArgumentNullException"),
            arguments: vec![Expr::string("source")],
            initializers: vec![],
        };
        let name = Expr::member(s(), "Name", TypeRef::string());
        let coalesce = Expr::coalesce(
            name,
            Expr::throw(error.clone(), TypeRef::string()),
            TypeRef::string(),
        );
        assert_eq!(
            print(&coalesce),
            "source.Name ?? throw new System.ArgumentNullException(\"source\")"
        );
        let ternary = Expr::conditional(
            Expr::is_null_check(s()),
            Expr::throw(error, TypeRef::string()),
            Expr::string("ok"),
            TypeRef::string(),
        );
        assert_eq!(
            print(&ternary),
            "source == null ? throw new System.ArgumentNullException(\"source\") : \"ok\""
        );
    }

    #[test]
    fn typed_null_follows_context() {
        let null = Expr::Literal {
            value: Literal::TypedNull,
            ty: TypeRef::reference("Address").lifted(NullableContext::Enabled),
        };
        assert_eq!(print_expression(&null, NullableContext::Enabled), "(Address?)null");
        assert_eq!(print_expression(&null, NullableContext::Disabled), "(Address)null");
        let int_null = Expr::Literal {
            value: Literal::TypedNull,
            ty: TypeRef::value("int").nullable(),
        };
        assert_eq!(print(&int_null), "(int?)null");
    }

    #[test]
    fn object_initializers_one_member_per_line() {
        let nested = Expr::new_object(
            TypeRef::reference("Nested"),
            vec![MemberInit::new(
                "Value",
                TypeRef::value("int"),
                Expr::member(
                    Expr::member(s(), "Child", TypeRef::reference("Child")),
                    "Value",
                    TypeRef::value("int"),
                ),
            )],
        );
        let body = Expr::new_object(
            TypeRef::reference("Dest"),
            vec![
                MemberInit::new(
                    "Name",
                    TypeRef::string(),
                    Expr::member(s(), "Name", TypeRef::string()),
                ),
                MemberInit::new("Nested", TypeRef::reference("Nested"), nested),
            ],
        );
        assert_eq!(
            print(&body),
            "new Dest\n{\n    Name = source.Name,\n    Nested = new Nested\n    {\n        Value = source.Child.Value\n    }\n}"
        );
        let empty = Expr::new_object(TypeRef::reference("Dest"), vec![]);
        assert_eq!(print(&empty), "new Dest()");
    }

    #[test]
    fn calls_and_projections() {
        let id = CallableId::new("Mappers", "Combine", &[TypeRef::string(), TypeRef::string()]);
        let call = Expr::call(
            id.clone(),
            vec![Expr::string("a"), Expr::string("b")],
            TypeRef::string(),
        );
        assert_eq!(print(&call), "Mappers.Combine(\"a\", \"b\")");
        let ext = Expr::extension_call(id, s(), vec![Expr::string("b")], true, TypeRef::string());
        assert_eq!(print(&ext), "source?.Combine(\"b\")");

        let tags = Expr::member(s(), "Tags", TypeRef::collection("List<string>"));
        let projection = Expr::projection(
            tags,
            "t",
            Expr::binary(
                BinaryOp::Add,
                Expr::parameter("t", TypeRef::string()),
                Expr::string("!"),
                TypeRef::string(),
            ),
            Some("ToList"),
            TypeRef::collection("List<string>"),
        );
        assert_eq!(print(&projection), "source.Tags.Select(t => t + \"!\").ToList()");
    }

    #[test]
    fn literals_are_escaped() {
        assert_eq!(print(&Expr::string("a \"b\"\n")), "\"a \\\"b\\\"\\n\"");
        let float = Expr::Literal {
            value: Literal::Float(1.0),
            ty: TypeRef::value("double"),
        };
        assert_eq!(print(&float), "1.0");
        let negative = Expr::member(int(-1), "Length", TypeRef::value("int"));
        assert_eq!(print(&negative), "(-1).Length");
    }
}
