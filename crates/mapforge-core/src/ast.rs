// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Typed expression tree for mapping specification bodies.
//!
//! The tree is produced by the host front end (parser + type resolver) and
//! handed to the engine fully typed: every node carries the [`TypeRef`] of
//! the value it produces.
//!
//! # Design Philosophy
//!
//! - **Closed variant set** - [`Expr`] is a sum type and every pass is an
//!   exhaustive `match`, so a new node kind is a compile error until each
//!   pass handles it.
//! - **Immutable values** - passes never mutate a tree in place. Inlining and
//!   optional-chain rewriting build new trees so the expression form and the
//!   update form can both derive from one untouched original body.
//! - **No back-pointers** - calls name their target by [`CallableId`]; the
//!   callable's body lives in a separate table.
//!
//! # Example
//!
//! ```
//! use mapforge_core::ast::{Expr, MemberInit, TypeRef};
//!
//! // source => new Dest { Name = source.Name }
//! let source = Expr::parameter("source", TypeRef::reference("Source"));
//! let body = Expr::new_object(
//!     TypeRef::reference("Dest"),
//!     vec![MemberInit::new(
//!         "Name",
//!         TypeRef::string(),
//!         Expr::member(source, "Name", TypeRef::string()),
//!     )],
//! );
//! assert_eq!(body.ty().name, "Dest");
//! ```

use ecow::EcoString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the compilation unit has optional-type (nullable reference)
/// annotations switched on.
///
/// Passed explicitly into every pass that needs it instead of living in
/// ambient state, so batches with different settings can be processed side
/// by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullableContext {
    /// Reference types are oblivious: any of them may be null.
    #[default]
    Disabled,
    /// Reference types are non-null unless annotated with `?`.
    Enabled,
}

impl NullableContext {
    /// Returns true when nullable annotations are enabled.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// The runtime shape of a resolved type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeShape {
    /// A value type (struct, primitive, enum).
    Value,
    /// A class or other reference type.
    Reference,
    /// The built-in string type.
    String,
    /// A sequence or collection type (lists, arrays, sets).
    Collection,
}

/// A resolved static type as reported by the type resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Display name without any nullable decoration (`int`, `Address`,
    /// `List<string>`).
    pub name: EcoString,
    /// Runtime shape of the type.
    pub shape: TypeShape,
    /// For value types: `Nullable<T>`. For reference types: annotated `?`.
    #[serde(default)]
    pub nullable: bool,
    /// Whether the type has an accessible parameterless constructor.
    #[serde(default = "default_constructible")]
    pub constructible: bool,
}

const fn default_constructible() -> bool {
    true
}

impl TypeRef {
    fn with_shape(name: impl Into<EcoString>, shape: TypeShape) -> Self {
        Self {
            name: name.into(),
            shape,
            nullable: false,
            constructible: true,
        }
    }

    /// A non-nullable value type.
    #[must_use]
    pub fn value(name: impl Into<EcoString>) -> Self {
        Self::with_shape(name, TypeShape::Value)
    }

    /// A reference (class) type.
    #[must_use]
    pub fn reference(name: impl Into<EcoString>) -> Self {
        Self::with_shape(name, TypeShape::Reference)
    }

    /// The string type.
    #[must_use]
    pub fn string() -> Self {
        Self::with_shape("string", TypeShape::String)
    }

    /// A collection type.
    #[must_use]
    pub fn collection(name: impl Into<EcoString>) -> Self {
        Self::with_shape(name, TypeShape::Collection)
    }

    /// The boolean type.
    #[must_use]
    pub fn boolean() -> Self {
        Self::value("bool")
    }

    /// Marks the type as nullable (`T?`).
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the type as lacking a parameterless constructor.
    #[must_use]
    pub fn without_default_constructor(mut self) -> Self {
        self.constructible = false;
        self
    }

    /// Returns true for value types, nullable or not.
    #[must_use]
    pub const fn is_value(&self) -> bool {
        matches!(self.shape, TypeShape::Value)
    }

    /// Returns true if a value of this type may be null under `ctx`.
    #[must_use]
    pub const fn can_be_null(&self, ctx: NullableContext) -> bool {
        match self.shape {
            TypeShape::Value => self.nullable,
            TypeShape::Reference | TypeShape::String | TypeShape::Collection => {
                self.nullable || !ctx.is_enabled()
            }
        }
    }

    /// The type of `receiver?.Member` when `Member` has this type.
    ///
    /// Value types become `Nullable<T>`. Reference types gain the `?`
    /// annotation only when annotations are enabled; otherwise they are
    /// left undecorated.
    #[must_use]
    pub fn lifted(&self, ctx: NullableContext) -> Self {
        let mut lifted = self.clone();
        if self.is_value() || ctx.is_enabled() {
            lifted.nullable = true;
        }
        lifted
    }

    /// Renders the type name as it appears in generated source.
    #[must_use]
    pub fn display(&self, ctx: NullableContext) -> EcoString {
        let decorate = match self.shape {
            TypeShape::Value => self.nullable,
            TypeShape::Reference | TypeShape::String | TypeShape::Collection => {
                self.nullable && ctx.is_enabled()
            }
        };
        if decorate {
            ecow::eco_format!("{}?", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Identity of a callable: containing scope, method name and parameter
/// type signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallableId {
    /// Containing scope (class) name.
    pub scope: EcoString,
    /// Method name.
    pub name: EcoString,
    /// Comma separated parameter type names.
    pub signature: EcoString,
}

impl CallableId {
    /// Builds an identity from the declared parameter types.
    #[must_use]
    pub fn new(
        scope: impl Into<EcoString>,
        name: impl Into<EcoString>,
        parameter_types: &[TypeRef],
    ) -> Self {
        let signature = parameter_types
            .iter()
            .map(|ty| ty.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            scope: scope.into(),
            name: name.into(),
            signature: signature.into(),
        }
    }
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.scope, self.name, self.signature)
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    /// `null`
    Null,
    /// A `null` rendered with an explicit cast to the node's type.
    ///
    /// Produced by the optional-chain rewriter so that representations which
    /// need a concrete type for both ternary branches get one.
    TypedNull,
    /// `true` / `false`
    Bool(bool),
    /// An integer literal.
    Integer(i64),
    /// A floating-point literal.
    Float(f64),
    /// A string literal (unescaped contents).
    String(EcoString),
}

/// Binary operators supported in mapping bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
}

impl BinaryOp {
    /// The operator as written in source.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Remainder => "%",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// How a call was written at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStyle {
    /// `Scope.Helper(a, b)`
    #[default]
    Static,
    /// `a.Helper(b)`, equivalent to `Helper(a, b)`.
    Extension,
    /// `a.Method(b)` on an instance; never inlined.
    Instance,
}

/// One `Member = value` entry of an object initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberInit {
    /// The destination member name.
    pub member: EcoString,
    /// The declared type of the destination member.
    pub member_ty: TypeRef,
    /// The value assigned to the member.
    pub value: Expr,
}

impl MemberInit {
    /// Creates a member initializer.
    #[must_use]
    pub fn new(member: impl Into<EcoString>, member_ty: TypeRef, value: Expr) -> Self {
        Self {
            member: member.into(),
            member_ty,
            value,
        }
    }
}

/// A typed expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// A literal value.
    Literal { value: Literal, ty: TypeRef },

    /// A reference to a method or lambda parameter.
    Parameter { name: EcoString, ty: TypeRef },

    /// `receiver.Member`, or `receiver?.Member` when `optional`.
    Member {
        receiver: Box<Expr>,
        member: EcoString,
        #[serde(default)]
        optional: bool,
        ty: TypeRef,
    },

    /// An invocation. `receiver` is present for extension and instance
    /// calls; `optional` marks `receiver?.Call()`.
    Call {
        target: CallableId,
        #[serde(default)]
        style: CallStyle,
        #[serde(default)]
        receiver: Option<Box<Expr>>,
        #[serde(default)]
        arguments: Vec<Expr>,
        #[serde(default)]
        optional: bool,
        ty: TypeRef,
    },

    /// `new T(arguments) { Member = value, ... }`
    New {
        ty: TypeRef,
        #[serde(default)]
        arguments: Vec<Expr>,
        #[serde(default)]
        initializers: Vec<MemberInit>,
    },

    /// `condition ? when_true : when_false`
    Conditional {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
        ty: TypeRef,
    },

    /// `left ?? right`
    Coalesce {
        left: Box<Expr>,
        right: Box<Expr>,
        ty: TypeRef,
    },

    /// `left op right`
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: TypeRef,
    },

    /// `throw exception`
    Throw { exception: Box<Expr>, ty: TypeRef },

    /// `source.Select(element => transform)`, optionally followed by a
    /// materializing call such as `.ToList()`.
    Projection {
        source: Box<Expr>,
        element: EcoString,
        transform: Box<Expr>,
        #[serde(default)]
        materialize: Option<EcoString>,
        ty: TypeRef,
    },

    /// `body` evaluated only when `receiver` is non-null, `null` otherwise.
    ///
    /// Left behind by the inliner when a call at the tail of an optional
    /// chain is replaced by the callee body. The optional-chain rewriter
    /// always resolves it.
    OptionalGuard {
        receiver: Box<Expr>,
        body: Box<Expr>,
        ty: TypeRef,
    },
}

impl Expr {
    /// Returns the static type of this expression.
    #[must_use]
    pub const fn ty(&self) -> &TypeRef {
        match self {
            Self::Literal { ty, .. }
            | Self::Parameter { ty, .. }
            | Self::Member { ty, .. }
            | Self::Call { ty, .. }
            | Self::New { ty, .. }
            | Self::Conditional { ty, .. }
            | Self::Coalesce { ty, .. }
            | Self::Binary { ty, .. }
            | Self::Throw { ty, .. }
            | Self::Projection { ty, .. }
            | Self::OptionalGuard { ty, .. } => ty,
        }
    }

    /// Returns true for `null` literals, typed or not.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Literal {
                value: Literal::Null | Literal::TypedNull,
                ..
            }
        )
    }

    /// Returns true for throw expressions.
    #[must_use]
    pub const fn is_throw(&self) -> bool {
        matches!(self, Self::Throw { .. })
    }

    /// Returns true if this node itself short-circuits on a null receiver.
    #[must_use]
    pub const fn is_optional_link(&self) -> bool {
        matches!(
            self,
            Self::Member { optional: true, .. }
                | Self::Call { optional: true, .. }
                | Self::OptionalGuard { .. }
        )
    }

    /// `null` of the given type.
    #[must_use]
    pub const fn null(ty: TypeRef) -> Self {
        Self::Literal {
            value: Literal::Null,
            ty,
        }
    }

    /// A string literal.
    #[must_use]
    pub fn string(value: impl Into<EcoString>) -> Self {
        Self::Literal {
            value: Literal::String(value.into()),
            ty: TypeRef::string(),
        }
    }

    /// An `int` literal.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::Literal {
            value: Literal::Integer(value),
            ty: TypeRef::value("int"),
        }
    }

    /// A parameter reference.
    #[must_use]
    pub fn parameter(name: impl Into<EcoString>, ty: TypeRef) -> Self {
        Self::Parameter {
            name: name.into(),
            ty,
        }
    }

    /// `receiver.member`
    #[must_use]
    pub fn member(receiver: Self, member: impl Into<EcoString>, ty: TypeRef) -> Self {
        Self::Member {
            receiver: Box::new(receiver),
            member: member.into(),
            optional: false,
            ty,
        }
    }

    /// `receiver?.member`
    #[must_use]
    pub fn optional_member(receiver: Self, member: impl Into<EcoString>, ty: TypeRef) -> Self {
        Self::Member {
            receiver: Box::new(receiver),
            member: member.into(),
            optional: true,
            ty,
        }
    }

    /// `Scope.Target(arguments)`
    #[must_use]
    pub fn call(target: CallableId, arguments: Vec<Self>, ty: TypeRef) -> Self {
        Self::Call {
            target,
            style: CallStyle::Static,
            receiver: None,
            arguments,
            optional: false,
            ty,
        }
    }

    /// `receiver.Target(arguments)` or `receiver?.Target(arguments)` for an
    /// extension-style call.
    #[must_use]
    pub fn extension_call(
        target: CallableId,
        receiver: Self,
        arguments: Vec<Self>,
        optional: bool,
        ty: TypeRef,
    ) -> Self {
        Self::Call {
            target,
            style: CallStyle::Extension,
            receiver: Some(Box::new(receiver)),
            arguments,
            optional,
            ty,
        }
    }

    /// `new ty { initializers }`
    #[must_use]
    pub const fn new_object(ty: TypeRef, initializers: Vec<MemberInit>) -> Self {
        Self::New {
            ty,
            arguments: Vec::new(),
            initializers,
        }
    }

    /// `condition ? when_true : when_false`
    #[must_use]
    pub fn conditional(condition: Self, when_true: Self, when_false: Self, ty: TypeRef) -> Self {
        Self::Conditional {
            condition: Box::new(condition),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
            ty,
        }
    }

    /// `left ?? right`
    #[must_use]
    pub fn coalesce(left: Self, right: Self, ty: TypeRef) -> Self {
        Self::Coalesce {
            left: Box::new(left),
            right: Box::new(right),
            ty,
        }
    }

    /// `left op right`
    #[must_use]
    pub fn binary(op: BinaryOp, left: Self, right: Self, ty: TypeRef) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        }
    }

    /// `expr == null`
    #[must_use]
    pub fn is_null_check(expr: Self) -> Self {
        let null = Self::null(expr.ty().clone());
        Self::binary(BinaryOp::Equal, expr, null, TypeRef::boolean())
    }

    /// `expr != null`
    #[must_use]
    pub fn not_null_check(expr: Self) -> Self {
        let null = Self::null(expr.ty().clone());
        Self::binary(BinaryOp::NotEqual, expr, null, TypeRef::boolean())
    }

    /// `throw exception`, typed as `ty`.
    #[must_use]
    pub fn throw(exception: Self, ty: TypeRef) -> Self {
        Self::Throw {
            exception: Box::new(exception),
            ty,
        }
    }

    /// `source.Select(element => transform).materialize()`
    #[must_use]
    pub fn projection(
        source: Self,
        element: impl Into<EcoString>,
        transform: Self,
        materialize: Option<&str>,
        ty: TypeRef,
    ) -> Self {
        Self::Projection {
            source: Box::new(source),
            element: element.into(),
            transform: Box::new(transform),
            materialize: materialize.map(EcoString::from),
            ty,
        }
    }
}
