// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The typed compilation unit handed over by the host front end.
//!
//! A unit is a list of scopes (classes), each holding method declarations
//! whose bodies are already parsed and typed. Markers on a method opt it in
//! as a mapping specification; a marker on the scope supplies defaults for
//! every marked method inside it.

use crate::ast::{Expr, NullableContext, TypeRef};
use crate::span::Span;
use ecow::EcoString;
use serde::{Deserialize, Serialize};

/// One compilation unit (source file) as produced by the front end.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Nullable-annotation context for the whole unit.
    #[serde(default)]
    pub nullable: NullableContext,
    /// Scopes in declaration order.
    #[serde(default)]
    pub scopes: Vec<ScopeDecl>,
}

/// A containing scope (class) declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeDecl {
    /// Enclosing namespace, if any.
    #[serde(default)]
    pub namespace: Option<EcoString>,
    /// Scope name.
    pub name: EcoString,
    /// Whether the scope is declared `static`.
    #[serde(default)]
    pub is_static: bool,
    /// Scope-level marker supplying defaults to marked methods.
    #[serde(default)]
    pub marker: Option<Marker>,
    /// Methods in declaration order.
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    /// Source location of the declaration.
    #[serde(default)]
    pub span: Span,
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Method name.
    pub name: EcoString,
    /// Formal parameters in order.
    #[serde(default)]
    pub parameters: Vec<Param>,
    /// Declared return type.
    pub return_type: TypeRef,
    /// The method body.
    pub body: MethodBody,
    /// Method-level marker; its presence makes the method a mapping
    /// specification.
    #[serde(default)]
    pub marker: Option<Marker>,
    /// Source location of the declaration.
    #[serde(default)]
    pub span: Span,
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name.
    pub name: EcoString,
    /// Declared type.
    pub ty: TypeRef,
}

impl Param {
    /// Creates a parameter.
    #[must_use]
    pub fn new(name: impl Into<EcoString>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A method body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodBody {
    /// `=> expression`
    Expression(Expr),
    /// A `{ ... }` statement block; never inlined or generated from.
    Statements,
}

impl MethodBody {
    /// Returns the body expression for single-expression bodies.
    #[must_use]
    pub const fn expression(&self) -> Option<&Expr> {
        match self {
            Self::Expression(expr) => Some(expr),
            Self::Statements => None,
        }
    }
}

/// How optional chains (`a?.b`) are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalChainPolicy {
    /// Leave optional chains untouched; expression forms containing them fail.
    #[default]
    None,
    /// Turn optional accesses into plain accesses.
    Ignore,
    /// Expand optional accesses into explicit null-checking ternaries.
    Rewrite,
}

/// How collection-typed members are treated by the update form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionPolicy {
    /// Assign collections like any other member.
    #[default]
    Generate,
    /// Leave existing destination collections untouched.
    Skip,
}

/// Opt-in marker attached to a method or a scope.
///
/// Every field is optional; unset fields fall back to the next layer
/// (method, then scope, then configured defaults, then built-in defaults).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Marker {
    /// Generate the expression form.
    #[serde(default)]
    pub expression: Option<bool>,
    /// Generate the update form.
    #[serde(default)]
    pub update: Option<bool>,
    /// Optional-chain policy.
    #[serde(default)]
    pub optional_chain: Option<OptionalChainPolicy>,
    /// Collection policy.
    #[serde(default)]
    pub collections: Option<CollectionPolicy>,
}

impl Marker {
    /// Fills every unset field of `self` from `fallback`.
    #[must_use]
    pub fn or(self, fallback: &Self) -> Self {
        Self {
            expression: self.expression.or(fallback.expression),
            update: self.update.or(fallback.update),
            optional_chain: self.optional_chain.or(fallback.optional_chain),
            collections: self.collections.or(fallback.collections),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_layers_fill_unset_fields() {
        let method = Marker {
            update: Some(true),
            ..Marker::default()
        };
        let scope = Marker {
            update: Some(false),
            optional_chain: Some(OptionalChainPolicy::Rewrite),
            ..Marker::default()
        };
        let merged = method.or(&scope);
        assert_eq!(merged.update, Some(true));
        assert_eq!(merged.optional_chain, Some(OptionalChainPolicy::Rewrite));
        assert_eq!(merged.expression, None);
    }

    #[test]
    fn unit_deserializes_with_defaults() {
        let json = r#"{
            "scopes": [{
                "name": "Mappers",
                "methods": [{
                    "name": "Helper",
                    "return_type": { "name": "int", "shape": "value" },
                    "body": "statements"
                }]
            }]
        }"#;
        let unit: CompilationUnit = serde_json::from_str(json).expect("valid json");
        assert_eq!(unit.nullable, NullableContext::Disabled);
        let method = &unit.scopes[0].methods[0];
        assert!(method.body.expression().is_none());
        assert!(method.marker.is_none());
    }
}
