// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Generated artifacts: `partial` augmentations of a specification's scope.
//!
//! Every artifact has the same frame:
//!
//! ```text
//! // <auto-generated/>
//! // Generated by mapforge 0.1.0
//! #nullable enable
//!
//! namespace Shop.Mapping;
//!
//! static partial class Mappers
//! {
//!     <member>
//! }
//! ```
//!
//! The generator version in the header is the only content that is not a
//! pure function of the input.

use super::document::{Document, INDENT, block, join, line, nest};
use super::expression::ExpressionPrinter;
use super::statements::StatementPrinter;
use super::update::UpdatePlan;
use super::{CodeGenError, Result};
use crate::ast::{CallableId, Expr, NullableContext};
use crate::docvec;
use crate::spec::MappingSpec;
use crate::transform::contains_optional_chain;
use crate::unit::OptionalChainPolicy;
use ecow::{EcoString, eco_format};
use serde::Serialize;

/// Version tag written into every artifact header.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Which form an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// `Expression<Func<Source, Dest>> MapExpression()`
    Expression,
    /// `Dest UpdateMap(Source source, Dest dest)`
    Update,
}

impl ArtifactKind {
    const fn suffix(self) -> &'static str {
        match self {
            Self::Expression => "Expression",
            Self::Update => "Update",
        }
    }
}

/// One named generated source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// File name, `<Scope>.<Method>.<Form>.g.cs`.
    pub name: EcoString,
    /// The form held.
    pub kind: ArtifactKind,
    /// The specification it was generated from.
    pub spec: CallableId,
    /// Complete source text.
    pub text: String,
}

impl Artifact {
    fn new(spec: &MappingSpec, kind: ArtifactKind, text: String) -> Self {
        Self {
            name: eco_format!("{}.{}.{}.g.cs", spec.scope.name, spec.name(), kind.suffix()),
            kind,
            spec: spec.id.clone(),
            text,
        }
    }
}

/// Generates the expression form of `spec` from its rewritten `body`.
///
/// # Errors
///
/// Returns [`CodeGenError::OptionalChainInExpression`] when the policy is
/// [`OptionalChainPolicy::None`] and `body` still holds an optional chain.
pub fn expression_artifact(
    spec: &MappingSpec,
    body: &Expr,
    ctx: NullableContext,
) -> Result<Artifact> {
    if spec.options.optional_chain == OptionalChainPolicy::None && contains_optional_chain(body) {
        return Err(CodeGenError::OptionalChainInExpression {
            spec: spec.id.clone(),
        });
    }
    let printer = ExpressionPrinter::new(ctx);
    let signature = docvec![
        "public static System.Linq.Expressions.Expression<System.Func<",
        printer.type_name(&spec.parameter.ty).to_string(),
        ", ",
        printer.type_name(&spec.return_type).to_string(),
        ">> ",
        spec.name().to_string(),
        "Expression()",
    ];
    let member = docvec![
        signature,
        block(docvec![
            line(),
            "return ",
            &spec.parameter.name,
            " => ",
            printer.document(body),
            ";",
        ]),
    ];
    tracing::debug!(spec = %spec.id, "expression form generated");
    Ok(Artifact::new(
        spec,
        ArtifactKind::Expression,
        frame(spec, ctx, member),
    ))
}

/// Generates the update form of `spec` from its planned statements.
#[must_use]
pub fn update_artifact(spec: &MappingSpec, plan: &UpdatePlan, ctx: NullableContext) -> Artifact {
    let printer = ExpressionPrinter::new(ctx);
    let parameters = [&plan.source, &plan.dest].map(|param| {
        docvec![
            printer.type_name(&param.ty).to_string(),
            " ",
            &param.name
        ]
    });
    let member = docvec![
        "public static ",
        printer.type_name(&spec.return_type).to_string(),
        " Update",
        spec.name().to_string(),
        "(",
        join(parameters, &Document::Str(", ")),
        ")",
        block(StatementPrinter::new(printer).document(&plan.statements)),
    ];
    tracing::debug!(spec = %spec.id, "update form generated");
    Artifact::new(spec, ArtifactKind::Update, frame(spec, ctx, member))
}

/// Wraps one generated member in the header and scope declaration.
fn frame(spec: &MappingSpec, ctx: NullableContext, member: Document<'static>) -> String {
    let nullable = if ctx.is_enabled() {
        "#nullable enable"
    } else {
        "#nullable disable"
    };
    let namespace = match &spec.scope.namespace {
        Some(namespace) => docvec!["namespace ", namespace, ";", line(), line()],
        None => docvec![],
    };
    let modifiers = if spec.scope.is_static {
        "static partial class "
    } else {
        "partial class "
    };
    let doc = docvec![
        "// <auto-generated/>",
        line(),
        "// Generated by mapforge ",
        GENERATOR_VERSION,
        line(),
        nullable,
        line(),
        line(),
        namespace,
        modifiers,
        &spec.scope.name,
        line(),
        "{",
        nest(INDENT, docvec![line(), member]),
        line(),
        "}",
        line(),
    ];
    doc.to_pretty_string()
}
