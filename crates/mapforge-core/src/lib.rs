// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Mapforge engine core.
//!
//! This crate turns mapping specifications (marked single-expression
//! methods) into generated source:
//! - Discovery of specifications and callables in a typed compilation unit
//! - Call graph construction and cycle detection
//! - Inlining of calls to other mapping methods
//! - Optional-chain rewriting into explicit null checks
//! - Generation of the expression form and the update form
//!
//! Everything is driven by [`pipeline::generate`], which never panics:
//! problems come back as [`diagnostics::Diagnostic`]s.

#![doc = include_str!("../../../README.md")]

pub mod analysis;
pub mod ast;
pub mod ast_walker;
pub mod codegen;
pub mod diagnostics;
pub mod discovery;
pub mod pipeline;
pub mod span;
pub mod spec;
pub mod transform;
pub mod unit;

pub use pipeline::{GenerationOutput, GeneratorOptions, generate};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::ast::{CallableId, Expr, MemberInit, NullableContext, TypeRef};
    pub use crate::codegen::{Artifact, ArtifactKind};
    pub use crate::diagnostics::{Diagnostic, DiagnosticCode, Severity};
    pub use crate::pipeline::{GenerationOutput, GeneratorOptions, generate};
    pub use crate::span::Span;
    pub use crate::unit::{
        CollectionPolicy, CompilationUnit, Marker, MethodBody, MethodDecl, OptionalChainPolicy,
        Param, ScopeDecl,
    };
}
