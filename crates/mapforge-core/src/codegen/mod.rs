// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Code generation for mapping specifications.
//!
//! **Stage:** per specification, after inlining and optional-chain rewriting.
//!
//! Two artifact forms are produced from one rewritten body:
//!
//! - the **expression form**: the body as a lambda,
//!   `source => new Dest { ... }`, printed by [`expression`];
//! - the **update form**: an imperative procedure that writes the same
//!   values into an existing destination, planned by [`update`] as a list of
//!   [`statements::Statement`]s.
//!
//! Both are laid out with the [`document`] pretty printer and wrapped into a
//! `partial` scope augmentation by [`artifact`].

pub mod artifact;
pub mod document;
pub mod expression;
pub mod statements;
pub mod update;


pub use artifact::{Artifact, ArtifactKind, expression_artifact, update_artifact};
pub use expression::print_expression;
pub use update::{UpdatePlan, plan_update};

use crate::ast::CallableId;
use crate::diagnostics::DiagnosticCode;
use ecow::EcoString;
use thiserror::Error;

/// Errors that can occur while generating one artifact.
///
/// The `#[error]` templates are the messages users see in diagnostics.
#[derive(Debug, Error)]
pub enum CodeGenError {
    /// The expression form was requested but an optional chain survived.
    #[error(
        "'{spec}' contains an optional chain (`?.`), which expression trees cannot represent; \
         set the optional-chain policy to Ignore or Rewrite"
    )]
    OptionalChainInExpression {
        /// The specification.
        spec: CallableId,
    },

    /// The update form was requested for a value-type destination.
    #[error("'{spec}' returns value type '{ty}'; an update form needs a reference-type destination")]
    ValueTypeUpdate {
        /// The specification.
        spec: CallableId,
        /// The destination type.
        ty: EcoString,
    },

    /// The update form was requested but there is nothing to assign.
    #[error("'{spec}' has no member initializers, so there is nothing to update")]
    NothingToUpdate {
        /// The specification.
        spec: CallableId,
    },

    /// The update form was requested for a body that is not `new T { ... }`.
    #[error("'{spec}' does not construct an object; an update form needs a `new {ty} {{ ... }}` body")]
    UpdateNeedsConstruction {
        /// The specification.
        spec: CallableId,
        /// The declared destination type.
        ty: EcoString,
    },
}

impl CodeGenError {
    /// The stable diagnostic code reported for this error.
    #[must_use]
    pub const fn code(&self) -> DiagnosticCode {
        match self {
            Self::OptionalChainInExpression { .. } => DiagnosticCode::OptionalChainUnsupported,
            Self::ValueTypeUpdate { .. } => DiagnosticCode::ValueTypeUpdate,
            Self::NothingToUpdate { .. } => DiagnosticCode::NothingToUpdate,
            Self::UpdateNeedsConstruction { .. } => DiagnosticCode::UpdateNeedsConstruction,
        }
    }
}

/// Result type for code generation operations.
pub type Result<T> = std::result::Result<T, CodeGenError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeRef;
    use crate::diagnostics::Severity;

    #[test]
    fn errors_map_to_stable_codes() {
        let spec = CallableId::new("Mappers", "Map", &[TypeRef::reference("Source")]);
        let err = CodeGenError::NothingToUpdate { spec: spec.clone() };
        assert_eq!(err.code(), DiagnosticCode::NothingToUpdate);
        assert_eq!(
            err.to_string(),
            "'Mappers.Map(Source)' has no member initializers, so there is nothing to update"
        );
        let err = CodeGenError::OptionalChainInExpression { spec };
        assert_eq!(err.code().severity(), Severity::Error);
    }

    #[test]
    fn construction_message_escapes_braces() {
        let spec = CallableId::new("Mappers", "Map", &[TypeRef::reference("Source")]);
        let err = CodeGenError::UpdateNeedsConstruction {
            spec,
            ty: "Dest".into(),
        };
        assert!(err.to_string().contains("`new Dest { ... }`"));
    }
}
