// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Update-procedure planning.
//!
//! Turns a rewritten `new T { ... }` body into the statements of a procedure
//! that writes the same values into an existing destination instance:
//!
//! 1. an early `return dest;` when the source can be null, or the
//!    destination can be null and cannot be default-constructed;
//! 2. in-place creation of the destination when it can be null;
//! 3. one write per member initializer, in source order, descending into
//!    nested constructions so existing nested instances are reused;
//! 4. a trailing `return dest;`.

use super::statements::Statement;
use super::{CodeGenError, Result};
use crate::analysis::{PathTypeInfo, PathTypes, PropertyPath};
use crate::ast::{Expr, MemberInit, NullableContext, TypeRef, TypeShape};
use crate::spec::MappingSpec;
use crate::unit::{CollectionPolicy, Param};

/// The planned update procedure for one specification.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    /// The source parameter.
    pub source: Param,
    /// The destination parameter.
    pub dest: Param,
    /// Statements in order.
    pub statements: Vec<Statement>,
}

/// Plans the update procedure for `spec` from its rewritten `body`.
///
/// # Errors
///
/// Returns [`CodeGenError`] when the destination is a value type, when the
/// body is not an object construction, or when the construction assigns no
/// members.
pub fn plan_update(spec: &MappingSpec, body: &Expr, ctx: NullableContext) -> Result<UpdatePlan> {
    if spec.return_type.is_value() {
        return Err(CodeGenError::ValueTypeUpdate {
            spec: spec.id.clone(),
            ty: spec.return_type.display(ctx),
        });
    }
    let Expr::New {
        ty: constructed,
        arguments,
        initializers,
    } = body
    else {
        return Err(CodeGenError::UpdateNeedsConstruction {
            spec: spec.id.clone(),
            ty: spec.return_type.display(ctx),
        });
    };
    if initializers.is_empty() {
        return Err(CodeGenError::NothingToUpdate {
            spec: spec.id.clone(),
        });
    }

    let dest_name = if spec.parameter.name == "dest" {
        "target"
    } else {
        "dest"
    };
    let dest = Param::new(dest_name, spec.return_type.clone());
    let root = PropertyPath::root(dest_name);
    let planner = Planner {
        types: PathTypes::collect(&root, &spec.return_type, body, ctx),
        collections: spec.options.collections,
        ctx,
    };

    let mut statements = Vec::new();
    let dest_can_be_null = spec.return_type.can_be_null(ctx);

    let mut guard = Vec::new();
    if spec.parameter.ty.can_be_null(ctx) {
        guard.push(Expr::is_null_check(Expr::parameter(
            spec.parameter.name.clone(),
            spec.parameter.ty.clone(),
        )));
    }
    if dest_can_be_null && !spec.return_type.constructible {
        guard.push(Expr::is_null_check(Expr::parameter(
            dest_name,
            spec.return_type.clone(),
        )));
    }
    if !guard.is_empty() {
        statements.push(Statement::ReturnIf {
            conditions: guard,
            result: root.clone(),
        });
    }
    if dest_can_be_null && spec.return_type.constructible {
        statements.push(Statement::EnsureCreated {
            path: root.clone(),
            creation: default_instance(constructed, arguments),
        });
    }

    for init in initializers {
        planner.member(&root, init, &mut statements);
    }
    statements.push(Statement::Return { path: root });

    tracing::debug!(
        spec = %spec.id,
        statements = statements.iter().map(Statement::count).sum::<usize>(),
        "update planned"
    );
    Ok(UpdatePlan {
        source: spec.parameter.clone(),
        dest,
        statements,
    })
}

/// `new T(arguments)` without the member initializers.
fn default_instance(ty: &TypeRef, arguments: &[Expr]) -> Expr {
    Expr::New {
        ty: ty.clone(),
        arguments: arguments.to_vec(),
        initializers: Vec::new(),
    }
}

struct Planner {
    types: PathTypes,
    collections: CollectionPolicy,
    ctx: NullableContext,
}

impl Planner {
    fn info(&self, path: &PropertyPath, ty: &TypeRef) -> PathTypeInfo {
        self.types
            .get(path)
            .unwrap_or_else(|| PathTypeInfo::of(ty, self.ctx))
    }

    fn member(&self, parent: &PropertyPath, init: &MemberInit, out: &mut Vec<Statement>) {
        let path = parent.child(init.member.clone());
        let info = self.info(&path, &init.member_ty);

        let is_collection =
            info.is_collection() || init.value.ty().shape == TypeShape::Collection;
        if is_collection && self.collections == CollectionPolicy::Skip {
            out.push(Statement::Comment(ecow::eco_format!(
                "{path} is left unchanged (collections are skipped)"
            )));
            return;
        }

        self.write(&path, info, &init.value, out);
    }

    /// Writes `value` to `path`, expanding constructions and qualifying
    /// conditionals into statements.
    fn write(&self, path: &PropertyPath, info: PathTypeInfo, value: &Expr, out: &mut Vec<Statement>) {
        match value {
            Expr::New {
                ty,
                arguments,
                initializers,
            } if Self::expandable(ty, initializers) && !info.is_value() => {
                if info.needs_pre_creation() {
                    out.push(Statement::EnsureCreated {
                        path: path.clone(),
                        creation: default_instance(ty, arguments),
                    });
                }
                for init in initializers {
                    self.member(path, init, out);
                }
            }
            Expr::Conditional {
                condition,
                when_true,
                when_false,
                ..
            } if Self::expands_conditional(value, info) => {
                let mut then = Vec::new();
                self.write(path, info, when_true, &mut then);
                let mut otherwise = Vec::new();
                self.write(path, info, when_false, &mut otherwise);
                out.push(Statement::If {
                    condition: (**condition).clone(),
                    then,
                    otherwise,
                });
            }
            Expr::Throw { exception, .. } => out.push(Statement::Throw {
                exception: (**exception).clone(),
            }),
            _ => out.push(Statement::Assign {
                path: path.clone(),
                value: value.clone(),
            }),
        }
    }

    fn expandable(ty: &TypeRef, initializers: &[MemberInit]) -> bool {
        !ty.is_value() && !initializers.is_empty()
    }

    /// A conditional is expanded into `if/else` when each branch is a
    /// construction, `null`, a throw or another such conditional, and at
    /// least one branch is an expandable construction.
    fn expands_conditional(value: &Expr, info: PathTypeInfo) -> bool {
        fn branches_qualify(expr: &Expr) -> bool {
            match expr {
                Expr::New { .. } => true,
                Expr::Conditional {
                    when_true,
                    when_false,
                    ..
                } => branches_qualify(when_true) && branches_qualify(when_false),
                _ => expr.is_null() || expr.is_throw(),
            }
        }
        fn has_construction(expr: &Expr) -> bool {
            match expr {
                Expr::New {
                    ty, initializers, ..
                } => Planner::expandable(ty, initializers),
                Expr::Conditional {
                    when_true,
                    when_false,
                    ..
                } => has_construction(when_true) || has_construction(when_false),
                _ => false,
            }
        }

        matches!(value, Expr::Conditional { .. })
            && !info.is_value()
            && branches_qualify(value)
            && has_construction(value)
    }
}
