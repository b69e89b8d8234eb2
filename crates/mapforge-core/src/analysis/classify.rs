// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Type classification for destination property paths.
//!
//! **Stage:** per specification, after rewriting.
//!
//! The update generator needs to know, for every destination path it writes
//! through, whether the member can currently be null and what kind of value
//! it holds. [`PathTypes::collect`] walks the object constructions of one
//! rewritten body and records a [`PathTypeInfo`] for each member path. The
//! table is local to one specification.

use crate::ast::{Expr, NullableContext, TypeRef, TypeShape};
use ecow::EcoString;
use std::collections::BTreeMap;
use std::fmt;

/// Coarse category of a resolved type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    /// A reference type that may be null.
    NullableReference,
    /// `Nullable<T>` over a value type.
    NullableValue,
    /// A non-nullable value type.
    Value,
    /// The string type.
    String,
    /// A collection type.
    Collection,
    /// A reference type that is never null under the current context.
    Object,
}

/// Classifies `ty` under the given nullable context.
#[must_use]
pub const fn classify(ty: &TypeRef, ctx: NullableContext) -> TypeCategory {
    match ty.shape {
        TypeShape::String => TypeCategory::String,
        TypeShape::Collection => TypeCategory::Collection,
        TypeShape::Value if ty.nullable => TypeCategory::NullableValue,
        TypeShape::Value => TypeCategory::Value,
        TypeShape::Reference if ty.can_be_null(ctx) => TypeCategory::NullableReference,
        TypeShape::Reference => TypeCategory::Object,
    }
}

/// What the update generator needs to know about one destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathTypeInfo {
    /// The coarse category.
    pub category: TypeCategory,
    /// Whether the member may currently hold null.
    pub can_be_null: bool,
}

impl PathTypeInfo {
    /// Classifies a member type.
    #[must_use]
    pub const fn of(ty: &TypeRef, ctx: NullableContext) -> Self {
        Self {
            category: classify(ty, ctx),
            can_be_null: ty.can_be_null(ctx),
        }
    }

    /// Returns true for strings.
    #[must_use]
    pub const fn is_string(self) -> bool {
        matches!(self.category, TypeCategory::String)
    }

    /// Returns true for collections.
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self.category, TypeCategory::Collection)
    }

    /// Returns true for value types, nullable or not.
    #[must_use]
    pub const fn is_value(self) -> bool {
        matches!(
            self.category,
            TypeCategory::Value | TypeCategory::NullableValue
        )
    }

    /// Returns true for `Nullable<T>`.
    #[must_use]
    pub const fn is_nullable_value(self) -> bool {
        matches!(self.category, TypeCategory::NullableValue)
    }

    /// Whether a nested destination object must be created in place before
    /// its members are assigned.
    ///
    /// Value types are excluded: assigning through a struct-typed property
    /// would write to a copy, so they are assigned whole instead.
    #[must_use]
    pub const fn needs_pre_creation(self) -> bool {
        self.can_be_null && !self.is_string() && !self.is_value()
    }
}

/// A dotted destination path such as `dest.Address.Line1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath {
    root: EcoString,
    segments: Vec<EcoString>,
}

impl PropertyPath {
    /// A path consisting only of the root variable.
    #[must_use]
    pub fn root(name: impl Into<EcoString>) -> Self {
        Self {
            root: name.into(),
            segments: Vec::new(),
        }
    }

    /// Extends the path by one member.
    #[must_use]
    pub fn child(&self, member: impl Into<EcoString>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(member.into());
        Self {
            root: self.root.clone(),
            segments,
        }
    }

    /// Returns true if this path is just the root variable.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of member segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The root variable name.
    #[must_use]
    pub fn variable(&self) -> &str {
        &self.root
    }

    /// Member segments below the root, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[EcoString] {
        &self.segments
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

/// Per-specification table of destination path types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTypes {
    by_path: BTreeMap<PropertyPath, PathTypeInfo>,
}

impl PathTypes {
    /// Walks the object constructions in `body`, rooted at `root` whose type
    /// is `root_ty`, and classifies every member path they write.
    #[must_use]
    pub fn collect(
        root: &PropertyPath,
        root_ty: &TypeRef,
        body: &Expr,
        ctx: NullableContext,
    ) -> Self {
        let mut types = Self::default();
        types.insert(root.clone(), PathTypeInfo::of(root_ty, ctx));
        types.visit(root, body, ctx);
        types
    }

    fn visit(&mut self, path: &PropertyPath, expr: &Expr, ctx: NullableContext) {
        match expr {
            Expr::New { initializers, .. } => {
                for init in initializers {
                    let child = path.child(init.member.clone());
                    self.insert(child.clone(), PathTypeInfo::of(&init.member_ty, ctx));
                    self.visit(&child, &init.value, ctx);
                }
            }
            Expr::Conditional {
                when_true,
                when_false,
                ..
            } => {
                self.visit(path, when_true, ctx);
                self.visit(path, when_false, ctx);
            }
            _ => {}
        }
    }

    /// Records the classification of `path`.
    pub fn insert(&mut self, path: PropertyPath, info: PathTypeInfo) {
        self.by_path.insert(path, info);
    }

    /// Looks up the classification of `path`.
    #[must_use]
    pub fn get(&self, path: &PropertyPath) -> Option<PathTypeInfo> {
        self.by_path.get(path).copied()
    }

    /// Iterates paths in order.
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyPath, PathTypeInfo)> {
        self.by_path.iter().map(|(path, info)| (path, *info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::MemberInit;

    #[test]
    fn categories() {
        let ctx = NullableContext::Enabled;
        assert_eq!(classify(&TypeRef::string(), ctx), TypeCategory::String);
        assert_eq!(
            classify(&TypeRef::collection("List<int>"), ctx),
            TypeCategory::Collection
        );
        assert_eq!(classify(&TypeRef::value("int"), ctx), TypeCategory::Value);
        assert_eq!(
            classify(&TypeRef::value("int").nullable(), ctx),
            TypeCategory::NullableValue
        );
        assert_eq!(
            classify(&TypeRef::reference("Address"), ctx),
            TypeCategory::Object
        );
        assert_eq!(
            classify(&TypeRef::reference("Address").nullable(), ctx),
            TypeCategory::NullableReference
        );
        assert_eq!(
            classify(&TypeRef::reference("Address"), NullableContext::Disabled),
            TypeCategory::NullableReference
        );
    }

    #[test]
    fn pre_creation_rules() {
        let ctx = NullableContext::Disabled;
        assert!(PathTypeInfo::of(&TypeRef::reference("Address"), ctx).needs_pre_creation());
        assert!(!PathTypeInfo::of(&TypeRef::string(), ctx).needs_pre_creation());
        assert!(!PathTypeInfo::of(&TypeRef::value("Point").nullable(), ctx).needs_pre_creation());
        assert!(
            !PathTypeInfo::of(&TypeRef::reference("Address"), NullableContext::Enabled)
                .needs_pre_creation()
        );
    }

    #[test]
    fn path_display() {
        let path = PropertyPath::root("dest").child("Address").child("Line1");
        assert_eq!(path.to_string(), "dest.Address.Line1");
        assert_eq!(path.depth(), 2);
        assert!(PropertyPath::root("dest").is_root());
    }

    #[test]
    fn collects_nested_and_conditional_paths() {
        let s = Expr::parameter("s", TypeRef::reference("S"));
        let nested = Expr::new_object(
            TypeRef::reference("Nested"),
            vec![MemberInit::new(
                "Value",
                TypeRef::value("int"),
                Expr::integer(1),
            )],
        );
        let body = Expr::new_object(
            TypeRef::reference("Dest"),
            vec![
                MemberInit::new("Name", TypeRef::string(), Expr::string("x")),
                MemberInit::new(
                    "Nested",
                    TypeRef::reference("Nested"),
                    Expr::conditional(
                        Expr::is_null_check(s),
                        Expr::null(TypeRef::reference("Nested")),
                        nested,
                        TypeRef::reference("Nested"),
                    ),
                ),
            ],
        );
        let root = PropertyPath::root("dest");
        let types = PathTypes::collect(
            &root,
            &TypeRef::reference("Dest"),
            &body,
            NullableContext::Disabled,
        );
        let paths: Vec<String> = types.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(
            paths,
            vec!["dest", "dest.Name", "dest.Nested", "dest.Nested.Value"]
        );
        let nested_info = types.get(&root.child("Nested")).expect("classified");
        assert!(nested_info.needs_pre_creation());
        let value_info = types
            .get(&root.child("Nested").child("Value"))
            .expect("classified");
        assert!(value_info.is_value());
        assert!(!value_info.is_nullable_value());
    }
}
