// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The statement plan of an update procedure, and its printer.

use super::document::{Document, block, line};
use super::expression::ExpressionPrinter;
use crate::analysis::PropertyPath;
use crate::ast::{BinaryOp, Expr};
use crate::docvec;
use ecow::EcoString;

/// One statement of an update procedure.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `if (c1 || c2 ...) { return result; }`
    ReturnIf {
        conditions: Vec<Expr>,
        result: PropertyPath,
    },
    /// `if (path == null) { path = creation; }`
    EnsureCreated { path: PropertyPath, creation: Expr },
    /// `path = value;`
    Assign { path: PropertyPath, value: Expr },
    /// `if (condition) { then } else { otherwise }`
    If {
        condition: Expr,
        then: Vec<Statement>,
        otherwise: Vec<Statement>,
    },
    /// `throw exception;`
    Throw { exception: Expr },
    /// `// text`
    Comment(EcoString),
    /// `return path;`
    Return { path: PropertyPath },
}

impl Statement {
    /// Counts this statement and every statement nested inside it.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::If {
                then, otherwise, ..
            } => 1 + then.iter().chain(otherwise).map(Self::count).sum::<usize>(),
            _ => 1,
        }
    }

    /// Calls `f` on this statement and every nested statement, in order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Statement)) {
        f(self);
        if let Self::If {
            then, otherwise, ..
        } = self
        {
            for statement in then.iter().chain(otherwise) {
                statement.walk(f);
            }
        }
    }
}

/// Lays out statements, each on its own line.
pub struct StatementPrinter {
    expressions: ExpressionPrinter,
}

impl StatementPrinter {
    /// Creates a statement printer over an expression printer.
    #[must_use]
    pub const fn new(expressions: ExpressionPrinter) -> Self {
        Self { expressions }
    }

    /// Lays out `statements`; every statement starts with a line break.
    #[must_use]
    pub fn document(&self, statements: &[Statement]) -> Document<'static> {
        Document::Vec(
            statements
                .iter()
                .map(|statement| docvec![line(), self.statement(statement)])
                .collect(),
        )
    }

    fn statement(&self, statement: &Statement) -> Document<'static> {
        match statement {
            Statement::ReturnIf { conditions, result } => {
                let condition = conditions
                    .iter()
                    .cloned()
                    .reduce(|left, right| {
                        Expr::binary(BinaryOp::Or, left, right, crate::ast::TypeRef::boolean())
                    })
                    .map_or(Document::Str("false"), |c| self.expressions.operand(&c));
                docvec![
                    "if (",
                    condition,
                    ")",
                    block(docvec![line(), "return ", result.to_string(), ";"]),
                ]
            }
            Statement::EnsureCreated { path, creation } => docvec![
                "if (",
                path.to_string(),
                " == null)",
                block(docvec![
                    line(),
                    path.to_string(),
                    " = ",
                    self.expressions.operand(creation),
                    ";"
                ]),
            ],
            Statement::Assign { path, value } => docvec![
                path.to_string(),
                " = ",
                self.expressions.operand(value),
                ";"
            ],
            Statement::If {
                condition,
                then,
                otherwise,
            } => {
                let head = docvec![
                    "if (",
                    self.expressions.operand(condition),
                    ")",
                    block(self.document(then)),
                ];
                if otherwise.is_empty() {
                    head
                } else {
                    docvec![head, line(), "else", block(self.document(otherwise))]
                }
            }
            Statement::Throw { exception } => {
                docvec!["throw ", self.expressions.operand(exception), ";"]
            }
            Statement::Comment(text) => docvec!["// ", text],
            Statement::Return { path } => docvec!["return ", path.to_string(), ";"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NullableContext, TypeRef};

    fn printer() -> StatementPrinter {
        StatementPrinter::new(ExpressionPrinter::new(NullableContext::Disabled))
    }

    fn dest() -> PropertyPath {
        PropertyPath::root("dest")
    }

    #[test]
    fn guard_combines_conditions() {
        let source = Expr::parameter("source", TypeRef::reference("Source"));
        let target = Expr::parameter("dest", TypeRef::reference("Dest"));
        let guard = Statement::ReturnIf {
            conditions: vec![Expr::is_null_check(source), Expr::is_null_check(target)],
            result: dest(),
        };
        assert_eq!(
            printer().document(&[guard]).to_pretty_string(),
            "\nif (source == null || dest == null)\n{\n    return dest;\n}"
        );
    }

    #[test]
    fn if_else_nests_blocks() {
        let source = Expr::parameter("source", TypeRef::reference("Source"));
        let statement = Statement::If {
            condition: Expr::is_null_check(source),
            then: vec![Statement::Assign {
                path: dest().child("Nested"),
                value: Expr::null(TypeRef::reference("Nested")),
            }],
            otherwise: vec![Statement::EnsureCreated {
                path: dest().child("Nested"),
                creation: Expr::new_object(TypeRef::reference("Nested"), vec![]),
            }],
        };
        assert_eq!(statement.count(), 3);
        assert_eq!(
            printer().document(&[statement]).to_pretty_string(),
            "\nif (source == null)\n{\n    dest.Nested = null;\n}\nelse\n{\n    \
             if (dest.Nested == null)\n    {\n        dest.Nested = new Nested();\n    }\n}"
        );
    }

    #[test]
    fn comments_and_returns() {
        let statements = [
            Statement::Comment("dest.Tags is left unchanged".into()),
            Statement::Return { path: dest() },
        ];
        assert_eq!(
            printer().document(&statements).to_pretty_string(),
            "\n// dest.Tags is left unchanged\nreturn dest;"
        );
    }

    #[test]
    fn walk_visits_nested_statements() {
        let statement = Statement::If {
            condition: Expr::integer(1),
            then: vec![Statement::Return { path: dest() }],
            otherwise: vec![Statement::Comment("x".into())],
        };
        let mut seen = 0;
        statement.walk(&mut |_| seen += 1);
        assert_eq!(seen, 3);
    }
}
