// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Wadler-Lindig style document tree for generated source.
//!
//! Printers build `Document` values instead of writing into a string buffer
//! with manual indentation tracking; the layout is rendered in one final
//! pass. Rendering always breaks at [`line`] and strips trailing whitespace
//! from every emitted line, so blank lines inside nested blocks come out
//! empty rather than indented.
//!
//! # Example
//!
//! ```
//! use mapforge_core::codegen::document::{INDENT, line, nest};
//! use mapforge_core::docvec;
//!
//! let doc = docvec![
//!     "new Dest",
//!     line(),
//!     "{",
//!     nest(INDENT, docvec![line(), "Name = source.Name"]),
//!     line(),
//!     "}",
//! ];
//! assert_eq!(doc.to_pretty_string(), "new Dest\n{\n    Name = source.Name\n}");
//! ```

use ecow::EcoString;

/// Indentation width used throughout generated source.
pub const INDENT: isize = 4;

/// A pretty-printable document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document<'a> {
    /// A borrowed string literal.
    Str(&'a str),
    /// An owned string.
    String(String),
    /// A newline followed by current indentation.
    Line,
    /// Increase indentation for nested content.
    Nest(isize, Box<Document<'a>>),
    /// A sequence of documents.
    Vec(Vec<Document<'a>>),
    /// Empty document.
    Nil,
}

/// Coerce a value into a `Document`.
pub trait Documentable<'a> {
    fn to_doc(self) -> Document<'a>;
}

impl<'a> Documentable<'a> for &'a str {
    fn to_doc(self) -> Document<'a> {
        Document::Str(self)
    }
}

impl<'a> Documentable<'a> for String {
    fn to_doc(self) -> Document<'a> {
        Document::String(self)
    }
}

impl<'a> Documentable<'a> for &EcoString {
    fn to_doc(self) -> Document<'a> {
        Document::String(self.to_string())
    }
}

impl<'a> Documentable<'a> for Document<'a> {
    fn to_doc(self) -> Document<'a> {
        self
    }
}

impl<'a> Documentable<'a> for Vec<Document<'a>> {
    fn to_doc(self) -> Document<'a> {
        Document::Vec(self)
    }
}

/// Join multiple documents together in a vector.
///
/// Each element is converted to a `Document` via the `Documentable` trait.
/// Documents are concatenated directly; no separator is inserted.
///
/// ```
/// use mapforge_core::docvec;
///
/// let doc = docvec!["dest", ".", "Name"];
/// assert_eq!(doc.to_pretty_string(), "dest.Name");
/// ```
#[macro_export]
macro_rules! docvec {
    () => {
        $crate::codegen::document::Document::Vec(Vec::new())
    };

    ($first:expr $(,)?) => {
        $crate::codegen::document::Document::Vec(
            vec![$crate::codegen::document::Documentable::to_doc($first)]
        )
    };

    ($first:expr, $($rest:expr),+ $(,)?) => {
        match $crate::codegen::document::Documentable::to_doc($first) {
            $crate::codegen::document::Document::Vec(mut vec) => {
                $(
                    vec.push($crate::codegen::document::Documentable::to_doc($rest));
                )*
                $crate::codegen::document::Document::Vec(vec)
            },
            first => {
                $crate::codegen::document::Document::Vec(
                    vec![first, $($crate::codegen::document::Documentable::to_doc($rest)),+]
                )
            }
        }
    };
}

/// Creates a `Line` document: a mandatory newline followed by indentation.
#[must_use]
pub fn line() -> Document<'static> {
    Document::Line
}

/// Creates a `Nil` document.
#[must_use]
pub fn nil() -> Document<'static> {
    Document::Nil
}

/// Creates a `Nest` document, increasing indentation for the inner document.
#[must_use]
pub fn nest(indent: isize, doc: Document<'_>) -> Document<'_> {
    Document::Nest(indent, Box::new(doc))
}

/// Joins documents with a separator between each pair.
#[must_use]
pub fn join<'a>(
    docs: impl IntoIterator<Item = Document<'a>>,
    separator: &Document<'a>,
) -> Document<'a> {
    let docs: Vec<_> = docs.into_iter().collect();
    if docs.is_empty() {
        return Document::Nil;
    }
    let mut result = Vec::with_capacity(docs.len() * 2 - 1);
    let mut first = true;
    for doc in docs {
        if !first {
            result.push(separator.clone());
        }
        result.push(doc);
        first = false;
    }
    Document::Vec(result)
}

/// Concatenates documents without any separator.
#[must_use]
pub fn concat<'a>(docs: impl IntoIterator<Item = Document<'a>>) -> Document<'a> {
    Document::Vec(docs.into_iter().collect())
}

/// A `{ ... }` block: the brace on its own line, `body` indented one level.
///
/// `body` is expected to start each of its lines with [`line`].
#[must_use]
pub fn block(body: Document<'_>) -> Document<'_> {
    docvec![line(), "{", nest(INDENT, body), line(), "}"]
}

// --- Rendering ---

impl Document<'_> {
    /// Renders the document to a string.
    #[must_use]
    pub fn to_pretty_string(&self) -> String {
        let mut output = String::new();
        self.render_to(&mut output, 0);
        strip_trailing_whitespace(&mut output);
        output
    }

    fn render_to(&self, output: &mut String, indent: isize) {
        match self {
            Document::Str(s) => output.push_str(s),
            Document::String(s) => output.push_str(s),
            Document::Nil => {}
            Document::Line => {
                strip_trailing_whitespace(output);
                output.push('\n');
                write_indent(output, indent);
            }
            Document::Nest(extra, doc) => {
                doc.render_to(output, indent + extra);
            }
            Document::Vec(docs) => {
                for doc in docs {
                    doc.render_to(output, indent);
                }
            }
        }
    }
}

fn strip_trailing_whitespace(output: &mut String) {
    let kept = output.trim_end_matches([' ', '\t']).len();
    output.truncate(kept);
}

fn write_indent(output: &mut String, indent: isize) {
    for _ in 0..indent {
        output.push(' ');
    }
}
