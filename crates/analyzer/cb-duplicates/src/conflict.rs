//! Diagnostics for redeclarations that disagree with the first declaration

#![allow(unused_assignments)]

use cb_span::FileSpan;
use derive_more::Display;
use miette::{Diagnostic, SourceSpan};
use serde::Serialize;
use thiserror::Error;

/// Why a redeclaration conflicts with the first declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictReason {
    /// A typedef, function and global share a name
    #[display("declared as a different kind of entity")]
    KindMismatch,
    /// Canonical types differ
    #[display("types differ")]
    TypeMismatch,
    /// `static` on one declaration but not the other
    #[display("linkage differs")]
    LinkageMismatch,
    /// Types agree except for `const`
    #[display("qualifiers differ")]
    QualifierMismatch,
}

/// A redeclaration that is incompatible with the first declaration
///
/// The first declaration stays in the table; this one is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[error("conflicting declaration of `{name}`: {reason}")]
#[diagnostic(code(duplicates::conflict))]
pub struct ConflictError {
    /// Declared name
    pub name: String,
    /// What differs
    pub reason: ConflictReason,
    /// Type of the conflicting declaration, in C syntax
    pub second_ty: String,
    /// Location of the conflicting declaration in its file
    #[label("redeclared here as `{second_ty}`")]
    pub span: SourceSpan,
    /// Where and how the name was first declared
    #[help]
    pub previous: String,
    /// The first declaration
    pub first: FileSpan,
    /// The conflicting declaration
    pub location: FileSpan,
}
