//! Errors produced while lowering raw syntax to declarations

#![allow(unused_assignments)]

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// A declaration that parsed but does not form a valid C type
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum LowerError {
    /// Specifiers that cannot be combined, like `short double`
    #[error("invalid combination of type specifiers `{specifiers}`")]
    #[diagnostic(code(lower::invalid_specifiers))]
    InvalidSpecifiers {
        /// The specifiers as written
        specifiers: String,
        /// Source location
        #[label("these specifiers cannot be combined")]
        span: SourceSpan,
    },

    /// A typedef name that is not defined
    #[error("unknown type name `{name}`")]
    #[diagnostic(code(lower::unknown_type))]
    UnknownType {
        /// The name
        name: String,
        /// Source location
        #[label("not a type")]
        span: SourceSpan,
    },

    /// A declarator that builds an impossible type
    #[error("invalid declarator for `{name}`: {reason}")]
    #[diagnostic(code(lower::invalid_declarator))]
    InvalidDeclarator {
        /// Declared name, or `<abstract>`
        name: String,
        /// What is wrong
        reason: String,
        /// Source location
        #[label("{reason}")]
        span: SourceSpan,
    },

    /// An object or named parameter of type `void`
    #[error("`{name}` declared with incomplete type `void`")]
    #[diagnostic(
        code(lower::void_object),
        help("only functions may return `void`; use `void *` for untyped data")
    )]
    VoidObject {
        /// Declared name
        name: String,
        /// Source location
        #[label("declared here")]
        span: SourceSpan,
    },
}

impl LowerError {
    /// Primary source location of the error
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::InvalidSpecifiers { span, .. }
            | Self::UnknownType { span, .. }
            | Self::InvalidDeclarator { span, .. }
            | Self::VoidObject { span, .. } => *span,
        }
    }
}
