//! Typed declarations for C headers
//!
//! Raw syntax from `cb-parser` is lowered into [`Decl`] records: type
//! aliases, function prototypes, and global variables, each with a fully
//! built [`CType`]. The [`DeclTable`] keeps the first declaration of each
//! name and answers typedef-resolution queries.

pub mod error;
pub mod lower;
pub mod table;
pub mod ty;

pub use error::LowerError;
pub use lower::{LowerResult, LoweringContext};
pub use table::{DeclId, DeclTable, Inserted};
pub use ty::{CType, FloatKind, FnType, IntRank, Signedness, TypeCategory, TypeDisplay};

use cb_intern::Symbol;
use cb_span::FileSpan;
use derive_more::Display;
use serde::Serialize;

/// A single declared name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    /// Declared name
    pub name: Symbol,
    /// What kind of entity this declares
    pub kind: DeclKind,
    /// Location of the declarator
    pub span: FileSpan,
}

/// Declaration kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    /// `typedef <target> name;`
    TypeAlias {
        /// The aliased type
        target: CType,
        /// Objects of the alias are `const` (`typedef const int cint;`)
        is_const: bool,
    },
    /// A function prototype or definition
    Function {
        /// Signature
        ty: FnType,
        /// Parameter names, when written
        param_names: Vec<Option<Symbol>>,
        /// Linkage
        linkage: Linkage,
        /// A body followed the declarator
        has_body: bool,
    },
    /// A global variable
    Global {
        /// Declared type
        ty: CType,
        /// Linkage
        linkage: Linkage,
        /// The object itself is `const`
        is_const: bool,
    },
}

impl DeclKind {
    /// Short classification of the declaration
    pub fn class(&self) -> DeclClass {
        match self {
            Self::TypeAlias { .. } => DeclClass::TypeAlias,
            Self::Function { .. } => DeclClass::Function,
            Self::Global { .. } => DeclClass::Global,
        }
    }

    /// Linkage of functions and globals
    pub fn linkage(&self) -> Option<Linkage> {
        match self {
            Self::TypeAlias { .. } => None,
            Self::Function { linkage, .. } | Self::Global { linkage, .. } => Some(*linkage),
        }
    }

    /// Whether the declared object, or objects of the alias, are `const`
    pub fn is_const(&self) -> bool {
        match self {
            Self::TypeAlias { is_const, .. } | Self::Global { is_const, .. } => *is_const,
            Self::Function { .. } => false,
        }
    }

    /// The declared type; function declarations yield their function type
    pub fn ty(&self) -> CType {
        match self {
            Self::TypeAlias { target, .. } => target.clone(),
            Self::Function { ty, .. } => CType::Function(Box::new(ty.clone())),
            Self::Global { ty, .. } => ty.clone(),
        }
    }
}

/// Kind of declaration without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclClass {
    /// Typedef
    #[display("typedef")]
    TypeAlias,
    /// Function prototype
    #[display("function")]
    Function,
    /// Global variable
    #[display("global")]
    Global,
}

/// Linkage of a function or variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Linkage {
    /// Visible to other translation units (`extern` or file scope)
    #[display("external")]
    External,
    /// `static`, not visible outside its translation unit
    #[display("internal")]
    Internal,
}
