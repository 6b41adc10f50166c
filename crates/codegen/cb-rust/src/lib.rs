//! Rust FFI binding generator
//!
//! Renders a [`DeclTable`] as Rust source: `pub type` aliases for typedefs
//! followed by a single `unsafe extern "C"` block holding functions and
//! globals. C scalar types map onto `core::ffi` (or a configured prefix).

#![allow(unused_assignments)]

mod codegen;
mod ident;
mod types;

use cb_decl::DeclTable;
use miette::Diagnostic;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Knobs for binding generation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BindingOptions {
    /// Path holding `c_int` and friends
    pub ctypes_prefix: String,
    /// Library named in a `#[link]` attribute on the extern block
    #[serde(rename = "link")]
    pub link_name: Option<String>,
    /// Item name patterns to emit; empty emits everything
    pub allowlist: Vec<String>,
    /// Name of the generated `#[repr(C)]` complex number struct
    pub complex_type: String,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            ctypes_prefix: "::core::ffi".to_string(),
            link_name: None,
            allowlist: Vec::new(),
            complex_type: "CComplex".to_string(),
        }
    }
}

/// Errors from binding generation
#[derive(Error, Debug, Diagnostic)]
pub enum GenerateError {
    /// A type with no stable Rust representation
    #[error("`{item}` uses `{ty}`, which has no Rust equivalent")]
    #[diagnostic(
        code(generate::unsupported_type),
        help("leave `{item}` out with the allowlist, or change its type")
    )]
    UnsupportedType {
        /// The item being generated
        item: String,
        /// The offending type in C syntax
        ty: String,
    },

    /// Writing the output failed
    #[error(transparent)]
    Format(#[from] fmt::Error),
}

/// Generate Rust bindings for every declaration in `table`
pub fn generate(table: &DeclTable, options: &BindingOptions) -> Result<String, GenerateError> {
    codegen::BindingWriter::new(table, options).write()
}
