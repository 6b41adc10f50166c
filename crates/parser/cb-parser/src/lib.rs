//! Parser infrastructure for C headers
//!
//! This crate turns header text into raw declaration syntax. Lexing uses
//! nom combinators; declarations are parsed by recursive descent so that
//! typedef names can be tracked as they are declared.

pub mod error;
pub mod lexer;
mod parser;

pub use error::ParseError;

use cb_syntax::{TranslationUnit, BUILTIN_TYPEDEFS};
use lexer::LexError;
use miette::NamedSource;
use rustc_hash::FxHashSet;

/// Result of parsing a source file
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Declarations that parsed successfully
    pub unit: TranslationUnit,
    /// Parse errors with detailed diagnostics
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// Whether the file parsed without errors
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Identifiers that currently name a type
#[derive(Debug, Clone, Default)]
pub struct TypedefNames {
    names: FxHashSet<String>,
}

impl TypedefNames {
    /// Names known without any declaration (`size_t`, `int32_t`, ...)
    pub fn with_builtins() -> Self {
        Self {
            names: BUILTIN_TYPEDEFS.iter().map(|name| (*name).to_string()).collect(),
        }
    }

    pub fn insert(&mut self, name: &str) {
        if !self.names.contains(name) {
            self.names.insert(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// Parse a header with no prior typedefs beyond the builtins
pub fn parse_source(source: &str) -> ParseResult {
    parse_header("<input>", source, &mut TypedefNames::with_builtins())
}

/// Parse a header, reading and extending the known typedef names
pub fn parse_header(file_name: &str, source: &str, typedefs: &mut TypedefNames) -> ParseResult {
    let (tokens, lex_errors) = lexer::tokenize(source);

    let (unit, mut errors) =
        parser::Parser::new(&tokens, file_name, source, typedefs).parse_translation_unit();

    for lex_error in lex_errors {
        match lex_error {
            LexError::UnterminatedComment(span) => errors.push(ParseError::InvalidSyntax {
                construct: "comment".to_string(),
                suggestion: Some("block comments must be closed with `*/`".to_string()),
                span: parser::source_span(span),
                src: NamedSource::new(file_name, source.to_string()),
            }),
        }
    }

    ParseResult { unit, errors }
}
