//! Tokens and raw syntax for C header declarations
//!
//! The parser produces these types; lowering turns them into typed
//! declarations.

use cb_span::Span;
use derive_more::Display;

/// A lexed token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// Source location
    pub span: Span,
}

impl Token {
    /// Creates a token
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum TokenKind {
    /// Identifier that is not a keyword
    #[display("{_0}")]
    Ident(String),
    /// Reserved word
    #[display("{_0}")]
    Keyword(Keyword),
    /// Integer literal
    #[display("{_0}")]
    Number(u64),
    /// String literal, without the quotes
    #[display("\"{_0}\"")]
    Str(String),
    /// Punctuation
    #[display("{_0}")]
    Punct(Punct),
    /// Any other character (only meaningful inside skipped bodies)
    #[display("{_0}")]
    Other(char),
    /// End of input
    #[display("end of file")]
    Eof,
}

/// Punctuation tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Punct {
    #[display(";")]
    Semi,
    #[display(",")]
    Comma,
    #[display("*")]
    Star,
    #[display("(")]
    LParen,
    #[display(")")]
    RParen,
    #[display("[")]
    LBracket,
    #[display("]")]
    RBracket,
    #[display("{{")]
    LBrace,
    #[display("}}")]
    RBrace,
    #[display("...")]
    Ellipsis,
    #[display("=")]
    Eq,
}

/// Reserved words the parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Keyword {
    #[display("typedef")]
    Typedef,
    #[display("extern")]
    Extern,
    #[display("static")]
    Static,
    #[display("inline")]
    Inline,
    #[display("_Noreturn")]
    Noreturn,
    #[display("const")]
    Const,
    #[display("volatile")]
    Volatile,
    #[display("restrict")]
    Restrict,
    #[display("void")]
    Void,
    #[display("_Bool")]
    Bool,
    #[display("char")]
    Char,
    #[display("short")]
    Short,
    #[display("int")]
    Int,
    #[display("long")]
    Long,
    #[display("float")]
    Float,
    #[display("double")]
    Double,
    #[display("signed")]
    Signed,
    #[display("unsigned")]
    Unsigned,
    #[display("_Complex")]
    Complex,
    #[display("struct")]
    Struct,
    #[display("union")]
    Union,
    #[display("enum")]
    Enum,
}

impl Keyword {
    /// Maps an identifier to a keyword, if it is one
    pub fn from_ident(text: &str) -> Option<Self> {
        let keyword = match text {
            "typedef" => Self::Typedef,
            "extern" => Self::Extern,
            "static" => Self::Static,
            "inline" | "__inline" | "__inline__" => Self::Inline,
            "_Noreturn" => Self::Noreturn,
            "const" => Self::Const,
            "volatile" => Self::Volatile,
            "restrict" | "__restrict" | "__restrict__" => Self::Restrict,
            "void" => Self::Void,
            "_Bool" | "bool" => Self::Bool,
            "char" => Self::Char,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "signed" | "__signed__" => Self::Signed,
            "unsigned" => Self::Unsigned,
            "_Complex" | "__complex__" => Self::Complex,
            "struct" => Self::Struct,
            "union" => Self::Union,
            "enum" => Self::Enum,
            _ => return None,
        };
        Some(keyword)
    }

    /// The type specifier this keyword denotes, if any
    pub fn type_specifier(self) -> Option<SpecifierKind> {
        let kind = match self {
            Self::Void => SpecifierKind::Void,
            Self::Bool => SpecifierKind::Bool,
            Self::Char => SpecifierKind::Char,
            Self::Short => SpecifierKind::Short,
            Self::Int => SpecifierKind::Int,
            Self::Long => SpecifierKind::Long,
            Self::Float => SpecifierKind::Float,
            Self::Double => SpecifierKind::Double,
            Self::Signed => SpecifierKind::Signed,
            Self::Unsigned => SpecifierKind::Unsigned,
            Self::Complex => SpecifierKind::Complex,
            _ => return None,
        };
        Some(kind)
    }
}

/// Typedef names every header may use without including anything
pub const BUILTIN_TYPEDEFS: &[&str] = &[
    "size_t",
    "ssize_t",
    "ptrdiff_t",
    "intptr_t",
    "uintptr_t",
    "int8_t",
    "int16_t",
    "int32_t",
    "int64_t",
    "uint8_t",
    "uint16_t",
    "uint32_t",
    "uint64_t",
];

/// A parsed header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationUnit {
    /// Top-level declarations in source order
    pub declarations: Vec<Declaration>,
}

/// Storage class of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StorageClass {
    #[display("typedef")]
    Typedef,
    #[display("extern")]
    Extern,
    #[display("static")]
    Static,
}

/// One top-level declaration, possibly declaring several names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Storage class, if any
    pub storage: Option<StorageClass>,
    /// Type specifiers and qualifiers
    pub specifiers: DeclSpecifiers,
    /// Declarators in source order
    pub declarators: Vec<Declarator>,
    /// Span of the function body, for definitions
    pub body: Option<Span>,
    /// Whole declaration
    pub span: Span,
}

/// Type specifiers and qualifiers of a declaration or parameter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclSpecifiers {
    /// Type specifiers in source order
    pub types: Vec<TypeSpecifier>,
    /// `const` was present
    pub is_const: bool,
    /// `volatile` was present
    pub is_volatile: bool,
    /// Covers all specifiers
    pub span: Span,
}

/// A single type specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpecifier {
    pub kind: SpecifierKind,
    pub span: Span,
}

/// Type specifier kinds
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SpecifierKind {
    #[display("void")]
    Void,
    #[display("_Bool")]
    Bool,
    #[display("char")]
    Char,
    #[display("short")]
    Short,
    #[display("int")]
    Int,
    #[display("long")]
    Long,
    #[display("float")]
    Float,
    #[display("double")]
    Double,
    #[display("signed")]
    Signed,
    #[display("unsigned")]
    Unsigned,
    #[display("_Complex")]
    Complex,
    /// A typedef name
    #[display("{_0}")]
    Named(String),
}

/// An identifier with its location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub text: String,
    pub span: Span,
}

/// A declarator: an optional name wrapped in derivations
///
/// `derivations` are ordered from the base type outward to the declared
/// name: `int (*f)(int)` yields `[Function, Pointer]`, so folding them over
/// `int` gives "pointer to function returning int".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declarator {
    /// Declared name; `None` for abstract declarators
    pub name: Option<Ident>,
    /// Type derivations applied to the base type
    pub derivations: Vec<Derivation>,
    pub span: Span,
}

impl Declarator {
    /// Whether the outermost derivation makes this a function declarator
    pub fn is_function(&self) -> bool {
        matches!(self.derivations.last(), Some(Derivation::Function(_)))
    }

    /// Parameters of the outermost function derivation
    pub fn function_params(&self) -> Option<&ParamList> {
        match self.derivations.last() {
            Some(Derivation::Function(params)) => Some(params),
            _ => None,
        }
    }
}

/// A single declarator derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
    /// `*`, with `const` applying to the pointer itself
    Pointer {
        is_const: bool,
    },
    /// `[N]` or `[]`
    Array(Option<u64>),
    /// `(params)`
    Function(ParamList),
}

/// A function parameter list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamList {
    pub params: Vec<ParamDecl>,
    /// Ends with `...`
    pub variadic: bool,
}

/// A single parameter declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub specifiers: DeclSpecifiers,
    pub declarator: Declarator,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_round_trip_names() {
        assert_eq!(Keyword::from_ident("_Bool"), Some(Keyword::Bool));
        assert_eq!(Keyword::from_ident("bool"), Some(Keyword::Bool));
        assert_eq!(Keyword::from_ident("_Complex"), Some(Keyword::Complex));
        assert_eq!(Keyword::from_ident("myint"), None);
        assert_eq!(Keyword::Complex.to_string(), "_Complex");
    }

    #[test]
    fn test_type_specifier_mapping() {
        assert_eq!(Keyword::Short.type_specifier(), Some(SpecifierKind::Short));
        assert_eq!(Keyword::Extern.type_specifier(), None);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(TokenKind::Punct(Punct::LBrace).to_string(), "{");
        assert_eq!(TokenKind::Eof.to_string(), "end of file");
        assert_eq!(TokenKind::Str("C".to_string()).to_string(), "\"C\"");
    }
}
