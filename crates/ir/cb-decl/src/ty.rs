//! The C type model

use cb_intern::{Interner, Symbol};
use derive_more::Display;
use serde::Serialize;
use std::fmt;

/// A C type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CType {
    /// `void`
    Void,
    /// `_Bool` / `bool`
    Bool,
    /// `char`, `signed char`, `unsigned char`
    Char(Signedness),
    /// Integer types other than `char`
    Int {
        /// Width class
        rank: IntRank,
        /// Whether the type is signed
        signed: bool,
    },
    /// Real floating types
    Float(FloatKind),
    /// `_Complex` floating types
    Complex(FloatKind),
    /// Pointer types
    Pointer {
        /// Pointed-to type
        pointee: Box<CType>,
        /// Whether the pointee is `const`
        pointee_const: bool,
    },
    /// Array types
    Array {
        /// Element type
        element: Box<CType>,
        /// Length, when given
        len: Option<u64>,
    },
    /// Function types
    Function(Box<FnType>),
    /// Reference to a typedef
    Named(Symbol),
}

/// Signedness of `char`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signedness {
    /// Plain `char`, signedness is platform defined
    Plain,
    /// `signed char`
    Signed,
    /// `unsigned char`
    Unsigned,
}

/// Integer width classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntRank {
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `long long`
    LongLong,
    /// Exact-width integers (`int32_t`, ...)
    Exact(u8),
    /// `size_t` / `ssize_t`
    Size,
    /// `intptr_t`, `uintptr_t`, `ptrdiff_t`
    PtrSized,
}

/// Floating point kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    /// `float`
    Float,
    /// `double`
    Double,
    /// `long double`
    LongDouble,
}

/// A function type; parameter names are not part of it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnType {
    /// Return type
    pub ret: CType,
    /// Parameter types, already decayed
    pub params: Vec<CType>,
    /// Accepts variable arguments
    pub variadic: bool,
}

/// Coarse classification of a resolved type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeCategory {
    /// `void`
    #[display("void")]
    Void,
    /// `_Bool`
    #[display("boolean")]
    Boolean,
    /// Any integer type, including `char`
    #[display("integer")]
    Integer,
    /// `float`
    #[display("single-float")]
    SingleFloat,
    /// `double`
    #[display("double-float")]
    DoubleFloat,
    /// `long double`
    #[display("extended-float")]
    ExtendedFloat,
    /// `_Complex float`
    #[display("single-complex")]
    SingleComplex,
    /// `_Complex double`
    #[display("double-complex")]
    DoubleComplex,
    /// `_Complex long double`
    #[display("extended-complex")]
    ExtendedComplex,
    /// Pointer to a non-function type
    #[display("pointer")]
    Pointer,
    /// Pointer to a function, a callable value
    #[display("function-pointer")]
    FunctionPointer,
    /// A function type
    #[display("function")]
    Function,
    /// Array type
    #[display("array")]
    Array,
    /// A name that could not be resolved
    #[display("opaque")]
    Opaque,
}

impl TypeCategory {
    /// Integer, boolean, floating or complex
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Integer
                | Self::SingleFloat
                | Self::DoubleFloat
                | Self::ExtendedFloat
                | Self::SingleComplex
                | Self::DoubleComplex
                | Self::ExtendedComplex
        )
    }
}

impl CType {
    /// `int`
    pub const INT: Self = Self::Int {
        rank: IntRank::Int,
        signed: true,
    };

    /// A pointer to `pointee`
    pub fn pointer(pointee: CType, pointee_const: bool) -> Self {
        Self::Pointer {
            pointee: Box::new(pointee),
            pointee_const,
        }
    }

    /// A function type
    pub fn function(ret: CType, params: Vec<CType>, variadic: bool) -> Self {
        Self::Function(Box::new(FnType {
            ret,
            params,
            variadic,
        }))
    }

    /// Category of this type without following typedefs
    pub fn shallow_category(&self) -> TypeCategory {
        match self {
            Self::Void => TypeCategory::Void,
            Self::Bool => TypeCategory::Boolean,
            Self::Char(_) | Self::Int { .. } => TypeCategory::Integer,
            Self::Float(FloatKind::Float) => TypeCategory::SingleFloat,
            Self::Float(FloatKind::Double) => TypeCategory::DoubleFloat,
            Self::Float(FloatKind::LongDouble) => TypeCategory::ExtendedFloat,
            Self::Complex(FloatKind::Float) => TypeCategory::SingleComplex,
            Self::Complex(FloatKind::Double) => TypeCategory::DoubleComplex,
            Self::Complex(FloatKind::LongDouble) => TypeCategory::ExtendedComplex,
            Self::Pointer { pointee, .. } => match **pointee {
                Self::Function(_) => TypeCategory::FunctionPointer,
                _ => TypeCategory::Pointer,
            },
            Self::Array { .. } => TypeCategory::Array,
            Self::Function(_) => TypeCategory::Function,
            Self::Named(_) => TypeCategory::Opaque,
        }
    }

    /// The same type with every `const` qualifier dropped
    pub fn without_qualifiers(&self) -> Self {
        match self {
            Self::Pointer { pointee, .. } => Self::pointer(pointee.without_qualifiers(), false),
            Self::Array { element, len } => Self::Array {
                element: Box::new(element.without_qualifiers()),
                len: *len,
            },
            Self::Function(func) => Self::function(
                func.ret.without_qualifiers(),
                func.params.iter().map(Self::without_qualifiers).collect(),
                func.variadic,
            ),
            other => other.clone(),
        }
    }

    /// Renders the type in C abstract-declarator syntax
    pub fn display<'a>(&'a self, interner: &'a Interner) -> TypeDisplay<'a> {
        TypeDisplay {
            ty: self,
            interner,
        }
    }
}

/// [`fmt::Display`] adapter for [`CType`]
pub struct TypeDisplay<'a> {
    ty: &'a CType,
    interner: &'a Interner,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&render(self.ty, false, String::new(), self.interner))
    }
}

/// Builds the declaration of `inner` with type `ty`, inside-out
fn render(ty: &CType, is_const: bool, inner: String, interner: &Interner) -> String {
    let wrap = |inner: String| {
        if inner.starts_with('*') {
            format!("({inner})")
        } else {
            inner
        }
    };

    match ty {
        CType::Pointer {
            pointee,
            pointee_const,
        } => {
            let inner = if is_const {
                format!("* const{}", space_before(&inner))
            } else {
                format!("*{inner}")
            };
            render(pointee, *pointee_const, inner, interner)
        }
        CType::Array { element, len } => {
            let len = len.map(|len| len.to_string()).unwrap_or_default();
            render(element, is_const, format!("{}[{len}]", wrap(inner)), interner)
        }
        CType::Function(func) => {
            let mut params: Vec<String> = func
                .params
                .iter()
                .map(|param| render(param, false, String::new(), interner))
                .collect();
            if func.variadic {
                params.push("...".to_string());
            }
            let params = if params.is_empty() {
                "void".to_string()
            } else {
                params.join(", ")
            };
            render(&func.ret, false, format!("{}({params})", wrap(inner)), interner)
        }
        base => {
            let name = base_name(base, interner);
            let qualifier = if is_const { "const " } else { "" };
            format!("{qualifier}{name}{}", space_before(&inner))
        }
    }
}

fn space_before(inner: &str) -> String {
    if inner.is_empty() {
        String::new()
    } else {
        format!(" {inner}")
    }
}

fn base_name(ty: &CType, interner: &Interner) -> String {
    let name = match ty {
        CType::Void => "void",
        CType::Bool => "_Bool",
        CType::Char(Signedness::Plain) => "char",
        CType::Char(Signedness::Signed) => "signed char",
        CType::Char(Signedness::Unsigned) => "unsigned char",
        CType::Int { rank, signed } => return int_name(*rank, *signed),
        CType::Float(kind) => float_name(*kind),
        CType::Complex(kind) => return format!("_Complex {}", float_name(*kind)),
        CType::Named(name) => interner.resolve(name),
        CType::Pointer { .. } | CType::Array { .. } | CType::Function(_) => "?",
    };
    name.to_string()
}

fn float_name(kind: FloatKind) -> &'static str {
    match kind {
        FloatKind::Float => "float",
        FloatKind::Double => "double",
        FloatKind::LongDouble => "long double",
    }
}

fn int_name(rank: IntRank, signed: bool) -> String {
    let prefix = if signed { "" } else { "unsigned " };
    match rank {
        IntRank::Short => format!("{prefix}short"),
        IntRank::Int => format!("{prefix}int"),
        IntRank::Long => format!("{prefix}long"),
        IntRank::LongLong => format!("{prefix}long long"),
        IntRank::Exact(bits) => {
            let sign = if signed { "" } else { "u" };
            format!("{sign}int{bits}_t")
        }
        IntRank::Size => (if signed { "ssize_t" } else { "size_t" }).to_string(),
        IntRank::PtrSized => (if signed { "intptr_t" } else { "uintptr_t" }).to_string(),
    }
}
