//! Type lowering from C types to Rust type syntax

use crate::{BindingOptions, GenerateError, ident};
use cb_decl::{CType, DeclTable, FloatKind, FnType, IntRank, Signedness};

pub(crate) struct TypeLowering<'a> {
    table: &'a DeclTable,
    options: &'a BindingOptions,
    /// Set once any lowered type needed the complex shim
    pub(crate) uses_complex: bool,
}

impl<'a> TypeLowering<'a> {
    pub(crate) fn new(table: &'a DeclTable, options: &'a BindingOptions) -> Self {
        Self {
            table,
            options,
            uses_complex: false,
        }
    }

    /// Lower a C type used by `item` to a Rust type
    pub(crate) fn lower_type(&mut self, ty: &CType, item: &str) -> Result<String, GenerateError> {
        let table = self.table;
        let lowered = match ty {
            CType::Void => self.ffi("c_void"),
            CType::Bool => "bool".to_string(),
            CType::Char(Signedness::Plain) => self.ffi("c_char"),
            CType::Char(Signedness::Signed) => self.ffi("c_schar"),
            CType::Char(Signedness::Unsigned) => self.ffi("c_uchar"),
            CType::Int { rank, signed } => self.int(*rank, *signed),
            CType::Float(kind) => self.float(*kind, ty, item)?.to_string(),
            CType::Complex(kind) => {
                let component = self.float(*kind, ty, item)?;
                self.uses_complex = true;
                format!("{}<{component}>", self.options.complex_type)
            }
            CType::Pointer {
                pointee,
                pointee_const,
            } => {
                if let CType::Function(func) = table.resolve(pointee) {
                    return match &**pointee {
                        CType::Named(name) => Ok(ident::escape(table.name(*name))),
                        _ => self.fn_pointer(func, item),
                    };
                }
                let mutability = if *pointee_const { "const" } else { "mut" };
                format!("*{mutability} {}", self.lower_type(pointee, item)?)
            }
            CType::Array { element, len } => {
                format!("[{}; {}]", self.lower_type(element, item)?, len.unwrap_or(0))
            }
            CType::Function(func) => self.fn_pointer(func, item)?,
            CType::Named(name) => ident::escape(table.name(*name)),
        };
        Ok(lowered)
    }

    /// `(a: T, b: U, ...) -> R`, with `names` used where present
    pub(crate) fn signature(
        &mut self,
        func: &FnType,
        names: &[String],
        item: &str,
    ) -> Result<String, GenerateError> {
        let mut params = Vec::with_capacity(func.params.len() + 1);
        for (index, param) in func.params.iter().enumerate() {
            let ty = self.lower_type(param, item)?;
            params.push(match names.get(index) {
                Some(name) => format!("{name}: {ty}"),
                None => ty,
            });
        }
        if func.variadic {
            params.push("...".to_string());
        }

        let ret = if self.table.resolve(&func.ret) == &CType::Void {
            String::new()
        } else {
            format!(" -> {}", self.lower_type(&func.ret, item)?)
        };
        Ok(format!("({}){ret}", params.join(", ")))
    }

    fn fn_pointer(&mut self, func: &FnType, item: &str) -> Result<String, GenerateError> {
        let signature = self.signature(func, &[], item)?;
        Ok(format!("Option<unsafe extern \"C\" fn{signature}>"))
    }

    fn ffi(&self, name: &str) -> String {
        if self.options.ctypes_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}::{name}", self.options.ctypes_prefix)
        }
    }

    fn int(&self, rank: IntRank, signed: bool) -> String {
        let unsigned = if signed { "" } else { "u" };
        match rank {
            IntRank::Short => self.ffi(&format!("c_{unsigned}short")),
            IntRank::Int => self.ffi(&format!("c_{unsigned}int")),
            IntRank::Long => self.ffi(&format!("c_{unsigned}long")),
            IntRank::LongLong => self.ffi(&format!("c_{unsigned}longlong")),
            IntRank::Exact(bits) => format!("{}{bits}", if signed { "i" } else { "u" }),
            IntRank::Size | IntRank::PtrSized => (if signed { "isize" } else { "usize" }).to_string(),
        }
    }

    fn float(&self, kind: FloatKind, ty: &CType, item: &str) -> Result<&'static str, GenerateError> {
        match kind {
            FloatKind::Float => Ok("f32"),
            FloatKind::Double => Ok("f64"),
            FloatKind::LongDouble => Err(GenerateError::UnsupportedType {
                item: item.to_string(),
                ty: self.table.display_type(ty),
            }),
        }
    }
}
