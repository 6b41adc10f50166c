//! Raw syntax → typed declarations

use crate::error::LowerError;
use crate::ty::{CType, FloatKind, IntRank, Signedness};
use crate::{Decl, DeclKind, Linkage};
use cb_intern::{Interner, Symbol};
use cb_span::{FileId, FileSpan, Span};
use cb_syntax::{
    DeclSpecifiers, Declaration, Declarator, Derivation, ParamList, SpecifierKind, StorageClass,
    TranslationUnit, TypeSpecifier,
};
use miette::SourceSpan;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::hash_map::Entry;

/// Declarations and errors produced from one translation unit
#[derive(Debug, Default)]
pub struct LowerResult {
    /// Every declared name, in source order, duplicates included
    pub decls: Vec<Decl>,
    /// Declarations that could not be lowered
    pub errors: Vec<LowerError>,
}

/// Context for lowering raw declarations into [`Decl`]s
///
/// Typedefs are remembered across calls to [`LoweringContext::lower_unit`],
/// so headers lowered through the same context can use each other's types.
#[derive(Debug)]
pub struct LoweringContext {
    /// String interner
    pub interner: Interner,
    /// Targets of every typedef seen so far, first declaration wins
    typedefs: FxHashMap<Symbol, CType>,
    /// Typedefs declared with `const`
    const_typedefs: FxHashSet<Symbol>,
    /// File ID for creating spans
    file_id: FileId,
}

/// A declarator folded over its base type
struct Folded {
    ty: CType,
    /// The outermost type carries `const`
    is_const: bool,
}

impl LoweringContext {
    /// Create a new lowering context
    pub fn new(interner: Interner) -> Self {
        Self {
            interner,
            typedefs: FxHashMap::default(),
            const_typedefs: FxHashSet::default(),
            file_id: FileId(0),
        }
    }

    /// Target of a typedef lowered so far
    pub fn typedef(&self, name: &str) -> Option<&CType> {
        self.interner
            .get(name)
            .and_then(|symbol| self.typedefs.get(&symbol))
    }

    /// Lower every declaration of `unit`, attributing spans to `file`
    pub fn lower_unit(&mut self, unit: &TranslationUnit, file: FileId) -> LowerResult {
        self.file_id = file;
        let mut result = LowerResult::default();

        for declaration in &unit.declarations {
            self.lower_declaration(declaration, &mut result);
        }

        result
    }

    fn lower_declaration(&mut self, declaration: &Declaration, result: &mut LowerResult) {
        let base = match self.base_type(&declaration.specifiers) {
            Ok(base) => base,
            Err(error) => {
                result.errors.push(error);
                return;
            }
        };

        for (index, declarator) in declaration.declarators.iter().enumerate() {
            let has_body = index == 0 && declaration.body.is_some();
            match self.lower_declarator(declaration, &base, declarator, has_body) {
                Ok(decl) => {
                    if let DeclKind::TypeAlias { target, is_const } = &decl.kind {
                        if let Entry::Vacant(entry) = self.typedefs.entry(decl.name) {
                            entry.insert(target.clone());
                            if *is_const {
                                self.const_typedefs.insert(decl.name);
                            }
                        }
                    }
                    result.decls.push(decl);
                }
                Err(error) => result.errors.push(error),
            }
        }
    }

    fn lower_declarator(
        &self,
        declaration: &Declaration,
        base: &CType,
        declarator: &Declarator,
        has_body: bool,
    ) -> Result<Decl, LowerError> {
        let Some(ident) = &declarator.name else {
            return Err(LowerError::InvalidDeclarator {
                name: "<abstract>".to_string(),
                reason: "declaration does not declare anything".to_string(),
                span: source_span(declarator.span),
            });
        };
        let name = self.interner.intern(&ident.text);
        let folded = self.fold(
            base.clone(),
            declaration.specifiers.is_const || self.is_const_typedef(base),
            &declarator.derivations,
            &ident.text,
            declarator.span,
        )?;

        let linkage = match declaration.storage {
            Some(StorageClass::Static) => Linkage::Internal,
            _ => Linkage::External,
        };

        let kind = if declaration.storage == Some(StorageClass::Typedef) {
            DeclKind::TypeAlias {
                target: folded.ty,
                is_const: folded.is_const,
            }
        } else if let CType::Function(func) = self.resolve(&folded.ty) {
            let param_names = match declarator.function_params() {
                Some(list) => list
                    .params
                    .iter()
                    .map(|param| param.declarator.name.as_ref())
                    .map(|name| name.map(|name| self.interner.intern(&name.text)))
                    .collect(),
                None => vec![None; func.params.len()],
            };
            DeclKind::Function {
                ty: (**func).clone(),
                param_names,
                linkage,
                has_body,
            }
        } else {
            if self.resolve(&folded.ty) == &CType::Void {
                return Err(LowerError::VoidObject {
                    name: ident.text.clone(),
                    span: source_span(declarator.span),
                });
            }
            DeclKind::Global {
                ty: folded.ty,
                linkage,
                is_const: folded.is_const,
            }
        };

        Ok(Decl {
            name,
            kind,
            span: FileSpan::new(self.file_id, declarator.span),
        })
    }

    /// Applies derivations to `base`, innermost first
    fn fold(
        &self,
        base: CType,
        base_const: bool,
        derivations: &[Derivation],
        name: &str,
        span: Span,
    ) -> Result<Folded, LowerError> {
        let invalid = |reason: &str| LowerError::InvalidDeclarator {
            name: name.to_string(),
            reason: reason.to_string(),
            span: source_span(span),
        };

        let mut ty = base;
        let mut is_const = base_const;

        for derivation in derivations {
            match derivation {
                Derivation::Pointer { is_const: pointer_const } => {
                    ty = CType::pointer(ty, is_const);
                    is_const = *pointer_const;
                }
                Derivation::Array(len) => {
                    match self.resolve(&ty) {
                        CType::Function(_) => return Err(invalid("array of functions")),
                        CType::Void => return Err(invalid("array of `void`")),
                        _ => {}
                    }
                    ty = CType::Array {
                        element: Box::new(ty),
                        len: *len,
                    };
                }
                Derivation::Function(params) => {
                    match self.resolve(&ty) {
                        CType::Function(_) => return Err(invalid("function returning a function")),
                        CType::Array { .. } => return Err(invalid("function returning an array")),
                        _ => {}
                    }
                    let (param_types, variadic) = self.lower_params(params, name)?;
                    ty = CType::function(ty, param_types, variadic);
                    is_const = false;
                }
            }
        }

        Ok(Folded { ty, is_const })
    }

    fn lower_params(&self, list: &ParamList, function: &str) -> Result<(Vec<CType>, bool), LowerError> {
        let mut params = Vec::with_capacity(list.params.len());

        for (index, param) in list.params.iter().enumerate() {
            let base = self.base_type(&param.specifiers)?;
            let name = match &param.declarator.name {
                Some(ident) => ident.text.clone(),
                None => format!("parameter {} of `{function}`", index + 1),
            };
            let base_const = param.specifiers.is_const || self.is_const_typedef(&base);
            let folded = self.fold(
                base,
                base_const,
                &param.declarator.derivations,
                &name,
                param.declarator.span,
            )?;

            if self.resolve(&folded.ty) == &CType::Void {
                return Err(LowerError::VoidObject {
                    name,
                    span: source_span(param.span),
                });
            }
            params.push(self.decay(folded.ty, folded.is_const));
        }

        Ok((params, list.variadic))
    }

    /// Parameter adjustment: arrays and functions become pointers
    fn decay(&self, ty: CType, is_const: bool) -> CType {
        if let CType::Array { element, .. } = ty {
            return CType::pointer(*element, is_const);
        }
        match self.resolve(&ty).clone() {
            CType::Function(_) => CType::pointer(ty, false),
            CType::Array { element, .. } => CType::pointer(*element, false),
            _ => ty,
        }
    }

    fn is_const_typedef(&self, ty: &CType) -> bool {
        matches!(ty, CType::Named(name) if self.const_typedefs.contains(name))
    }

    /// Follows typedef names to the first non-typedef type
    fn resolve<'ty>(&'ty self, ty: &'ty CType) -> &'ty CType {
        let mut current = ty;
        while let CType::Named(name) = current {
            match self.typedefs.get(name) {
                Some(target) if target != current => current = target,
                _ => break,
            }
        }
        current
    }

    /// The type named by a declaration's specifiers
    fn base_type(&self, specifiers: &DeclSpecifiers) -> Result<CType, LowerError> {
        let span = source_span(specifiers.span);
        let written = specifiers
            .types
            .iter()
            .map(|spec| spec.kind.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let invalid = || LowerError::InvalidSpecifiers {
            specifiers: if written.is_empty() {
                "<none>".to_string()
            } else {
                written.clone()
            },
            span,
        };

        if let [TypeSpecifier { kind: SpecifierKind::Named(name), span: name_span }] =
            specifiers.types.as_slice()
        {
            return self.named_type(name, source_span(*name_span));
        }

        let mut counts = SpecifierCounts::default();
        for spec in &specifiers.types {
            let slot = match spec.kind {
                SpecifierKind::Void => &mut counts.void,
                SpecifierKind::Bool => &mut counts.bool,
                SpecifierKind::Char => &mut counts.char,
                SpecifierKind::Short => &mut counts.short,
                SpecifierKind::Int => &mut counts.int,
                SpecifierKind::Long => &mut counts.long,
                SpecifierKind::Float => &mut counts.float,
                SpecifierKind::Double => &mut counts.double,
                SpecifierKind::Signed => &mut counts.signed,
                SpecifierKind::Unsigned => &mut counts.unsigned,
                SpecifierKind::Complex => &mut counts.complex,
                SpecifierKind::Named(_) => return Err(invalid()),
            };
            *slot += 1;
        }

        counts.build().ok_or_else(invalid)
    }

    fn named_type(&self, name: &str, span: SourceSpan) -> Result<CType, LowerError> {
        if let Some(builtin) = builtin_typedef(name) {
            return Ok(builtin);
        }
        match self.interner.get(name) {
            Some(symbol) if self.typedefs.contains_key(&symbol) => Ok(CType::Named(symbol)),
            _ => Err(LowerError::UnknownType {
                name: name.to_string(),
                span,
            }),
        }
    }
}

/// How often each keyword specifier appears
#[derive(Default)]
struct SpecifierCounts {
    void: u8,
    bool: u8,
    char: u8,
    short: u8,
    int: u8,
    long: u8,
    float: u8,
    double: u8,
    signed: u8,
    unsigned: u8,
    complex: u8,
}

impl SpecifierCounts {
    fn build(&self) -> Option<CType> {
        let sign = self.signed + self.unsigned;
        let floating = self.float + self.double + self.complex;
        let integer = self.char + self.short + self.int + self.long + sign;
        let special = self.void + self.bool;

        if sign > 1 || self.int > 1 || self.short > 1 || self.long > 2 || self.complex > 1 {
            return None;
        }

        if special > 0 {
            return match (self.void, self.bool, integer + floating) {
                (1, 0, 0) => Some(CType::Void),
                (0, 1, 0) => Some(CType::Bool),
                _ => None,
            };
        }

        if floating > 0 {
            if integer > self.long || self.float + self.double != 1 {
                return None;
            }
            let kind = match (self.float, self.long) {
                (1, 0) => FloatKind::Float,
                (0, 0) => FloatKind::Double,
                (0, 1) => FloatKind::LongDouble,
                _ => return None,
            };
            return Some(if self.complex == 1 {
                CType::Complex(kind)
            } else {
                CType::Float(kind)
            });
        }

        if self.char == 1 {
            if self.short + self.int + self.long > 0 {
                return None;
            }
            let signedness = match (self.signed, self.unsigned) {
                (1, _) => Signedness::Signed,
                (_, 1) => Signedness::Unsigned,
                _ => Signedness::Plain,
            };
            return Some(CType::Char(signedness));
        }

        let rank = match (self.short, self.long) {
            (0, 0) if integer > 0 => IntRank::Int,
            (1, 0) => IntRank::Short,
            (0, 1) => IntRank::Long,
            (0, 2) => IntRank::LongLong,
            _ => return None,
        };
        Some(CType::Int {
            rank,
            signed: self.unsigned == 0,
        })
    }
}

/// Types of the typedef names every header may use
fn builtin_typedef(name: &str) -> Option<CType> {
    let int = |rank, signed| Some(CType::Int { rank, signed });
    match name {
        "size_t" => int(IntRank::Size, false),
        "ssize_t" => int(IntRank::Size, true),
        "ptrdiff_t" | "intptr_t" => int(IntRank::PtrSized, true),
        "uintptr_t" => int(IntRank::PtrSized, false),
        "int8_t" => int(IntRank::Exact(8), true),
        "int16_t" => int(IntRank::Exact(16), true),
        "int32_t" => int(IntRank::Exact(32), true),
        "int64_t" => int(IntRank::Exact(64), true),
        "uint8_t" => int(IntRank::Exact(8), false),
        "uint16_t" => int(IntRank::Exact(16), false),
        "uint32_t" => int(IntRank::Exact(32), false),
        "uint64_t" => int(IntRank::Exact(64), false),
        _ => None,
    }
}

fn source_span(span: Span) -> SourceSpan {
    (span.start as usize, span.len() as usize).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeclClass;
    use cb_parser::parse_source;

    fn lower(source: &str) -> (LoweringContext, LowerResult) {
        let parsed = parse_source(source);
        assert!(parsed.is_ok(), "{:?}", parsed.errors);
        let mut ctx = LoweringContext::new(Interner::new());
        let result = ctx.lower_unit(&parsed.unit, FileId(0));
        (ctx, result)
    }

    fn show(ctx: &LoweringContext, ty: &CType) -> String {
        ty.display(&ctx.interner).to_string()
    }

    fn find<'r>(ctx: &LoweringContext, result: &'r LowerResult, name: &str) -> &'r Decl {
        result
            .decls
            .iter()
            .find(|decl| ctx.interner.resolve(&decl.name) == name)
            .unwrap_or_else(|| panic!("`{name}` was not lowered"))
    }

    #[test]
    fn test_lower_typedefs_and_prototypes() {
        let (ctx, result) = lower(
            "typedef short myint;\nint add(int a, int b);\ntypedef int (*binop_t) (int, int);\nint doCallback(int a, int b, binop_t cb);\n",
        );

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.decls.len(), 4);

        let myint = find(&ctx, &result, "myint");
        assert_eq!(myint.kind.class(), DeclClass::TypeAlias);
        assert_eq!(show(&ctx, &myint.kind.ty()), "short");

        let binop = find(&ctx, &result, "binop_t");
        assert_eq!(show(&ctx, &binop.kind.ty()), "int (*)(int, int)");

        let callback = find(&ctx, &result, "doCallback");
        let DeclKind::Function { ty, param_names, linkage, has_body } = &callback.kind else {
            panic!("expected a function, got {:?}", callback.kind);
        };
        assert_eq!(show(&ctx, &CType::Function(Box::new(ty.clone()))), "int (int, int, binop_t)");
        let names: Vec<_> = param_names
            .iter()
            .map(|name| name.map(|name| ctx.interner.resolve(&name).to_string()))
            .collect();
        assert_eq!(names, vec![Some("a".to_string()), Some("b".to_string()), Some("cb".to_string())]);
        assert_eq!(*linkage, Linkage::External);
        assert!(!has_body);
    }

    #[test]
    fn test_lower_globals() {
        let (ctx, result) = lower(
            "extern int global;\nextern _Bool globalBool;\nextern _Complex double globalComplexDouble;\nextern const char *const name;\nstatic unsigned long long counter;",
        );

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let types: Vec<_> = result
            .decls
            .iter()
            .map(|decl| show(&ctx, &decl.kind.ty()))
            .collect();
        assert_eq!(
            types,
            vec!["int", "_Bool", "_Complex double", "const char *", "unsigned long long"]
        );

        let name = find(&ctx, &result, "name");
        assert!(matches!(name.kind, DeclKind::Global { is_const: true, .. }));
        let counter = find(&ctx, &result, "counter");
        assert_eq!(counter.kind.linkage(), Some(Linkage::Internal));
    }

    #[test]
    fn test_specifier_combinations() {
        let (ctx, result) = lower(
            "long int a; unsigned b; signed char c; long double d; _Complex float e; long long unsigned int f; uint32_t g; size_t h;",
        );

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let types: Vec<_> = result
            .decls
            .iter()
            .map(|decl| show(&ctx, &decl.kind.ty()))
            .collect();
        assert_eq!(
            types,
            vec![
                "long",
                "unsigned int",
                "signed char",
                "long double",
                "_Complex float",
                "unsigned long long",
                "uint32_t",
                "size_t",
            ]
        );
    }

    #[test]
    fn test_invalid_specifiers() {
        let (_, result) = lower("short double x; _Complex y; signed unsigned z; void int w;");

        assert_eq!(result.errors.len(), 4);
        assert!(
            result
                .errors
                .iter()
                .all(|error| matches!(error, LowerError::InvalidSpecifiers { .. }))
        );
        assert!(matches!(
            &result.errors[0],
            LowerError::InvalidSpecifiers { specifiers, .. } if specifiers == "short double"
        ));
    }

    #[test]
    fn test_parameters_decay() {
        let (ctx, result) = lower("typedef int handler_t(int);\nvoid install(handler_t h, int values[4], const char names[]);");

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let install = find(&ctx, &result, "install");
        assert_eq!(
            show(&ctx, &install.kind.ty()),
            "void (handler_t *, int *, const char *)"
        );
    }

    #[test]
    fn test_function_typedef_declares_function() {
        let (ctx, result) = lower("typedef int handler_t(int);\nhandler_t on_event;");

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let on_event = find(&ctx, &result, "on_event");
        let DeclKind::Function { param_names, .. } = &on_event.kind else {
            panic!("expected a function, got {:?}", on_event.kind);
        };
        assert_eq!(param_names, &vec![None]);
    }

    #[test]
    fn test_invalid_declarators() {
        let (_, result) = lower("int make(void)(int);\nint table[3](void);\nint (grid(void))[2];\nvoid nothing;\nvoid take(int a, void b);");

        let reasons: Vec<_> = result
            .errors
            .iter()
            .map(|error| match error {
                LowerError::InvalidDeclarator { reason, .. } => reason.clone(),
                other => other.to_string(),
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                "function returning a function",
                "array of functions",
                "function returning an array",
                "`nothing` declared with incomplete type `void`",
                "`b` declared with incomplete type `void`",
            ]
        );
        assert!(result.decls.is_empty());
    }

    #[test]
    fn test_const_typedef_qualifies_its_uses() {
        let (ctx, result) = lower(
            "typedef const int cint;\ntypedef cint cint2;\nextern cint limit;\nvoid read_into(cint *out);\nextern cint2 *cursor;",
        );

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(find(&ctx, &result, "cint").kind.is_const());
        assert!(find(&ctx, &result, "cint2").kind.is_const());
        assert!(find(&ctx, &result, "limit").kind.is_const());

        let read_into = find(&ctx, &result, "read_into");
        assert_eq!(show(&ctx, &read_into.kind.ty()), "void (const cint *)");
        let cursor = find(&ctx, &result, "cursor");
        assert_eq!(show(&ctx, &cursor.kind.ty()), "const cint2 *");
        assert!(!cursor.kind.is_const());
    }

    #[test]
    fn test_static_definition_has_body() {
        let (ctx, result) = lower("static inline int twice(int x) { return x + x; }");

        let twice = find(&ctx, &result, "twice");
        assert!(matches!(
            twice.kind,
            DeclKind::Function { linkage: Linkage::Internal, has_body: true, .. }
        ));
    }

    #[test]
    fn test_typedefs_persist_across_units() {
        let mut ctx = LoweringContext::new(Interner::new());
        let mut names = cb_parser::TypedefNames::with_builtins();

        let first = cb_parser::parse_header("a.h", "typedef int handle_t;", &mut names);
        let second = cb_parser::parse_header("b.h", "handle_t open_handle(void);", &mut names);
        ctx.lower_unit(&first.unit, FileId(0));
        let result = ctx.lower_unit(&second.unit, FileId(1));

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.decls[0].span.file, FileId(1));
        assert_eq!(ctx.typedef("handle_t"), Some(&CType::INT));
    }
}
