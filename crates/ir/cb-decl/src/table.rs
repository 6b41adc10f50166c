//! Declaration table keyed by name

use crate::ty::{CType, TypeCategory};
use crate::{Decl, DeclKind};
use cb_intern::{Interner, Symbol};
use indexmap::IndexMap;
use la_arena::{Arena, Idx};

/// Handle to a declaration stored in a [`DeclTable`]
pub type DeclId = Idx<Decl>;

/// Typedef chains longer than this are treated as unresolvable
const MAX_ALIAS_DEPTH: usize = 64;

/// Outcome of [`DeclTable::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    /// First declaration of the name
    New(DeclId),
    /// The name was already declared; the table is unchanged
    Existing(DeclId),
}

/// First declaration of every name, in declaration order
#[derive(Debug)]
pub struct DeclTable {
    decls: Arena<Decl>,
    by_name: IndexMap<Symbol, DeclId>,
    interner: Interner,
}

impl DeclTable {
    /// Creates an empty table resolving names through `interner`
    pub fn new(interner: Interner) -> Self {
        Self {
            decls: Arena::new(),
            by_name: IndexMap::new(),
            interner,
        }
    }

    /// Adds `decl` unless its name is already declared
    pub fn insert(&mut self, decl: Decl) -> Inserted {
        if let Some(&existing) = self.by_name.get(&decl.name) {
            return Inserted::Existing(existing);
        }
        let name = decl.name;
        let id = self.decls.alloc(decl);
        self.by_name.insert(name, id);
        Inserted::New(id)
    }

    /// Looks up a declaration by name
    pub fn lookup(&self, name: &str) -> Option<&Decl> {
        self.interner
            .get(name)
            .and_then(|symbol| self.lookup_symbol(symbol))
    }

    /// Looks up a declaration by interned name
    pub fn lookup_symbol(&self, name: Symbol) -> Option<&Decl> {
        self.by_name.get(&name).map(|id| &self.decls[*id])
    }

    /// Declarations in first-declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Decl> {
        self.by_name.values().map(|id| &self.decls[*id])
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether nothing has been declared
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// The interner used for names
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Resolves a name to its string
    pub fn name(&self, symbol: Symbol) -> &str {
        self.interner.resolve(&symbol)
    }

    /// Target of a typedef name, if the name is a typedef in this table
    pub fn alias_target(&self, name: Symbol) -> Option<&CType> {
        match self.lookup_symbol(name).map(|decl| &decl.kind) {
            Some(DeclKind::TypeAlias { target, .. }) => Some(target),
            _ => None,
        }
    }

    /// Whether `ty` names a typedef whose objects are `const`
    pub fn is_const_alias(&self, ty: &CType) -> bool {
        match ty {
            CType::Named(name) => matches!(
                self.lookup_symbol(*name).map(|decl| &decl.kind),
                Some(DeclKind::TypeAlias { is_const: true, .. })
            ),
            _ => false,
        }
    }

    /// Follows typedef names at the top level only
    pub fn resolve<'ty>(&'ty self, ty: &'ty CType) -> &'ty CType {
        let mut current = ty;
        for _ in 0..MAX_ALIAS_DEPTH {
            match current {
                CType::Named(name) => match self.alias_target(*name) {
                    Some(target) => current = target,
                    None => return current,
                },
                _ => return current,
            }
        }
        current
    }

    /// Replaces every typedef name inside `ty` with its target
    pub fn canonical(&self, ty: &CType) -> CType {
        self.canonical_at(ty, 0)
    }

    fn canonical_at(&self, ty: &CType, depth: usize) -> CType {
        if depth > MAX_ALIAS_DEPTH {
            return ty.clone();
        }
        match ty {
            CType::Named(name) => match self.alias_target(*name) {
                Some(target) => self.canonical_at(target, depth + 1),
                None => ty.clone(),
            },
            CType::Pointer {
                pointee,
                pointee_const,
            } => CType::pointer(
                self.canonical_at(pointee, depth + 1),
                *pointee_const || self.is_const_alias(pointee),
            ),
            CType::Array { element, len } => CType::Array {
                element: Box::new(self.canonical_at(element, depth + 1)),
                len: *len,
            },
            CType::Function(func) => CType::function(
                self.canonical_at(&func.ret, depth + 1),
                func.params
                    .iter()
                    .map(|param| self.canonical_at(param, depth + 1))
                    .collect(),
                func.variadic,
            ),
            other => other.clone(),
        }
    }

    /// Category of `ty` after typedef resolution
    pub fn category(&self, ty: &CType) -> TypeCategory {
        self.canonical(ty).shallow_category()
    }

    /// Whether values of `ty` can be called
    pub fn is_callable(&self, ty: &CType) -> bool {
        matches!(
            self.category(ty),
            TypeCategory::FunctionPointer | TypeCategory::Function
        )
    }

    /// Whether `ty` is a pointer through which a callee can store a scalar
    pub fn is_out_param(&self, ty: &CType) -> bool {
        match self.canonical(ty) {
            CType::Pointer {
                pointee,
                pointee_const,
            } => !pointee_const && pointee.shallow_category().is_scalar(),
            _ => false,
        }
    }

    /// Renders `ty` in C syntax
    pub fn display_type(&self, ty: &CType) -> String {
        ty.display(&self.interner).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FloatKind, IntRank, Linkage};
    use cb_span::{FileId, FileSpan, Span};

    fn decl(interner: &Interner, name: &str, kind: DeclKind) -> Decl {
        Decl {
            name: interner.intern(name),
            kind,
            span: FileSpan::new(FileId(0), Span::new(0, 0)),
        }
    }

    fn alias(interner: &Interner, name: &str, target: CType) -> Decl {
        decl(interner, name, DeclKind::TypeAlias { target, is_const: false })
    }

    #[test]
    fn test_first_declaration_wins() {
        let interner = Interner::new();
        let mut table = DeclTable::new(interner.clone());

        let global = |ty| DeclKind::Global {
            ty,
            linkage: Linkage::External,
            is_const: false,
        };
        let first = table.insert(decl(&interner, "global", global(CType::INT)));
        let second = table.insert(decl(&interner, "global", global(CType::Bool)));

        let Inserted::New(id) = first else {
            panic!("expected a new declaration, got {first:?}");
        };
        assert_eq!(second, Inserted::Existing(id));
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("global").map(|decl| decl.kind.ty()), Some(CType::INT));
    }

    #[test]
    fn test_resolve_and_canonical() {
        let interner = Interner::new();
        let mut table = DeclTable::new(interner.clone());
        let short = CType::Int {
            rank: IntRank::Short,
            signed: true,
        };
        table.insert(alias(&interner, "myint", short.clone()));
        table.insert(alias(&interner, "alias_t", CType::Named(interner.intern("myint"))));

        let ptr = CType::pointer(CType::Named(interner.intern("alias_t")), false);
        assert_eq!(table.canonical(&ptr), CType::pointer(short.clone(), false));
        assert_eq!(table.resolve(&CType::Named(interner.intern("alias_t"))), &short);
        assert_eq!(table.display_type(&ptr), "alias_t *");
    }

    #[test]
    fn test_callable_and_out_params() {
        let interner = Interner::new();
        let mut table = DeclTable::new(interner.clone());
        let binop = CType::pointer(CType::function(CType::INT, vec![CType::INT, CType::INT], false), false);
        table.insert(alias(&interner, "binop_t", binop));
        table.insert(alias(&interner, "intPointer", CType::pointer(CType::INT, false)));

        let binop_t = CType::Named(interner.intern("binop_t"));
        let int_pointer = CType::Named(interner.intern("intPointer"));

        assert!(table.is_callable(&binop_t));
        assert_eq!(table.category(&binop_t), TypeCategory::FunctionPointer);
        assert!(!table.is_out_param(&binop_t));
        assert!(table.is_out_param(&int_pointer));
        assert!(!table.is_out_param(&CType::pointer(CType::INT, true)));
        assert!(!table.is_out_param(&CType::pointer(CType::Void, false)));
        assert_eq!(
            table.category(&CType::Complex(FloatKind::Float)),
            TypeCategory::SingleComplex
        );
    }

    #[test]
    fn test_const_alias_is_not_out_param() {
        let interner = Interner::new();
        let mut table = DeclTable::new(interner.clone());
        table.insert(decl(
            &interner,
            "cint",
            DeclKind::TypeAlias {
                target: CType::INT,
                is_const: true,
            },
        ));

        let cint = CType::Named(interner.intern("cint"));
        assert!(table.is_const_alias(&cint));
        assert!(!table.is_out_param(&CType::pointer(cint.clone(), false)));
        assert_eq!(
            table.canonical(&CType::pointer(cint, false)),
            CType::pointer(CType::INT, true)
        );
    }

    #[test]
    fn test_unknown_name_is_opaque() {
        let interner = Interner::new();
        let table = DeclTable::new(interner.clone());

        let missing = CType::Named(interner.intern("missing_t"));
        assert_eq!(table.category(&missing), TypeCategory::Opaque);
        assert!(table.is_empty());
    }
}
