//! Duplicate declaration detection
//!
//! C headers routinely repeat prototypes and `extern` declarations. Merging
//! lowered declarations into a [`DeclTable`] keeps the first occurrence of
//! every name; later occurrences are either harmless redeclarations or
//! conflicts, depending on whether they agree with the first one.

pub mod conflict;

pub use conflict::{ConflictError, ConflictReason};

use cb_decl::{Decl, DeclClass, DeclTable, Linkage};
use cb_span::FileSpan;
use serde::Serialize;

/// A redeclaration that matches the first declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redeclaration {
    /// Declared name
    pub name: String,
    /// What the name declares
    pub kind: DeclClass,
    /// First occurrence
    pub first: FileSpan,
    /// Repeated occurrence
    pub second: FileSpan,
}

/// Result of merging declarations into a table
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Harmless redeclarations
    pub duplicates: Vec<Redeclaration>,
    /// Redeclarations that disagree with the first declaration
    pub conflicts: Vec<ConflictError>,
}

/// Duplicate detector
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateDetector {
    /// Treat declarations differing only in `const` as the same
    ignore_qualifiers: bool,
}

impl DuplicateDetector {
    /// Create a new duplicate detector with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether `const` differences are ignored
    #[must_use]
    pub fn with_ignore_qualifiers(mut self, ignore: bool) -> Self {
        self.ignore_qualifiers = ignore;
        self
    }

    /// Insert `decls` into `table` in order, classifying repeated names
    pub fn merge(&self, table: &mut DeclTable, decls: Vec<Decl>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for decl in decls {
            match table.lookup_symbol(decl.name) {
                Some(first) => match self.compare(table, first, &decl) {
                    None => outcome.duplicates.push(Redeclaration {
                        name: table.name(decl.name).to_string(),
                        kind: decl.kind.class(),
                        first: first.span,
                        second: decl.span,
                    }),
                    Some(reason) => outcome.conflicts.push(conflict(table, first, &decl, reason)),
                },
                None => {
                    table.insert(decl);
                }
            }
        }

        outcome
    }

    /// Why `second` conflicts with `first`, or `None` if it is compatible
    pub fn compare(&self, table: &DeclTable, first: &Decl, second: &Decl) -> Option<ConflictReason> {
        if first.kind.class() != second.kind.class() {
            return Some(ConflictReason::KindMismatch);
        }
        // A later `extern` or storage-less declaration inherits internal
        // linkage; only `static` after an external declaration conflicts
        if first.kind.linkage() == Some(Linkage::External)
            && second.kind.linkage() == Some(Linkage::Internal)
        {
            return Some(ConflictReason::LinkageMismatch);
        }

        let first_ty = table.canonical(&first.kind.ty());
        let second_ty = table.canonical(&second.kind.ty());
        if first_ty != second_ty {
            let unqualified = first_ty.without_qualifiers() == second_ty.without_qualifiers();
            return match (unqualified, self.ignore_qualifiers) {
                (true, true) => None,
                (true, false) => Some(ConflictReason::QualifierMismatch),
                (false, _) => Some(ConflictReason::TypeMismatch),
            };
        }

        if first.kind.is_const() != second.kind.is_const() && !self.ignore_qualifiers {
            return Some(ConflictReason::QualifierMismatch);
        }
        None
    }
}

fn conflict(table: &DeclTable, first: &Decl, second: &Decl, reason: ConflictReason) -> ConflictError {
    let name = table.name(second.name).to_string();
    let describe = |decl: &Decl| {
        let ty = table.display_type(&decl.kind.ty());
        if decl.kind.is_const() {
            format!("{} const {ty}", decl.kind.class())
        } else {
            format!("{} {ty}", decl.kind.class())
        }
    };

    ConflictError {
        previous: format!("`{name}` was first declared as {}", describe(first)),
        second_ty: table.display_type(&second.kind.ty()),
        name,
        reason,
        span: (second.span.span.start as usize, second.span.span.len() as usize).into(),
        first: first.span,
        location: second.span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_decl::LoweringContext;
    use cb_intern::Interner;
    use cb_parser::parse_source;
    use cb_span::FileId;

    const FIXTURE: &str = "typedef short myint;
int add(int a, int b);
typedef int (*binop_t) (int, int);
int doCallback(int a, int b, binop_t cb);
typedef int * intPointer;
void store(int value, int *ptr);

// test globals
extern int global;
extern _Bool globalBool;
extern _Complex double globalComplexDouble;

// test duplicate definitions
int add(int a, int b);
extern int global;
";

    fn merge(source: &str, detector: DuplicateDetector) -> (DeclTable, MergeOutcome) {
        let parsed = parse_source(source);
        assert!(parsed.is_ok(), "{:?}", parsed.errors);
        let interner = Interner::new();
        let mut ctx = LoweringContext::new(interner.clone());
        let lowered = ctx.lower_unit(&parsed.unit, FileId(0));
        assert!(lowered.errors.is_empty(), "{:?}", lowered.errors);

        let mut table = DeclTable::new(interner);
        let outcome = detector.merge(&mut table, lowered.decls);
        (table, outcome)
    }

    fn reasons(outcome: &MergeOutcome) -> Vec<ConflictReason> {
        outcome.conflicts.iter().map(|conflict| conflict.reason).collect()
    }

    #[test]
    fn test_reference_header_duplicates() {
        let (table, outcome) = merge(FIXTURE, DuplicateDetector::new());

        let names: Vec<_> = outcome.duplicates.iter().map(|dup| dup.name.as_str()).collect();
        assert_eq!(names, vec!["add", "global"]);
        assert_eq!(outcome.duplicates[0].kind, DeclClass::Function);
        assert_eq!(outcome.duplicates[1].kind, DeclClass::Global);
        assert!(outcome.duplicates[0].first.span.start < outcome.duplicates[0].second.span.start);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(table.len(), 9);
    }

    #[test]
    fn test_conflicting_return_type() {
        let (table, outcome) = merge("int add(int, int);\nlong add(int, int);", DuplicateDetector::new());

        assert!(outcome.duplicates.is_empty());
        assert_eq!(reasons(&outcome), vec![ConflictReason::TypeMismatch]);

        let conflict = &outcome.conflicts[0];
        assert_eq!(conflict.to_string(), "conflicting declaration of `add`: types differ");
        assert_eq!(conflict.second_ty, "long (int, int)");
        assert_eq!(conflict.previous, "`add` was first declared as function int (int, int)");

        let add = table.lookup("add").map(|decl| table.display_type(&decl.kind.ty()));
        assert_eq!(add.as_deref(), Some("int (int, int)"));
    }

    #[test]
    fn test_kind_and_linkage_mismatch() {
        let (_, outcome) = merge(
            "int thing;\nint thing(void);\nextern int count;\nstatic int count;\nint helper(void);\nstatic int helper(void);",
            DuplicateDetector::new(),
        );

        assert_eq!(
            reasons(&outcome),
            vec![
                ConflictReason::KindMismatch,
                ConflictReason::LinkageMismatch,
                ConflictReason::LinkageMismatch,
            ]
        );
    }

    #[test]
    fn test_redeclaration_inherits_internal_linkage() {
        let (table, outcome) = merge(
            "static int count;\nextern int count;\nstatic int helper(void);\nint helper(void);",
            DuplicateDetector::new(),
        );

        assert!(outcome.conflicts.is_empty(), "{:?}", outcome.conflicts);
        let names: Vec<_> = outcome.duplicates.iter().map(|dup| dup.name.as_str()).collect();
        assert_eq!(names, vec!["count", "helper"]);
        assert_eq!(
            table.lookup("count").and_then(|decl| decl.kind.linkage()),
            Some(Linkage::Internal)
        );
    }

    #[test]
    fn test_const_typedef_matches_spelled_out_const() {
        let (_, outcome) = merge(
            "typedef const int cint;\nextern const int *p;\nextern cint *p;\nextern const int limit;\nextern cint limit;",
            DuplicateDetector::new(),
        );
        assert!(outcome.conflicts.is_empty(), "{:?}", outcome.conflicts);
        assert_eq!(outcome.duplicates.len(), 2);

        let (_, retyped) = merge(
            "typedef const int cint;\ntypedef int cint;",
            DuplicateDetector::new(),
        );
        assert_eq!(reasons(&retyped), vec![ConflictReason::QualifierMismatch]);
    }

    #[test]
    fn test_qualifier_mismatch() {
        let source = "void put(const char *text);\nvoid put(char *text);\nextern const int limit;\nextern int limit;";

        let (_, strict) = merge(source, DuplicateDetector::new());
        assert_eq!(
            reasons(&strict),
            vec![ConflictReason::QualifierMismatch, ConflictReason::QualifierMismatch]
        );

        let (_, relaxed) = merge(source, DuplicateDetector::new().with_ignore_qualifiers(true));
        assert!(relaxed.conflicts.is_empty());
        assert_eq!(relaxed.duplicates.len(), 2);
    }

    #[test]
    fn test_typedef_spelling_is_not_a_conflict() {
        let (_, outcome) = merge(
            "typedef int myint_t;\nint get(void);\nmyint_t get(void);\nmyint_t *cursor;\nextern int *cursor;",
            DuplicateDetector::new(),
        );

        assert!(outcome.conflicts.is_empty(), "{:?}", outcome.conflicts);
        assert_eq!(outcome.duplicates.len(), 2);
    }
}
