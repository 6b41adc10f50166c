//! End-to-end tests over the reference header
//!
//! These compile `main.h` through the whole pipeline and check how each
//! declaration is classified.

use cb_decl::{DeclClass, TypeCategory};
use cb_duplicates::{ConflictReason, DuplicateDetector};
use integration_tests::TestFixture;

const MAIN_H: &str = include_str!("fixtures/main.h");
const CONFLICTS_H: &str = include_str!("fixtures/conflicts.h");

fn main_fixture() -> TestFixture {
    let mut fixture = TestFixture::new();
    fixture.add_header("main.h", MAIN_H);
    fixture
}

#[test]
fn test_reference_header_has_no_errors() {
    let fixture = main_fixture();

    assert!(!fixture.session.has_errors(), "{:?}", fixture.session.reports());
    assert_eq!(fixture.session.table().len(), 14);
}

#[test]
fn test_global_categories() {
    let fixture = main_fixture();

    let expected = [
        ("global", TypeCategory::Integer),
        ("globalBool", TypeCategory::Boolean),
        ("globalBool2", TypeCategory::Boolean),
        ("globalFloat", TypeCategory::SingleFloat),
        ("globalDouble", TypeCategory::DoubleFloat),
        ("globalComplexFloat", TypeCategory::SingleComplex),
        ("globalComplexDouble", TypeCategory::DoubleComplex),
        ("globalComplexLongDouble", TypeCategory::DoubleComplex),
    ];
    for (name, category) in expected {
        assert_eq!(fixture.category(name), Some(category), "{name}");
        assert_eq!(
            fixture.summary(name).map(|summary| summary.kind),
            Some(DeclClass::Global),
            "{name}"
        );
    }
}

#[test]
fn test_function_pointer_typedef_is_callable() {
    let fixture = main_fixture();

    let binop = fixture.summary("binop_t");
    assert_eq!(binop.as_ref().map(|summary| summary.kind), Some(DeclClass::TypeAlias));
    assert_eq!(
        binop.as_ref().map(|summary| summary.category),
        Some(TypeCategory::FunctionPointer)
    );
    assert_eq!(binop.as_ref().map(|summary| summary.callable), Some(true));

    // A prototype is callable too, but it is a function, not a pointer
    assert_eq!(fixture.category("doCallback"), Some(TypeCategory::Function));
    assert_eq!(
        fixture.summary("doCallback").map(|summary| summary.c_type),
        Some("int (int, int, binop_t)".to_string())
    );
}

#[test]
fn test_pointer_typedef_is_out_param() {
    let fixture = main_fixture();

    let pointer = fixture.summary("intPointer");
    assert_eq!(pointer.as_ref().map(|summary| summary.category), Some(TypeCategory::Pointer));
    assert_eq!(pointer.as_ref().map(|summary| summary.out_param), Some(true));
    assert_eq!(pointer.map(|summary| summary.c_type), Some("int *".to_string()));

    assert_eq!(fixture.category("myint"), Some(TypeCategory::Integer));
    assert_eq!(fixture.summary("myint").map(|summary| summary.out_param), Some(false));
}

#[test]
fn test_reference_duplicates() {
    let fixture = main_fixture();

    let names: Vec<_> = fixture
        .session
        .duplicates()
        .iter()
        .map(|dup| dup.name.as_str())
        .collect();
    assert_eq!(names, vec!["add", "global"]);
    assert!(fixture.session.conflicts().is_empty());

    let add = &fixture.session.duplicates()[0];
    assert_eq!(fixture.session.locate(add.first).line, 2);
    assert_eq!(fixture.session.locate(add.second).line, 19);
}

#[test]
fn test_conflicting_header() {
    let mut fixture = main_fixture();
    fixture.add_header("conflicts.h", CONFLICTS_H);

    let conflicts: Vec<_> = fixture
        .session
        .conflicts()
        .iter()
        .map(|conflict| (conflict.name.as_str(), conflict.reason))
        .collect();
    assert_eq!(
        conflicts,
        vec![
            ("add", ConflictReason::TypeMismatch),
            ("myint", ConflictReason::TypeMismatch),
            ("global", ConflictReason::QualifierMismatch),
        ]
    );

    // First declaration wins
    assert_eq!(
        fixture.summary("add").map(|summary| summary.c_type),
        Some("int (int, int)".to_string())
    );
    assert_eq!(fixture.session.locate(fixture.session.conflicts()[0].location).file, "conflicts.h");
}

#[test]
fn test_ignore_qualifiers() {
    let mut fixture = TestFixture::with_detector(DuplicateDetector::new().with_ignore_qualifiers(true));
    fixture.add_header("main.h", MAIN_H).add_header("conflicts.h", CONFLICTS_H);

    assert_eq!(fixture.session.conflicts().len(), 2);
    assert!(
        fixture
            .session
            .duplicates()
            .iter()
            .any(|dup| dup.name == "global" && fixture.session.locate(dup.second).file == "conflicts.h")
    );
}

#[test]
fn test_conflict_report_rendering() {
    let mut fixture = TestFixture::new();
    fixture.add_header("a.h", "int add(int, int);\nlong add(int, int);\n");

    let reports = fixture.session.reports();
    assert_eq!(reports.len(), 1);
    let rendered = format!("{}", reports[0]);
    assert_eq!(rendered, "conflicting declaration of `add`: types differ");
}
