//! Integration tests for class precedence lists and class finalization.

mod common;

use common::names;
use oxiclos::{Class, ClassCategory, Error, Runtime, Value};

// ============================================================================
// Linearization
// ============================================================================

#[test]
fn test_cpl_starts_with_class_and_ends_with_top() {
    let rt = Runtime::new();
    let a = rt.define_class("<a>", &[], &[]).unwrap();
    let cpl = a.cpl();
    assert_eq!(cpl.first(), Some(&a));
    assert_eq!(cpl.last(), Some(&rt.builtins().top));
}

#[test]
fn test_cpl_respects_local_order() {
    let rt = Runtime::new();
    let a = rt.define_class("<a>", &[], &[]).unwrap();
    let b = rt.define_class("<b>", &[], &[]).unwrap();
    let ab = rt.define_class("<ab>", &[a.clone(), b.clone()], &[]).unwrap();
    let ba = rt.define_class("<ba>", &[b, a], &[]).unwrap();

    assert_eq!(names(&ab.cpl()), ["<ab>", "<a>", "<b>", "<object>", "<top>"]);
    assert_eq!(names(&ba.cpl()), ["<ba>", "<b>", "<a>", "<object>", "<top>"]);
}

#[test]
fn test_cpl_is_consistent_with_every_super() {
    let rt = Runtime::new();
    let a = rt.define_class("<a>", &[], &[]).unwrap();
    let b = rt.define_class("<b>", &[a.clone()], &[]).unwrap();
    let c = rt.define_class("<c>", &[a.clone()], &[]).unwrap();
    let d = rt.define_class("<d>", &[b.clone()], &[]).unwrap();
    let e = rt.define_class("<e>", &[d.clone(), c.clone()], &[]).unwrap();

    let cpl = e.cpl();
    let position = |class: &Class| cpl.iter().position(|c| c == class).unwrap();
    for sup in e.direct_supers() {
        let sub_cpl = sup.cpl();
        for pair in sub_cpl.windows(2) {
            assert!(position(&pair[0]) < position(&pair[1]));
        }
    }
    assert_eq!(names(&cpl), ["<e>", "<d>", "<c>", "<b>", "<a>", "<object>", "<top>"]);
}

#[test]
fn test_inconsistent_precedence_is_rejected() {
    let rt = Runtime::new();
    let x = rt.define_class("<x>", &[], &[]).unwrap();
    let y = rt.define_class("<y>", &[], &[]).unwrap();
    let xy = rt.define_class("<xy>", &[x.clone(), y.clone()], &[]).unwrap();
    let yx = rt.define_class("<yx>", &[y, x], &[]).unwrap();

    let result = rt.define_class("<broken>", &[xy, yx], &[]);
    assert!(matches!(result, Err(Error::InconsistentPrecedence { .. })));
    assert!(rt.find_class("<broken>").is_none());
}

// ============================================================================
// Allocator resolution
// ============================================================================

#[test]
fn test_native_classes_are_final() {
    let rt = Runtime::new();
    let integer = rt.builtins().integer.clone();
    assert_eq!(
        rt.define_class("<my-int>", &[integer], &[]),
        Err(Error::FinalClassInherited {
            class: "<integer>".into()
        })
    );
}

#[test]
fn test_two_base_classes_are_rejected() {
    let rt = Runtime::new();
    let b = rt.builtins();
    let result = rt.define_class("<both>", &[b.class.clone(), b.generic.clone()], &[]);
    assert!(matches!(result, Err(Error::MultipleBaseClasses { .. })));
}

#[test]
fn test_abstract_super_still_gets_object() {
    let rt = Runtime::new();
    let sequence = rt.builtins().sequence.clone();
    let seq = rt.define_class("<my-seq>", &[sequence], &[]).unwrap();
    assert_eq!(
        names(&seq.cpl()),
        ["<my-seq>", "<sequence>", "<object>", "<collection>", "<top>"]
    );
    assert_eq!(seq.category(), ClassCategory::UserDefined);
    assert!(seq.allocator().is_some());
}

#[test]
fn test_reflective_cpl_setter_validates() {
    let rt = Runtime::new();
    let a = rt.define_class("<a>", &[], &[]).unwrap();
    let this = Value::Class(a.clone());
    let before = rt.slot_ref(&this, "cpl").unwrap();

    let bogus = Value::list([Value::Class(a.clone()), Value::Int(1)]);
    assert!(matches!(
        rt.slot_set(&this, "cpl", bogus),
        Err(Error::InvalidCpl { .. })
    ));
    assert_eq!(rt.slot_ref(&this, "cpl").unwrap(), before);
}

// ============================================================================
// Subtyping
// ============================================================================

#[test]
fn test_subtype_is_reflexive_and_transitive() {
    let rt = Runtime::new();
    let a = rt.define_class("<a>", &[], &[]).unwrap();
    let b = rt.define_class("<b>", &[a.clone()], &[]).unwrap();
    let c = rt.define_class("<c>", &[b.clone()], &[]).unwrap();

    for class in [&a, &b, &c] {
        assert!(rt.subtype_of(class, class));
    }
    assert!(rt.subtype_of(&c, &b));
    assert!(rt.subtype_of(&b, &a));
    assert!(rt.subtype_of(&c, &a));
    assert!(!rt.subtype_of(&a, &c));
}
