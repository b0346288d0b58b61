//! Integration tests for generic function dispatch.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{call, define_shapes, make_with, strings};
use oxiclos::{Error, Fallback, Procedure, Runtime, SlotSpec, Value};

// ============================================================================
// Method selection
// ============================================================================

#[test]
fn test_most_specific_method_runs_first() {
    let rt = Runtime::new();
    let shapes = define_shapes(&rt);
    let area = rt.define_generic("area");

    rt.define_method(&area, &[shapes.shape.clone()], false, |_, _, _| {
        Ok(Value::Int(0))
    })
    .unwrap();
    rt.define_method(&area, &[shapes.square.clone()], false, |rt, args, _| {
        let side = rt.slot_ref(&args[0], "side")?.as_int().unwrap_or(0);
        Ok(Value::Int(side * side))
    })
    .unwrap();

    let square = make_with(&rt, &shapes.square, &[("side", Value::Int(4))]);
    let shape = make_with(&rt, &shapes.shape, &[]);
    assert_eq!(call(&rt, &area, &[square]), Value::Int(16));
    assert_eq!(call(&rt, &area, &[shape]), Value::Int(0));
}

#[test]
fn test_next_method_chain_ends_in_fallback() {
    let rt = Runtime::new();
    let shapes = define_shapes(&rt);
    let describe = rt.define_generic("describe");

    rt.define_method(&describe, &[shapes.shape.clone()], false, |rt, _, next| {
        assert!(!next.has_next());
        let rest = next.call(rt)?;
        Ok(Value::list([Value::string("shape"), rest]))
    })
    .unwrap();
    rt.define_method(&describe, &[shapes.square.clone()], false, |rt, _, next| {
        assert!(next.has_next());
        let rest = next.call(rt)?;
        Ok(Value::list([Value::string("square"), rest]))
    })
    .unwrap();
    describe.set_fallback(Fallback::Procedure(Procedure::new(
        "describe-fallback",
        1,
        false,
        |_, _| Ok(Value::string("end")),
    )));

    let square = make_with(&rt, &shapes.square, &[]);
    let result = call(&rt, &describe, &[square]);
    assert_eq!(format!("{result:?}"), r#"("square" ("shape" "end"))"#);
}

#[test]
fn test_no_applicable_method() {
    let rt = Runtime::new();
    let shapes = define_shapes(&rt);
    let area = rt.define_generic("area");
    rt.define_method(&area, &[shapes.square.clone()], false, |_, _, _| {
        Ok(Value::Int(1))
    })
    .unwrap();

    assert_eq!(
        rt.apply_generic(&area, &[Value::Int(3)]),
        Err(Error::NoApplicableMethod {
            generic: "area".into(),
            args: "(3)".into()
        })
    );
}

#[test]
fn test_next_method_with_new_arguments() {
    let rt = Runtime::new();
    let b = rt.builtins();
    let double = rt.define_generic("double");

    rt.define_method(&double, &[b.number.clone()], false, |_, args, _| {
        let n = args[0].as_int().unwrap_or(0);
        Ok(Value::Int(n * 2))
    })
    .unwrap();
    rt.define_method(&double, &[b.integer.clone()], false, |rt, args, next| {
        let n = args[0].as_int().unwrap_or(0);
        next.call_with(rt, &[Value::Int(n + 1)])
    })
    .unwrap();

    assert_eq!(call(&rt, &double, &[Value::Int(4)]), Value::Int(10));
}

#[test]
fn test_dispatch_on_second_argument() {
    let rt = Runtime::new();
    let b = rt.builtins();
    let combine = rt.define_generic("combine");
    let top = b.top.clone();

    rt.define_method(&combine, &[top.clone(), top.clone()], false, |_, _, _| {
        Ok(Value::string("any"))
    })
    .unwrap();
    rt.define_method(&combine, &[top.clone(), b.string.clone()], false, |_, _, _| {
        Ok(Value::string("string"))
    })
    .unwrap();

    assert_eq!(
        call(&rt, &combine, &[Value::Int(1), Value::string("x")]),
        Value::string("string")
    );
    assert_eq!(
        call(&rt, &combine, &[Value::Int(1), Value::Int(2)]),
        Value::string("any")
    );
}

#[test]
fn test_dispatch_is_deterministic() {
    let rt = Runtime::new();
    let shapes = define_shapes(&rt);
    let trace = rt.define_generic("trace");
    for (class, tag) in [(&shapes.shape, "shape"), (&shapes.square, "square")] {
        rt.define_method(&trace, &[class.clone()], false, move |rt, _, next| {
            let rest = if next.has_next() { next.call(rt)? } else { Value::Nil };
            Ok(Value::cons(Value::string(tag), rest))
        })
        .unwrap();
    }

    let square = make_with(&rt, &shapes.square, &[]);
    let first = call(&rt, &trace, &[square.clone()]);
    for _ in 0..10 {
        assert_eq!(call(&rt, &trace, &[square.clone()]), first);
    }
    assert_eq!(strings(&first), ["square", "shape"]);
}

// ============================================================================
// Method management
// ============================================================================

#[test]
fn test_redefinition_replaces_method() {
    let rt = Runtime::new();
    let shapes = define_shapes(&rt);
    let area = rt.define_generic("area");

    rt.define_method(&area, &[shapes.shape.clone()], false, |_, _, _| {
        Ok(Value::Int(1))
    })
    .unwrap();
    rt.define_method(&area, &[shapes.shape.clone()], false, |_, _, _| {
        Ok(Value::Int(2))
    })
    .unwrap();

    assert_eq!(area.method_count(), 1);
    let shape = make_with(&rt, &shapes.shape, &[]);
    assert_eq!(call(&rt, &area, &[shape]), Value::Int(2));
}

#[test]
fn test_optional_arguments() {
    let rt = Runtime::new();
    let top = rt.builtins().top.clone();
    let count = rt.define_generic("count-args");

    rt.define_method(&count, &[top.clone()], true, |_, args, _| {
        Ok(Value::Int(args.len() as i64))
    })
    .unwrap();
    rt.define_method(&count, &[top.clone()], false, |_, _, next| {
        let _ = next;
        Ok(Value::string("exactly one"))
    })
    .unwrap();

    assert_eq!(call(&rt, &count, &[Value::Nil]), Value::string("exactly one"));
    assert_eq!(
        call(&rt, &count, &[Value::Nil, Value::Nil, Value::Nil]),
        Value::Int(3)
    );
}

#[test]
fn test_methods_made_through_make() {
    let rt = Runtime::new();
    let b = rt.builtins();
    let greet = rt.define_generic("greet");
    let calls = Rc::new(Cell::new(0));

    let counter = Rc::clone(&calls);
    let body = Procedure::new("greet-body", 3, false, move |_, args| {
        counter.set(counter.get() + 1);
        Ok(Value::list([args[0].clone(), args[1].clone()]))
    });
    let method = rt
        .make(
            &b.method,
            &[
                rt.keyword("generic"),
                Value::Generic(greet.clone()),
                rt.keyword("specializers"),
                Value::list([Value::Class(b.top.clone())]),
                rt.keyword("lambda-list"),
                Value::list_with_tail([rt.symbol("who")], rt.symbol("more")),
                rt.keyword("body"),
                Value::Procedure(body),
            ],
        )
        .unwrap();
    let method = method.as_method().unwrap().clone();
    rt.add_method(&greet, &method).unwrap();

    let result = call(&rt, &greet, &[rt.symbol("world"), Value::Int(1)]);
    assert_eq!(format!("{result:?}"), "(world (1))");
    assert_eq!(calls.get(), 1);

    let other = rt.define_generic("other");
    assert!(matches!(
        rt.add_method(&other, &method),
        Err(Error::MethodAlreadyBound { .. })
    ));
}

#[test]
fn test_compute_applicable_methods_generic() {
    let rt = Runtime::new();
    let shapes = define_shapes(&rt);
    let area = rt.define_generic("area");
    rt.define_method(&area, &[shapes.shape.clone()], false, |_, _, _| Ok(Value::Nil))
        .unwrap();

    let square = make_with(&rt, &shapes.square, &[]);
    let found = call(
        &rt,
        &rt.generics().compute_applicable_methods,
        &[Value::Generic(area.clone()), Value::list([square])],
    );
    assert_eq!(found.list_len(), Some(1));

    let none = call(
        &rt,
        &rt.generics().compute_applicable_methods,
        &[Value::Generic(area), Value::list([Value::Int(1)])],
    );
    assert_eq!(none, Value::Nil);
}

#[test]
fn test_method_ordering_generic() {
    let rt = Runtime::new();
    let b = rt.builtins();
    let shapes = define_shapes(&rt);
    let area = rt.define_generic("area");
    let general = rt
        .define_method(&area, &[shapes.shape.clone()], false, |_, _, _| Ok(Value::Nil))
        .unwrap();
    let special = rt
        .define_method(&area, &[shapes.square.clone()], false, |_, _, _| Ok(Value::Nil))
        .unwrap();

    let ordered = call(
        &rt,
        &rt.generics().method_more_specific_p,
        &[
            Value::Method(special.clone()),
            Value::Method(general.clone()),
            Value::list([Value::Class(shapes.square.clone())]),
        ],
    );
    assert_eq!(ordered, Value::Bool(true));

    let on_string = rt
        .define_method(&area, &[b.string.clone()], false, |_, _, _| Ok(Value::Nil))
        .unwrap();
    let on_symbol = rt
        .define_method(&area, &[b.symbol.clone()], false, |_, _, _| Ok(Value::Nil))
        .unwrap();
    let unrelated = rt.apply_generic(
        &rt.generics().method_more_specific_p,
        &[
            Value::Method(on_string),
            Value::Method(on_symbol),
            Value::list([Value::Class(b.integer.clone())]),
        ],
    );
    assert!(matches!(unrelated, Err(Error::IncomparableMethods { .. })));
}

#[test]
fn test_apply_generic_is_customizable() {
    let rt = Runtime::new();
    let b = rt.builtins();
    let traced = rt
        .define_class(
            "<traced-generic>",
            &[b.generic.clone()],
            &[SlotSpec::new("calls").init_value(Value::Int(0)).build(&rt)],
        )
        .unwrap();
    rt.define_method(
        &rt.generics().apply_generic,
        &[traced.clone(), b.list.clone()],
        false,
        |rt, args, next| {
            let calls = rt.slot_ref(&args[0], "calls")?.as_int().unwrap_or(0);
            rt.slot_set(&args[0], "calls", Value::Int(calls + 1))?;
            next.call(rt)
        },
    )
    .unwrap();

    let made = rt
        .make(&traced, &[rt.keyword("name"), rt.symbol("shout")])
        .unwrap();
    let shout = made.as_generic().unwrap().clone();
    rt.define_method(&shout, &[b.string.clone()], false, |_, args, _| {
        Ok(args[0].clone())
    })
    .unwrap();

    assert_eq!(call(&rt, &shout, &[Value::string("a")]), Value::string("a"));
    assert_eq!(call(&rt, &shout, &[Value::string("b")]), Value::string("b"));
    assert_eq!(rt.slot_ref(&made, "calls").unwrap(), Value::Int(2));
    assert!(matches!(
        rt.apply_generic(&shout, &[Value::Int(1)]),
        Err(Error::NoApplicableMethod { .. })
    ));
    assert_eq!(rt.slot_ref(&made, "calls").unwrap(), Value::Int(3));
}
