// Common test utilities for integration tests
//
// This module provides shared fixtures (a small shape hierarchy and a
// point class) for use across all integration tests.

#![allow(dead_code)]

use oxiclos::{Class, Generic, Runtime, SlotSpec, Value};

/// `<shape>` and its subclass `<square>` with a `side` slot.
pub struct Shapes {
    pub shape: Class,
    pub square: Class,
}

/// Defines the shape hierarchy.
pub fn define_shapes(rt: &Runtime) -> Shapes {
    let shape = rt
        .define_class("<shape>", &[], &[SlotSpec::new("name").init_keyword("name").build(rt)])
        .expect("Failed to define <shape>");
    let square = rt
        .define_class(
            "<square>",
            &[shape.clone()],
            &[SlotSpec::new("side")
                .init_keyword("side")
                .init_value(Value::Int(1))
                .build(rt)],
        )
        .expect("Failed to define <square>");
    Shapes { shape, square }
}

/// Defines `<point>` with `x` and `y` slots, both defaulting to 0.
pub fn define_point(rt: &Runtime) -> Class {
    rt.define_class(
        "<point>",
        &[],
        &[
            SlotSpec::new("x").init_keyword("x").init_value(Value::Int(0)).build(rt),
            SlotSpec::new("y").init_keyword("y").init_value(Value::Int(0)).build(rt),
        ],
    )
    .expect("Failed to define <point>")
}

/// Makes an instance from `(keyword, value)` pairs.
pub fn make_with(rt: &Runtime, class: &Class, pairs: &[(&str, Value)]) -> Value {
    let mut initargs = Vec::with_capacity(pairs.len() * 2);
    for (key, value) in pairs {
        initargs.push(rt.keyword(key));
        initargs.push(value.clone());
    }
    rt.make(class, &initargs).expect("Failed to make instance")
}

/// Applies a generic and unwraps the result.
pub fn call(rt: &Runtime, generic: &Generic, args: &[Value]) -> Value {
    rt.apply_generic(generic, args).expect("Generic call failed")
}

/// Class names of a precedence list.
pub fn names(classes: &[Class]) -> Vec<String> {
    classes.iter().map(Class::name_string).collect()
}

/// Collects a list of strings produced by method bodies.
pub fn strings(value: &Value) -> Vec<String> {
    value
        .to_vec()
        .expect("expected a proper list")
        .iter()
        .map(|v| match v {
            Value::Str(s) => s.to_string(),
            other => format!("{other:?}"),
        })
        .collect()
}
