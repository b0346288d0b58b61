//! Builtin class lattice and builtin generic functions.
//!
//! The lattice is wired by hand: builtin classes cannot go through the
//! class-creation protocol because that protocol is made of the very
//! classes and generics built here.
//!
//! ```text
//! <top>
//! ├── <collection> ── <sequence> ─┬─ <list> ─┬─ <null>
//! │                               │          └─ <pair>
//! │                               └─ <string>
//! ├── <number> ── <integer>
//! ├── <boolean> <char> <symbol> <keyword> <procedure> <unknown>
//! ├── <next-method> <slot-accessor>
//! └── <object> ─┬─ <class>
//!               ├─ <generic>
//!               └─ <method>
//! ```

use oxiclos_intern::Interner;

use crate::error::{Error, Result};
use crate::runtime::category::Allocator;
use crate::runtime::class::{class_initialize, compute_get_n_set, compute_slots, getter_n_setter};
use crate::runtime::cpl::compute_cpl;
use crate::runtime::dispatch::{checked_method_more_specific, compute_applicable_methods};
use crate::runtime::generic::Fallback;
use crate::runtime::keyword::KeywordTable;
use crate::runtime::object::{
    CLASS_ALLOCATOR, GENERIC_ALLOCATOR, METHOD_ALLOCATOR, OBJECT_ALLOCATOR,
    SLOT_ACCESSOR_ALLOCATOR, builtin_initialize, generic_initialize, make_instance,
    method_initialize, object_initialize,
};
use crate::runtime::slot::{NativeGetter, NativeSetter, SlotStorage};
use crate::runtime::{
    Class, ClassCategory, Generic, Keyword, Method, NextMethod, Runtime, SlotAccessor, Value,
};

/// Keywords the protocol looks up on every call.
pub(crate) struct Keys {
    pub allocation: Keyword,
    pub instance: Keyword,
    pub virtual_: Keyword,
    pub builtin: Keyword,
    pub slot_accessor: Keyword,
    pub slot_ref: Keyword,
    pub slot_set: Keyword,
    pub init_value: Keyword,
    pub init_keyword: Keyword,
    pub init_thunk: Keyword,
    pub read_only: Keyword,
    pub slot_number: Keyword,
    pub name: Keyword,
    pub supers: Keyword,
    pub slots: Keyword,
    pub generic: Keyword,
    pub specializers: Keyword,
    pub lambda_list: Keyword,
    pub body: Keyword,
    pub metaclass: Keyword,
}

impl Keys {
    pub(crate) fn new(table: &mut KeywordTable) -> Keys {
        Keys {
            allocation: table.intern("allocation"),
            instance: table.intern("instance"),
            virtual_: table.intern("virtual"),
            builtin: table.intern("builtin"),
            slot_accessor: table.intern("slot-accessor"),
            slot_ref: table.intern("slot-ref"),
            slot_set: table.intern("slot-set!"),
            init_value: table.intern("init-value"),
            init_keyword: table.intern("init-keyword"),
            init_thunk: table.intern("init-thunk"),
            read_only: table.intern("read-only"),
            slot_number: table.intern("slot-number"),
            name: table.intern("name"),
            supers: table.intern("supers"),
            slots: table.intern("slots"),
            generic: table.intern("generic"),
            specializers: table.intern("specializers"),
            lambda_list: table.intern("lambda-list"),
            body: table.intern("body"),
            metaclass: table.intern("metaclass"),
        }
    }
}

/// The builtin classes.
#[derive(Debug, Clone)]
pub struct BuiltinClasses {
    pub top: Class,
    pub collection: Class,
    pub sequence: Class,
    pub list: Class,
    pub number: Class,

    pub boolean: Class,
    pub char: Class,
    pub integer: Class,
    pub string: Class,
    pub symbol: Class,
    pub keyword: Class,
    pub null: Class,
    pub pair: Class,
    pub procedure: Class,
    pub unknown: Class,
    pub next_method: Class,
    pub slot_accessor: Class,

    pub object: Class,
    pub class: Class,
    pub generic: Class,
    pub method: Class,
}

impl BuiltinClasses {
    /// Returns every builtin class, most general first.
    #[must_use]
    pub fn all(&self) -> Vec<Class> {
        [
            &self.top,
            &self.collection,
            &self.sequence,
            &self.list,
            &self.number,
            &self.boolean,
            &self.char,
            &self.integer,
            &self.string,
            &self.symbol,
            &self.keyword,
            &self.null,
            &self.pair,
            &self.procedure,
            &self.unknown,
            &self.next_method,
            &self.slot_accessor,
            &self.object,
            &self.class,
            &self.generic,
            &self.method,
        ]
        .into_iter()
        .cloned()
        .collect()
    }
}

/// The generic functions of the object protocol.
#[derive(Debug, Clone)]
pub struct BuiltinGenerics {
    pub make: Generic,
    pub allocate_instance: Generic,
    pub initialize: Generic,
    pub add_method: Generic,
    pub compute_cpl: Generic,
    pub compute_slots: Generic,
    pub compute_get_n_set: Generic,
    pub compute_applicable_methods: Generic,
    pub method_more_specific_p: Generic,
    pub apply_generic: Generic,
    pub slot_missing: Generic,
    pub slot_unbound: Generic,
    pub slot_bound_using_class_p: Generic,
}

impl BuiltinGenerics {
    #[must_use]
    pub fn all(&self) -> Vec<Generic> {
        [
            &self.make,
            &self.allocate_instance,
            &self.initialize,
            &self.add_method,
            &self.compute_cpl,
            &self.compute_slots,
            &self.compute_get_n_set,
            &self.compute_applicable_methods,
            &self.method_more_specific_p,
            &self.apply_generic,
            &self.slot_missing,
            &self.slot_unbound,
            &self.slot_bound_using_class_p,
        ]
        .into_iter()
        .cloned()
        .collect()
    }
}

// ----------------------------------------------------------------------
// Native slots
// ----------------------------------------------------------------------

fn expect_class(obj: &Value) -> Result<&Class> {
    obj.as_class().ok_or_else(|| Error::wrong_type("class", obj))
}

fn expect_generic(obj: &Value) -> Result<&Generic> {
    obj.as_generic()
        .ok_or_else(|| Error::wrong_type("generic function", obj))
}

fn expect_method(obj: &Value) -> Result<&Method> {
    obj.as_method().ok_or_else(|| Error::wrong_type("method", obj))
}

fn expect_accessor(obj: &Value) -> Result<&SlotAccessor> {
    obj.as_accessor()
        .ok_or_else(|| Error::wrong_type("slot accessor", obj))
}

fn class_list(classes: Vec<Class>) -> Value {
    Value::list(classes.into_iter().map(Value::Class))
}

fn count_value(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

fn class_name(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(expect_class(obj)?.name())
}

fn set_class_name(_: &Runtime, obj: &Value, value: Value) -> Result<()> {
    let class = expect_class(obj)?;
    class.check_mutable("name")?;
    class.set_name(value);
    Ok(())
}

fn class_cpl(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(class_list(expect_class(obj)?.cpl()))
}

fn set_class_cpl(rt: &Runtime, obj: &Value, value: Value) -> Result<()> {
    expect_class(obj)?.set_cpl(rt, &value)
}

fn class_direct_supers(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(class_list(expect_class(obj)?.direct_supers()))
}

fn set_class_direct_supers(_: &Runtime, obj: &Value, value: Value) -> Result<()> {
    expect_class(obj)?.set_direct_supers(&value)
}

fn class_accessors(_: &Runtime, obj: &Value) -> Result<Value> {
    let entries = expect_class(obj)?.accessors();
    Ok(Value::list(entries.into_iter().map(|(name, accessor)| {
        Value::cons(Value::Symbol(name), Value::Accessor(accessor))
    })))
}

fn set_class_accessors(_: &Runtime, obj: &Value, value: Value) -> Result<()> {
    expect_class(obj)?.set_accessors(&value)
}

fn class_slots(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(Value::list(expect_class(obj)?.slots()))
}

fn set_class_slots(_: &Runtime, obj: &Value, value: Value) -> Result<()> {
    expect_class(obj)?.set_slots(&value)
}

fn class_direct_slots(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(Value::list(expect_class(obj)?.direct_slots()))
}

fn set_class_direct_slots(_: &Runtime, obj: &Value, value: Value) -> Result<()> {
    expect_class(obj)?.set_direct_slots(&value)
}

fn class_direct_subclasses(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(class_list(expect_class(obj)?.direct_subclasses()))
}

fn set_class_direct_subclasses(_: &Runtime, obj: &Value, value: Value) -> Result<()> {
    expect_class(obj)?.set_direct_subclasses(&value)
}

fn class_num_instance_slots(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(count_value(expect_class(obj)?.num_instance_slots()))
}

fn set_class_num_instance_slots(_: &Runtime, obj: &Value, value: Value) -> Result<()> {
    expect_class(obj)?.set_num_instance_slots_value(&value)
}

fn generic_name(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(expect_generic(obj)?.name())
}

fn set_generic_name(_: &Runtime, obj: &Value, value: Value) -> Result<()> {
    expect_generic(obj)?.set_name(value);
    Ok(())
}

fn generic_methods(_: &Runtime, obj: &Value) -> Result<Value> {
    let methods = expect_generic(obj)?.methods();
    Ok(Value::list(methods.into_iter().map(Value::Method)))
}

fn method_generic(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(expect_method(obj)?
        .generic()
        .map_or(Value::Bool(false), Value::Generic))
}

fn method_specializers(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(class_list(expect_method(obj)?.specializers()))
}

fn accessor_init_value(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(expect_accessor(obj)?.init_value())
}

fn accessor_init_keyword(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(expect_accessor(obj)?
        .init_keyword()
        .map_or(Value::Bool(false), Value::Keyword))
}

fn accessor_init_thunk(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(expect_accessor(obj)?
        .init_thunk()
        .unwrap_or(Value::Bool(false)))
}

fn accessor_slot_number(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(expect_accessor(obj)?
        .slot_number()
        .map_or(Value::Bool(false), count_value))
}

fn set_accessor_slot_number(_: &Runtime, obj: &Value, value: Value) -> Result<()> {
    let accessor = expect_accessor(obj)?;
    let number = value
        .as_int()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Error::wrong_type("non-negative integer", &value))?;
    accessor.set_storage(SlotStorage::Instance(number));
    Ok(())
}

fn accessor_getter_n_setter(_: &Runtime, obj: &Value) -> Result<Value> {
    Ok(match expect_accessor(obj)?.storage() {
        SlotStorage::Procedural { getter, setter } => {
            Value::cons(getter, setter.unwrap_or(Value::Bool(false)))
        }
        _ => Value::Bool(false),
    })
}

fn set_accessor_getter_n_setter(_: &Runtime, obj: &Value, value: Value) -> Result<()> {
    let accessor = expect_accessor(obj)?;
    let storage = getter_n_setter(&value)
        .ok_or_else(|| Error::wrong_type("(getter . setter)", &value))?;
    accessor.set_storage(storage);
    Ok(())
}

type NativeSlot = (&'static str, NativeGetter, Option<NativeSetter>);

const CLASS_SLOTS: &[NativeSlot] = &[
    ("name", class_name, Some(set_class_name)),
    ("cpl", class_cpl, Some(set_class_cpl)),
    ("direct-supers", class_direct_supers, Some(set_class_direct_supers)),
    ("accessors", class_accessors, Some(set_class_accessors)),
    ("slots", class_slots, Some(set_class_slots)),
    ("direct-slots", class_direct_slots, Some(set_class_direct_slots)),
    (
        "direct-subclasses",
        class_direct_subclasses,
        Some(set_class_direct_subclasses),
    ),
    (
        "num-instance-slots",
        class_num_instance_slots,
        Some(set_class_num_instance_slots),
    ),
];

const GENERIC_SLOTS: &[NativeSlot] = &[
    ("name", generic_name, Some(set_generic_name)),
    ("methods", generic_methods, None),
];

const METHOD_SLOTS: &[NativeSlot] = &[
    ("generic", method_generic, None),
    ("specializers", method_specializers, None),
];

const SLOT_ACCESSOR_SLOTS: &[NativeSlot] = &[
    ("init-value", accessor_init_value, None),
    ("init-keyword", accessor_init_keyword, None),
    ("init-thunk", accessor_init_thunk, None),
    ("slot-number", accessor_slot_number, Some(set_accessor_slot_number)),
    (
        "getter-n-setter",
        accessor_getter_n_setter,
        Some(set_accessor_getter_n_setter),
    ),
];

// ----------------------------------------------------------------------
// Lattice
// ----------------------------------------------------------------------

fn new_class(symbols: &mut Interner, name: &str, category: ClassCategory) -> Class {
    Class::new_raw(Value::Symbol(symbols.intern(name)), category, None, 0)
}

/// Sets the CPA of `class`; its direct super is the first CPA entry.
fn link(class: &Class, cpa: &[&Class]) {
    let direct = cpa.first().map(|&c| c.clone()).into_iter().collect();
    class.set_hierarchy_raw(direct, cpa.iter().map(|&c| c.clone()).collect());
    if let Some(sup) = cpa.first() {
        sup.add_direct_subclass(class);
    }
}

fn set_base(class: &Class, allocator: Allocator, offset: usize) {
    class.set_allocator(Some(allocator));
    class.set_instance_slot_offset(offset);
}

/// Installs native slots: each becomes `(name :allocation :builtin
/// :slot-accessor accessor)` with `:name` as its init keyword.
fn install_native_slots(
    class: &Class,
    slots: &[NativeSlot],
    symbols: &mut Interner,
    keywords: &mut KeywordTable,
    keys: &Keys,
) {
    let mut specs = Vec::with_capacity(slots.len());
    let mut accessors = Vec::with_capacity(slots.len());
    for &(name, getter, setter) in slots {
        let sym = symbols.intern(name);
        let accessor =
            SlotAccessor::native(getter, setter).with_init_keyword(keywords.intern(name));
        specs.push(Value::list([
            Value::Symbol(sym),
            Value::Keyword(keys.allocation),
            Value::Keyword(keys.builtin),
            Value::Keyword(keys.slot_accessor),
            Value::Accessor(accessor.clone()),
        ]));
        accessors.push((sym, accessor));
    }
    class.set_slot_layout_raw(specs.clone(), specs, accessors);
}

pub(crate) fn bootstrap_classes(
    symbols: &mut Interner,
    keywords: &mut KeywordTable,
    keys: &Keys,
) -> BuiltinClasses {
    use ClassCategory::{Abstract, Base, Native};

    let c = BuiltinClasses {
        top: new_class(symbols, "<top>", Abstract),
        collection: new_class(symbols, "<collection>", Abstract),
        sequence: new_class(symbols, "<sequence>", Abstract),
        list: new_class(symbols, "<list>", Abstract),
        number: new_class(symbols, "<number>", Abstract),

        boolean: new_class(symbols, "<boolean>", Native),
        char: new_class(symbols, "<char>", Native),
        integer: new_class(symbols, "<integer>", Native),
        string: new_class(symbols, "<string>", Native),
        symbol: new_class(symbols, "<symbol>", Native),
        keyword: new_class(symbols, "<keyword>", Native),
        null: new_class(symbols, "<null>", Native),
        pair: new_class(symbols, "<pair>", Native),
        procedure: new_class(symbols, "<procedure>", Native),
        unknown: new_class(symbols, "<unknown>", Native),
        next_method: new_class(symbols, "<next-method>", Native),
        slot_accessor: new_class(symbols, "<slot-accessor>", Native),

        object: new_class(symbols, "<object>", Base),
        class: new_class(symbols, "<class>", Base),
        generic: new_class(symbols, "<generic>", Base),
        method: new_class(symbols, "<method>", Base),
    };

    let top = &c.top;
    link(&c.collection, &[top]);
    link(&c.sequence, &[&c.collection, top]);
    link(&c.list, &[&c.sequence, &c.collection, top]);
    link(&c.number, &[top]);

    for simple in [
        &c.boolean,
        &c.char,
        &c.symbol,
        &c.keyword,
        &c.procedure,
        &c.unknown,
        &c.next_method,
        &c.slot_accessor,
        &c.object,
    ] {
        link(simple, &[top]);
    }
    link(&c.integer, &[&c.number, top]);
    link(&c.string, &[&c.sequence, &c.collection, top]);
    link(&c.null, &[&c.list, &c.sequence, &c.collection, top]);
    link(&c.pair, &[&c.list, &c.sequence, &c.collection, top]);
    for base in [&c.class, &c.generic, &c.method] {
        link(base, &[&c.object, top]);
    }

    set_base(&c.object, OBJECT_ALLOCATOR, 0);
    set_base(&c.class, CLASS_ALLOCATOR, CLASS_SLOTS.len());
    set_base(&c.generic, GENERIC_ALLOCATOR, GENERIC_SLOTS.len());
    set_base(&c.method, METHOD_ALLOCATOR, METHOD_SLOTS.len());
    set_base(&c.slot_accessor, SLOT_ACCESSOR_ALLOCATOR, 0);

    install_native_slots(&c.class, CLASS_SLOTS, symbols, keywords, keys);
    install_native_slots(&c.generic, GENERIC_SLOTS, symbols, keywords, keys);
    install_native_slots(&c.method, METHOD_SLOTS, symbols, keywords, keys);
    install_native_slots(&c.slot_accessor, SLOT_ACCESSOR_SLOTS, symbols, keywords, keys);

    c
}

// ----------------------------------------------------------------------
// Generics
// ----------------------------------------------------------------------

fn new_generic(symbols: &mut Interner, classes: &BuiltinClasses, name: &str) -> Generic {
    Generic::new(classes.generic.clone(), Value::Symbol(symbols.intern(name)))
}

fn install<F>(generic: &Generic, classes: &BuiltinClasses, specs: &[&Class], optional: bool, body: F)
where
    F: Fn(&Runtime, &[Value], &NextMethod) -> Result<Value> + 'static,
{
    let specializers = specs.iter().map(|&c| c.clone()).collect();
    generic.install(Method::native(
        classes.method.clone(),
        specializers,
        optional,
        body,
    ));
}

fn slot_name(value: &Value) -> Result<oxiclos_intern::Symbol> {
    value
        .as_symbol()
        .ok_or_else(|| Error::wrong_type("symbol", value))
}

pub(crate) fn bootstrap_generics(symbols: &mut Interner, c: &BuiltinClasses) -> BuiltinGenerics {
    let g = BuiltinGenerics {
        make: new_generic(symbols, c, "make"),
        allocate_instance: new_generic(symbols, c, "allocate-instance"),
        initialize: new_generic(symbols, c, "initialize"),
        add_method: new_generic(symbols, c, "add-method!"),
        compute_cpl: new_generic(symbols, c, "compute-cpl"),
        compute_slots: new_generic(symbols, c, "compute-slots"),
        compute_get_n_set: new_generic(symbols, c, "compute-get-n-set"),
        compute_applicable_methods: new_generic(symbols, c, "compute-applicable-methods"),
        method_more_specific_p: new_generic(symbols, c, "method-more-specific?"),
        apply_generic: new_generic(symbols, c, "apply-generic"),
        slot_missing: new_generic(symbols, c, "slot-missing"),
        slot_unbound: new_generic(symbols, c, "slot-unbound"),
        slot_bound_using_class_p: new_generic(symbols, c, "slot-bound-using-class?"),
    };

    install(&g.make, c, &[&c.class], true, |rt, args, _| {
        make_instance(rt, args)
    });

    install(&g.allocate_instance, c, &[&c.class, &c.list], false, |rt, args, _| {
        rt.allocate(expect_class(&args[0])?, &args[1])
    });

    install(&g.initialize, c, &[&c.object, &c.list], false, |rt, args, _| {
        object_initialize(rt, &args[0], &args[1])?;
        Ok(Value::Undefined)
    });
    install(&g.initialize, c, &[&c.class, &c.list], false, |rt, args, _| {
        class_initialize(rt, expect_class(&args[0])?, &args[1])?;
        Ok(Value::Undefined)
    });
    install(&g.initialize, c, &[&c.generic, &c.list], false, |rt, args, _| {
        generic_initialize(rt, &args[0], &args[1])?;
        Ok(Value::Undefined)
    });
    install(&g.initialize, c, &[&c.method, &c.list], false, |rt, args, _| {
        method_initialize(rt, &args[0], &args[1])?;
        Ok(Value::Undefined)
    });
    g.initialize.set_fallback(Fallback::Native(builtin_initialize));

    install(&g.add_method, c, &[&c.generic, &c.method], false, |_, args, _| {
        let generic = expect_generic(&args[0])?;
        generic.add_method(expect_method(&args[1])?)?;
        Ok(args[0].clone())
    });

    install(&g.compute_cpl, c, &[&c.class], false, |rt, args, _| {
        Ok(class_list(compute_cpl(rt, expect_class(&args[0])?)?))
    });

    install(&g.compute_slots, c, &[&c.class], false, |_, args, _| {
        Ok(Value::list(compute_slots(expect_class(&args[0])?)))
    });

    install(&g.compute_get_n_set, c, &[&c.class, &c.top], false, |rt, args, _| {
        compute_get_n_set(rt, &args[1])
    });

    install(
        &g.compute_applicable_methods,
        c,
        &[&c.generic, &c.list],
        false,
        |rt, args, _| {
            let generic = expect_generic(&args[0])?;
            let call_args = args[1]
                .to_vec()
                .ok_or_else(|| Error::wrong_type("proper list", &args[1]))?;
            let classes = rt.arg_classes(&call_args);
            let methods = compute_applicable_methods(generic, &classes);
            Ok(Value::list(methods.into_iter().map(Value::Method)))
        },
    );

    install(
        &g.method_more_specific_p,
        c,
        &[&c.method, &c.method, &c.list],
        false,
        |_, args, _| {
            let classes = args[2]
                .to_vec()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|v| v.as_class().cloned())
                        .collect::<Option<Vec<Class>>>()
                })
                .ok_or_else(|| Error::wrong_type("list of classes", &args[2]))?;
            let more = checked_method_more_specific(
                expect_method(&args[0])?,
                expect_method(&args[1])?,
                &classes,
            )?;
            Ok(Value::Bool(more))
        },
    );

    install(&g.apply_generic, c, &[&c.generic, &c.list], false, |rt, args, _| {
        let call_args = args[1]
            .to_vec()
            .ok_or_else(|| Error::wrong_type("proper list", &args[1]))?;
        rt.dispatch_generic(expect_generic(&args[0])?, &call_args)
    });

    install(
        &g.slot_missing,
        c,
        &[&c.class, &c.top, &c.top],
        true,
        |_, args, _| {
            Err(Error::SlotMissing {
                class: expect_class(&args[0])?.name_string(),
                slot: format!("{:?}", args[2]),
            })
        },
    );

    install(
        &g.slot_unbound,
        c,
        &[&c.class, &c.top, &c.top],
        false,
        |_, args, _| {
            Err(Error::SlotUnbound {
                class: expect_class(&args[0])?.name_string(),
                slot: format!("{:?}", args[2]),
            })
        },
    );

    install(
        &g.slot_bound_using_class_p,
        c,
        &[&c.class, &c.top, &c.top],
        false,
        |rt, args, _| rt.slot_ref_using(&args[1], slot_name(&args[2])?, true),
    );

    g
}
