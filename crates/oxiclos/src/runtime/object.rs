//! Instances, allocation strategies and the initialization protocol.
//!
//! `make` runs in three steps, each a generic function so metaclasses can
//! take over any of them:
//!
//! 1. `make`: the entry point, `(make class initarg ...)`; for classes,
//!    a `:metaclass` initarg selects the metaclass actually instantiated
//! 2. `allocate-instance`: calls the class's resolved allocator
//! 3. `initialize`: fills slots from the initargs
//!
//! The builtin `initialize` methods live here: on `<object>` (slot by slot
//! in class order), `<class>` (class creation), `<generic>` and `<method>`.
//! Native classes without a method fall through to the generic's fallback,
//! which only sets native slots named by their init keywords.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::category::Allocator;
use crate::runtime::generic::MethodBody;
use crate::runtime::keyword::{check_even, find_keyword, get_keyword};
use crate::runtime::slot::{SlotStorage, initialize_slots};
use crate::runtime::{Class, ClassCategory, Generic, Method, Runtime, SlotAccessor, Value};

/// An instance of a user-defined class.
#[derive(Clone)]
pub struct Instance {
    inner: Rc<InstanceInner>,
}

struct InstanceInner {
    class: Class,
    slots: RefCell<Vec<Value>>,
}

impl Instance {
    /// Creates an instance with every boxed slot unbound.
    #[must_use]
    pub fn new(class: Class) -> Instance {
        let slots = vec![Value::Unbound; class.num_instance_slots()];
        Instance {
            inner: Rc::new(InstanceInner {
                class,
                slots: RefCell::new(slots),
            }),
        }
    }

    #[must_use]
    pub fn class(&self) -> &Class {
        &self.inner.class
    }

    pub(crate) fn slots(&self) -> &RefCell<Vec<Value>> {
        &self.inner.slots
    }

    /// Returns the number of boxed slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Instance {}

fn allocate_object(_: &Runtime, class: &Class, _: &Value) -> Result<Value> {
    Ok(Value::Instance(Instance::new(class.clone())))
}

fn allocate_class(rt: &Runtime, class: &Class, _: &Value) -> Result<Value> {
    let metaclass = (*class != rt.builtins().class).then(|| class.clone());
    Ok(Value::Class(Class::new_raw(
        Value::Bool(false),
        ClassCategory::UserDefined,
        metaclass,
        class.num_instance_slots(),
    )))
}

fn allocate_generic(_: &Runtime, class: &Class, _: &Value) -> Result<Value> {
    Ok(Value::Generic(Generic::new(class.clone(), Value::Bool(false))))
}

fn allocate_method(_: &Runtime, class: &Class, _: &Value) -> Result<Value> {
    Ok(Value::Method(Method::new(class.clone())))
}

fn allocate_slot_accessor(rt: &Runtime, _: &Class, initargs: &Value) -> Result<Value> {
    let keys = rt.keys();
    let storage = if let Some(number) = find_keyword(keys.slot_number, initargs)? {
        let number = number
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| Error::wrong_type("non-negative integer", &number))?;
        SlotStorage::Instance(number)
    } else if let Some(getter) = find_keyword(keys.slot_ref, initargs)? {
        let setter = find_keyword(keys.slot_set, initargs)?;
        SlotStorage::Procedural { getter, setter }
    } else {
        SlotStorage::Unresolved
    };

    let mut accessor = SlotAccessor::unresolved();
    accessor.set_storage(storage);
    if let Some(value) = find_keyword(keys.init_value, initargs)? {
        accessor = accessor.with_init_value(value);
    }
    if let Some(kw) = find_keyword(keys.init_keyword, initargs)? {
        let kw = kw
            .as_keyword()
            .ok_or_else(|| Error::wrong_type("keyword", &kw))?;
        accessor = accessor.with_init_keyword(kw);
    }
    if let Some(thunk) = find_keyword(keys.init_thunk, initargs)? {
        accessor = accessor.with_init_thunk(thunk);
    }
    if let Some(flag) = find_keyword(keys.read_only, initargs)? {
        accessor = accessor.with_read_only(flag.is_true());
    }
    Ok(Value::Accessor(accessor))
}

/// Allocates plain instances with boxed slots.
pub const OBJECT_ALLOCATOR: Allocator = Allocator::new("object", allocate_object);
/// Allocates class metaobjects.
pub const CLASS_ALLOCATOR: Allocator = Allocator::new("class", allocate_class);
/// Allocates generic functions.
pub const GENERIC_ALLOCATOR: Allocator = Allocator::new("generic", allocate_generic);
/// Allocates methods.
pub const METHOD_ALLOCATOR: Allocator = Allocator::new("method", allocate_method);
/// Allocates slot accessors from their initargs.
pub const SLOT_ACCESSOR_ALLOCATOR: Allocator =
    Allocator::new("slot-accessor", allocate_slot_accessor);

impl Runtime {
    /// Creates and initializes an instance of `class`.
    ///
    /// `initargs` alternate keywords and values.
    ///
    /// # Errors
    ///
    /// Errors from allocation (e.g. [`Error::NotInstantiable`]) and from
    /// initialization.
    pub fn make(&self, class: &Class, initargs: &[Value]) -> Result<Value> {
        let mut args = Vec::with_capacity(initargs.len() + 1);
        args.push(Value::Class(class.clone()));
        args.extend_from_slice(initargs);
        self.apply_generic(&self.generics().make, &args)
    }

    /// Runs the class's allocation strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInstantiable`] for classes without an allocator.
    pub fn allocate(&self, class: &Class, initargs: &Value) -> Result<Value> {
        match class.allocator() {
            Some(allocator) => allocator.allocate(self, class, initargs),
            None => Err(Error::NotInstantiable {
                class: class.name_string(),
            }),
        }
    }
}

/// Picks the class to allocate: a `:metaclass` initarg, when `class` is a
/// metaclass, names a more specific metaclass to use instead.
fn effective_class(rt: &Runtime, class: &Value, initargs: &Value) -> Result<Value> {
    let Some(requested) = class.as_class() else {
        return Ok(class.clone());
    };
    if !requested.is_subclass_of(&rt.builtins().class) {
        return Ok(class.clone());
    }
    match find_keyword(rt.keys().metaclass, initargs)? {
        None => Ok(class.clone()),
        Some(Value::Class(meta)) if meta.is_subclass_of(requested) => Ok(Value::Class(meta)),
        Some(other) => Err(Error::wrong_type("metaclass", &other)),
    }
}

/// Body of the builtin `make` method: `(class initarg ...)`.
pub(crate) fn make_instance(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let initargs = Value::list(args[1..].iter().cloned());
    let class = effective_class(rt, &args[0], &initargs)?;
    let obj = rt.apply_generic(
        &rt.generics().allocate_instance,
        &[class, initargs.clone()],
    )?;
    rt.apply_generic(&rt.generics().initialize, &[obj.clone(), initargs])?;
    Ok(obj)
}

/// `initialize` on `<object>`.
pub(crate) fn object_initialize(rt: &Runtime, obj: &Value, initargs: &Value) -> Result<()> {
    check_even(initargs)?;
    let class = rt.class_of(obj);
    initialize_slots(rt, obj, &class, initargs, true)
}

/// `initialize` on `<generic>`.
pub(crate) fn generic_initialize(rt: &Runtime, obj: &Value, initargs: &Value) -> Result<()> {
    let generic = obj
        .as_generic()
        .ok_or_else(|| Error::wrong_type("generic function", obj))?;
    generic.set_name(get_keyword(rt.keys().name, initargs, Value::Bool(false))?);
    initialize_slots(rt, obj, generic.class(), initargs, false)
}

/// `initialize` on `<method>`.
///
/// Reads `:generic`, `:specializers`, `:lambda-list` and `:body`. A dotted
/// lambda list makes the method take optional arguments. The method is bound
/// to the generic but not added to it.
pub(crate) fn method_initialize(rt: &Runtime, obj: &Value, initargs: &Value) -> Result<()> {
    let keys = rt.keys();
    let method = obj
        .as_method()
        .ok_or_else(|| Error::wrong_type("method", obj))?;

    let generic = get_keyword(keys.generic, initargs, Value::Unbound)?;
    let generic = generic
        .as_generic()
        .ok_or_else(|| Error::wrong_type("generic function", &generic))?;

    let specs_value = get_keyword(keys.specializers, initargs, Value::Unbound)?;
    let specializers = specs_value
        .to_vec()
        .and_then(|items| {
            items
                .iter()
                .map(|v| v.as_class().cloned())
                .collect::<Option<Vec<Class>>>()
        })
        .ok_or_else(|| Error::wrong_type("list of classes", &specs_value))?;

    let lambda_list = get_keyword(keys.lambda_list, initargs, Value::Unbound)?;
    let mut params = lambda_list.iter_list();
    let required = params.by_ref().count();
    let optional = !params.rest().is_null();

    let body = get_keyword(keys.body, initargs, Value::Unbound)?;
    let body = body
        .as_procedure()
        .ok_or_else(|| Error::wrong_type("procedure", &body))?;

    if specializers.len() != required {
        return Err(Error::InvalidMethod {
            reason: format!(
                "specializer list doesn't match body's lambda list: {specs_value:?} vs {lambda_list:?}"
            ),
        });
    }
    let expected = required + usize::from(optional) + 1;
    if body.required() != expected {
        return Err(Error::InvalidMethod {
            reason: format!(
                "body must take {expected} arguments, but {body:?} takes {}",
                body.required()
            ),
        });
    }

    method.set_signature(specializers, optional);
    method.set_body(MethodBody::Procedure(body.clone()));
    method.bind(generic);
    initialize_slots(rt, obj, method.class(), initargs, false)
}

/// Fallback of `initialize`: sets native slots whose init keyword appears
/// in the initargs.
pub(crate) fn builtin_initialize(rt: &Runtime, _: &Generic, args: &[Value]) -> Result<Value> {
    let (Some(obj), Some(initargs)) = (args.first(), args.get(1)) else {
        return Ok(Value::Undefined);
    };
    check_even(initargs)?;
    let class = rt.class_of(obj);
    for (_, accessor) in class.accessors() {
        let (SlotStorage::Native { setter: Some(setter), .. }, Some(keyword)) =
            (accessor.storage(), accessor.init_keyword())
        else {
            continue;
        };
        if let Some(value) = find_keyword(keyword, initargs)? {
            setter(rt, obj, value)?;
        }
    }
    Ok(Value::Undefined)
}
