//! Slot accessors and slot access.
//!
//! Every slot of a class is reached through a [`SlotAccessor`] stored in the
//! class's accessor table. The accessor decides where the value lives:
//!
//! - [`SlotStorage::Native`]: a pair of host functions reading and writing
//!   a field of a builtin object (e.g. the `name` slot of a class)
//! - [`SlotStorage::Instance`]: an index into the object's boxed slot vector
//! - [`SlotStorage::Procedural`]: user procedures (`:allocation :virtual`)
//! - [`SlotStorage::Unresolved`]: not accessible yet
//!
//! Missing and unbound slots are reported through the `slot-missing` and
//! `slot-unbound` generics, so user code can intercept them.
//!
//! # Example
//!
//! ```
//! use oxiclos::{Runtime, SlotSpec, Value};
//!
//! let rt = Runtime::new();
//! let point = rt
//!     .define_class("<point>", &[], &[SlotSpec::new("x").init_keyword("x").build(&rt)])
//!     .unwrap();
//!
//! let p = rt.make(&point, &[rt.keyword("x"), Value::Int(5)]).unwrap();
//! assert_eq!(rt.slot_ref(&p, "x").unwrap(), Value::Int(5));
//!
//! rt.slot_set(&p, "x", Value::Int(7)).unwrap();
//! assert_eq!(rt.slot_ref(&p, "x").unwrap(), Value::Int(7));
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use oxiclos_intern::Symbol;

use crate::error::{Error, Result};
use crate::runtime::keyword::find_keyword;
use crate::runtime::{Class, Keyword, Procedure, Runtime, Value};

/// Reads a native slot.
pub type NativeGetter = fn(&Runtime, &Value) -> Result<Value>;

/// Writes a native slot.
pub type NativeSetter = fn(&Runtime, &Value, Value) -> Result<()>;

/// Where a slot's value lives.
#[derive(Clone)]
pub enum SlotStorage {
    /// Host getter and optional setter. No setter means read-only.
    Native {
        getter: NativeGetter,
        setter: Option<NativeSetter>,
    },
    /// Boxed slot number, counted from the class's instance-slot offset.
    Instance(usize),
    /// User getter `(obj)` and optional setter `(obj value)`.
    Procedural { getter: Value, setter: Option<Value> },
    /// No strategy yet.
    Unresolved,
}

impl fmt::Debug for SlotStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStorage::Native { setter, .. } => {
                write!(f, "Native(read_only={})", setter.is_none())
            }
            SlotStorage::Instance(n) => write!(f, "Instance({n})"),
            SlotStorage::Procedural { setter, .. } => {
                write!(f, "Procedural(read_only={})", setter.is_none())
            }
            SlotStorage::Unresolved => f.write_str("Unresolved"),
        }
    }
}

/// The access strategy and initialization metadata of one slot.
///
/// Accessors are shared by reference: a subclass that inherits a slot with
/// an unchanged layout uses its superclass's accessor object.
#[derive(Clone)]
pub struct SlotAccessor {
    inner: Rc<AccessorInner>,
}

struct AccessorInner {
    storage: RefCell<SlotStorage>,
    init_value: RefCell<Value>,
    init_keyword: Cell<Option<Keyword>>,
    init_thunk: RefCell<Option<Value>>,
    read_only: Cell<bool>,
}

impl SlotAccessor {
    fn with_storage(storage: SlotStorage) -> Self {
        SlotAccessor {
            inner: Rc::new(AccessorInner {
                storage: RefCell::new(storage),
                init_value: RefCell::new(Value::Unbound),
                init_keyword: Cell::new(None),
                init_thunk: RefCell::new(None),
                read_only: Cell::new(false),
            }),
        }
    }

    /// Creates an accessor backed by host functions.
    #[must_use]
    pub fn native(getter: NativeGetter, setter: Option<NativeSetter>) -> Self {
        SlotAccessor::with_storage(SlotStorage::Native { getter, setter })
    }

    /// Creates an accessor for boxed slot `number`.
    #[must_use]
    pub fn instance(number: usize) -> Self {
        SlotAccessor::with_storage(SlotStorage::Instance(number))
    }

    /// Creates an accessor backed by user procedures.
    #[must_use]
    pub fn procedural(getter: Value, setter: Option<Value>) -> Self {
        SlotAccessor::with_storage(SlotStorage::Procedural { getter, setter })
    }

    /// Creates an accessor with no storage strategy.
    #[must_use]
    pub fn unresolved() -> Self {
        SlotAccessor::with_storage(SlotStorage::Unresolved)
    }

    #[must_use]
    pub fn with_init_value(self, value: Value) -> Self {
        *self.inner.init_value.borrow_mut() = value;
        self
    }

    #[must_use]
    pub fn with_init_keyword(self, keyword: Keyword) -> Self {
        self.inner.init_keyword.set(Some(keyword));
        self
    }

    #[must_use]
    pub fn with_init_thunk(self, thunk: Value) -> Self {
        *self.inner.init_thunk.borrow_mut() = Some(thunk);
        self
    }

    #[must_use]
    pub fn with_read_only(self, read_only: bool) -> Self {
        self.inner.read_only.set(read_only);
        self
    }

    /// Builds an accessor from the options of a slot spec `(name . options)`.
    pub(crate) fn from_options(rt: &Runtime, spec: &Value, storage: SlotStorage) -> Result<Self> {
        let keys = rt.keys();
        let options = spec.cdr().cloned().unwrap_or(Value::Nil);
        let bad_spec = || Error::BadSlotSpec {
            spec: format!("{spec:?}"),
        };

        let mut accessor = SlotAccessor::with_storage(storage);
        if let Some(value) = find_keyword(keys.init_value, &options)? {
            accessor = accessor.with_init_value(value);
        }
        if let Some(kw) = find_keyword(keys.init_keyword, &options)? {
            accessor = accessor.with_init_keyword(kw.as_keyword().ok_or_else(bad_spec)?);
        }
        if let Some(thunk) = find_keyword(keys.init_thunk, &options)? {
            if !Runtime::is_applicable(&thunk) {
                return Err(bad_spec());
            }
            accessor = accessor.with_init_thunk(thunk);
        }
        if let Some(flag) = find_keyword(keys.read_only, &options)? {
            accessor = accessor.with_read_only(flag.is_true());
        }
        Ok(accessor)
    }

    #[must_use]
    pub fn storage(&self) -> SlotStorage {
        self.inner.storage.borrow().clone()
    }

    pub(crate) fn set_storage(&self, storage: SlotStorage) {
        *self.inner.storage.borrow_mut() = storage;
    }

    /// Returns the boxed slot number for instance-allocated slots.
    #[must_use]
    pub fn slot_number(&self) -> Option<usize> {
        match *self.inner.storage.borrow() {
            SlotStorage::Instance(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(*self.inner.storage.borrow(), SlotStorage::Native { .. })
    }

    #[must_use]
    pub fn is_procedural(&self) -> bool {
        matches!(*self.inner.storage.borrow(), SlotStorage::Procedural { .. })
    }

    /// Returns the init value, or [`Value::Unbound`] when there is none.
    #[must_use]
    pub fn init_value(&self) -> Value {
        self.inner.init_value.borrow().clone()
    }

    #[must_use]
    pub fn init_keyword(&self) -> Option<Keyword> {
        self.inner.init_keyword.get()
    }

    #[must_use]
    pub fn init_thunk(&self) -> Option<Value> {
        self.inner.init_thunk.borrow().clone()
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.read_only.get()
    }
}

impl PartialEq for SlotAccessor {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SlotAccessor {}

/// Builder for slot specs `(name :option value ...)`.
///
/// ```
/// use oxiclos::{Runtime, SlotSpec, Value};
///
/// let rt = Runtime::new();
/// let spec = SlotSpec::new("count")
///     .init_value(Value::Int(0))
///     .init_keyword("count")
///     .build(&rt);
/// assert_eq!(format!("{spec:?}"), "(count :init-value 0 :init-keyword :count)");
/// ```
#[derive(Debug, Clone)]
pub struct SlotSpec {
    name: String,
    options: Vec<(&'static str, SpecValue)>,
}

#[derive(Debug, Clone)]
enum SpecValue {
    Value(Value),
    Keyword(String),
}

impl SlotSpec {
    pub fn new(name: impl Into<String>) -> Self {
        SlotSpec {
            name: name.into(),
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn init_value(mut self, value: Value) -> Self {
        self.options.push(("init-value", SpecValue::Value(value)));
        self
    }

    #[must_use]
    pub fn init_keyword(mut self, keyword: &str) -> Self {
        self.options
            .push(("init-keyword", SpecValue::Keyword(keyword.to_owned())));
        self
    }

    #[must_use]
    pub fn init_thunk(mut self, thunk: Procedure) -> Self {
        self.options
            .push(("init-thunk", SpecValue::Value(Value::Procedure(thunk))));
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.options.push(("read-only", SpecValue::Value(Value::Bool(true))));
        self
    }

    /// Sets `:allocation` (`instance`, `virtual` or `builtin`).
    #[must_use]
    pub fn allocation(mut self, allocation: &str) -> Self {
        self.options
            .push(("allocation", SpecValue::Keyword(allocation.to_owned())));
        self
    }

    /// Makes the slot virtual, computed by `getter` and stored by `setter`.
    #[must_use]
    pub fn virtual_accessors(self, getter: Procedure, setter: Option<Procedure>) -> Self {
        let mut spec = self.allocation("virtual");
        spec.options
            .push(("slot-ref", SpecValue::Value(Value::Procedure(getter))));
        if let Some(setter) = setter {
            spec.options
                .push(("slot-set!", SpecValue::Value(Value::Procedure(setter))));
        }
        spec
    }

    /// Adds an arbitrary option.
    #[must_use]
    pub fn option(mut self, key: &'static str, value: Value) -> Self {
        self.options.push((key, SpecValue::Value(value)));
        self
    }

    /// Builds the spec as a list value.
    #[must_use]
    pub fn build(&self, rt: &Runtime) -> Value {
        let mut items = vec![rt.symbol(&self.name)];
        for (key, value) in &self.options {
            items.push(rt.keyword(key));
            items.push(match value {
                SpecValue::Value(v) => v.clone(),
                SpecValue::Keyword(k) => rt.keyword(k),
            });
        }
        Value::list(items)
    }
}

/// Anything that names a slot.
pub trait SlotName {
    fn to_symbol(&self, rt: &Runtime) -> Symbol;
}

impl SlotName for &str {
    fn to_symbol(&self, rt: &Runtime) -> Symbol {
        rt.intern(self)
    }
}

impl SlotName for Symbol {
    fn to_symbol(&self, _: &Runtime) -> Symbol {
        *self
    }
}

/// Returns the boxed slot vector of `obj`, if it has one.
pub(crate) fn instance_slots(obj: &Value) -> Option<&RefCell<Vec<Value>>> {
    match obj {
        Value::Instance(i) => Some(i.slots()),
        Value::Class(c) => Some(c.islots()),
        Value::Generic(g) => Some(g.islots()),
        Value::Method(m) => Some(m.islots()),
        _ => None,
    }
}

fn boxed_index(class: &Class, obj: &Value, number: usize) -> Result<usize> {
    number
        .checked_sub(class.instance_slot_offset())
        .ok_or_else(|| Error::SlotIndexOutOfBounds {
            object: format!("{obj:?}"),
            number,
        })
}

fn read_only_error(class: &Class, slot: Symbol) -> Error {
    Error::SlotReadOnly {
        class: class.name_string(),
        slot: slot.as_str().to_owned(),
    }
}

impl Runtime {
    /// Reads slot `slot` of `obj`.
    ///
    /// # Errors
    ///
    /// Whatever the `slot-missing` or `slot-unbound` generic returns when the
    /// slot does not exist or has no value (by default an error), and
    /// storage errors.
    pub fn slot_ref(&self, obj: &Value, slot: impl SlotName) -> Result<Value> {
        self.slot_ref_using(obj, slot.to_symbol(self), false)
    }

    /// Reads a slot. With `boundp` set, returns `#t`/`#f` for bound/unbound
    /// instead of the value.
    ///
    /// # Errors
    ///
    /// See [`Runtime::slot_ref`].
    pub fn slot_ref_using(&self, obj: &Value, slot: Symbol, boundp: bool) -> Result<Value> {
        let class = self.class_of(obj);
        let Some(accessor) = class.accessor(slot) else {
            return self.apply_generic(
                &self.generics().slot_missing,
                &[Value::Class(class), obj.clone(), Value::Symbol(slot)],
            );
        };

        let value = self.read_slot(&class, obj, slot, &accessor)?;
        if boundp {
            return Ok(Value::Bool(!value.is_unbound()));
        }
        if value.is_unbound() {
            return self.apply_generic(
                &self.generics().slot_unbound,
                &[Value::Class(class), obj.clone(), Value::Symbol(slot)],
            );
        }
        Ok(value)
    }

    /// Checks whether a slot has a value, through the
    /// `slot-bound-using-class?` generic.
    ///
    /// # Errors
    ///
    /// Propagates errors from the generic, e.g. for a missing slot.
    pub fn slot_bound_p(&self, obj: &Value, slot: impl SlotName) -> Result<bool> {
        let class = self.class_of(obj);
        let result = self.apply_generic(
            &self.generics().slot_bound_using_class_p,
            &[
                Value::Class(class),
                obj.clone(),
                Value::Symbol(slot.to_symbol(self)),
            ],
        )?;
        Ok(result.is_true())
    }

    /// Writes slot `slot` of `obj`.
    ///
    /// # Errors
    ///
    /// - [`Error::SlotReadOnly`] for slots without a setter and read-only
    ///   instance slots
    /// - whatever `slot-missing` returns for an unknown slot
    /// - storage errors
    pub fn slot_set(&self, obj: &Value, slot: impl SlotName, value: Value) -> Result<()> {
        let slot = slot.to_symbol(self);
        let class = self.class_of(obj);
        match class.accessor(slot) {
            Some(accessor) => self.write_slot(&class, obj, slot, &accessor, value, false),
            None => self
                .apply_generic(
                    &self.generics().slot_missing,
                    &[Value::Class(class), obj.clone(), Value::Symbol(slot), value],
                )
                .map(|_| ()),
        }
    }

    fn read_slot(
        &self,
        class: &Class,
        obj: &Value,
        slot: Symbol,
        accessor: &SlotAccessor,
    ) -> Result<Value> {
        match accessor.storage() {
            SlotStorage::Native { getter, .. } => getter(self, obj),
            SlotStorage::Instance(number) => {
                let slots = instance_slots(obj).ok_or_else(|| Error::NoInstanceSlots {
                    object: format!("{obj:?}"),
                })?;
                let index = boxed_index(class, obj, number)?;
                slots
                    .borrow()
                    .get(index)
                    .cloned()
                    .ok_or_else(|| Error::SlotIndexOutOfBounds {
                        object: format!("{obj:?}"),
                        number,
                    })
            }
            SlotStorage::Procedural { getter, .. } => self.apply(&getter, &[obj.clone()]),
            SlotStorage::Unresolved => Err(Error::SlotStorageUnresolved {
                slot: slot.as_str().to_owned(),
            }),
        }
    }

    /// Writes through an accessor. `initializing` bypasses the read-only
    /// flag of instance slots.
    pub(crate) fn write_slot(
        &self,
        class: &Class,
        obj: &Value,
        slot: Symbol,
        accessor: &SlotAccessor,
        value: Value,
        initializing: bool,
    ) -> Result<()> {
        match accessor.storage() {
            SlotStorage::Native { setter, .. } => match setter {
                Some(setter) => setter(self, obj, value),
                None => Err(read_only_error(class, slot)),
            },
            SlotStorage::Instance(number) => {
                if accessor.is_read_only() && !initializing {
                    return Err(read_only_error(class, slot));
                }
                let slots = instance_slots(obj).ok_or_else(|| Error::NoInstanceSlots {
                    object: format!("{obj:?}"),
                })?;
                let index = boxed_index(class, obj, number)?;
                let mut slots = slots.borrow_mut();
                let cell = slots
                    .get_mut(index)
                    .ok_or_else(|| Error::SlotIndexOutOfBounds {
                        object: format!("{obj:?}"),
                        number,
                    })?;
                *cell = value;
                Ok(())
            }
            SlotStorage::Procedural { setter, .. } => match setter {
                Some(setter) => self.apply(&setter, &[obj.clone(), value]).map(|_| ()),
                None => Err(read_only_error(class, slot)),
            },
            SlotStorage::Unresolved => Err(Error::SlotStorageUnresolved {
                slot: slot.as_str().to_owned(),
            }),
        }
    }
}

/// Initializes one slot of a freshly allocated object.
///
/// The init keyword wins when present in `initargs`. Otherwise an
/// instance-allocated slot takes its init value, or else the result of its
/// init thunk. A slot with none of these stays unbound.
pub(crate) fn initialize_slot(
    rt: &Runtime,
    obj: &Value,
    class: &Class,
    slot: Symbol,
    accessor: &SlotAccessor,
    initargs: &Value,
) -> Result<()> {
    if let Some(keyword) = accessor.init_keyword() {
        if let Some(value) = find_keyword(keyword, initargs)? {
            return rt.write_slot(class, obj, slot, accessor, value, true);
        }
    }
    if accessor.slot_number().is_none() {
        return Ok(());
    }

    let init = accessor.init_value();
    if !init.is_unbound() {
        return rt.write_slot(class, obj, slot, accessor, init, true);
    }
    if let Some(thunk) = accessor.init_thunk() {
        let value = rt.apply(&thunk, &[])?;
        return rt.write_slot(class, obj, slot, accessor, value, true);
    }
    Ok(())
}

/// Initializes the slots of `obj` in class order. Native slots are skipped
/// unless `include_native` is set.
pub(crate) fn initialize_slots(
    rt: &Runtime,
    obj: &Value,
    class: &Class,
    initargs: &Value,
    include_native: bool,
) -> Result<()> {
    for (slot, accessor) in class.accessors() {
        if !include_native && accessor.is_native() {
            continue;
        }
        initialize_slot(rt, obj, class, slot, &accessor, initargs)?;
    }
    Ok(())
}
