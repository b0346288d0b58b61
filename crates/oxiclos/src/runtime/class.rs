//! Class metaobjects and the class-creation protocol.
//!
//! This module implements:
//! - the [`Class`] handle and its reflective state
//! - validating setters used by the native slots of `<class>`
//! - slot computation (`compute-slots`) and accessor construction
//! - the `initialize` method for classes
//!
//! # Architecture
//!
//! A `Class` is a cheap `Rc` handle; equality is identity. Links up the
//! hierarchy (direct supers, CPA) are strong, links down (direct
//! subclasses) are weak, so an unreferenced subclass is dropped even while
//! its supers live on. The CPA is the class precedence list without the
//! class itself, which keeps a class from owning itself.
//!
//! Reflective setters validate the complete new value before touching the
//! class. On error the class is left exactly as it was.
//!
//! # Example
//!
//! ```
//! use oxiclos::{Runtime, SlotSpec, Value};
//!
//! let rt = Runtime::new();
//! let point = rt
//!     .define_class("<point>", &[], &[
//!         SlotSpec::new("x").init_value(Value::Int(0)).build(&rt),
//!         SlotSpec::new("y").init_keyword("y").build(&rt),
//!     ])
//!     .unwrap();
//!
//! let names: Vec<String> = point.cpl().iter().map(|c| c.name_string()).collect();
//! assert_eq!(names, ["<point>", "<object>", "<top>"]);
//! assert_eq!(point.num_instance_slots(), 2);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;
use oxiclos_intern::Symbol;
use oxiclos_log::debug;

use crate::error::{Error, Result};
use crate::runtime::category::{
    Allocator, ClassCategory, ClassHooks, CompareHook, PrintHook, SerializeHook, resolve_base,
};
use crate::runtime::keyword::{find_keyword, get_keyword};
use crate::runtime::slot::{SlotAccessor, SlotStorage, initialize_slots};
use crate::runtime::{Runtime, Value};

/// A class metaobject.
#[derive(Clone)]
pub struct Class {
    inner: Rc<ClassInner>,
}

pub(crate) struct ClassInner {
    metaclass: RefCell<Option<Class>>,
    name: RefCell<Value>,
    category: ClassCategory,
    hooks: RefCell<ClassHooks>,
    direct_supers: RefCell<Vec<Class>>,
    cpa: RefCell<Vec<Class>>,
    direct_slots: RefCell<Vec<Value>>,
    slots: RefCell<Vec<Value>>,
    accessors: RefCell<AccessorTable>,
    direct_subclasses: RefCell<Vec<Weak<ClassInner>>>,
    num_instance_slots: Cell<usize>,
    instance_slot_offset: Cell<usize>,
    islots: RefCell<Vec<Value>>,
}

/// Ordered slot-name → accessor mapping with a hash index.
///
/// Order is the class's slot order; lookups go through the index. When a
/// name occurs twice the first entry wins.
#[derive(Clone, Default)]
pub(crate) struct AccessorTable {
    entries: Vec<(Symbol, SlotAccessor)>,
    index: FxHashMap<Symbol, usize>,
}

impl AccessorTable {
    pub(crate) fn from_entries(entries: Vec<(Symbol, SlotAccessor)>) -> Self {
        let mut index = FxHashMap::default();
        for (position, (name, _)) in entries.iter().enumerate() {
            index.entry(*name).or_insert(position);
        }
        AccessorTable { entries, index }
    }

    fn get(&self, name: Symbol) -> Option<&SlotAccessor> {
        self.index.get(&name).map(|&i| &self.entries[i].1)
    }
}

impl Class {
    /// Creates a bare class. `islots` is the number of boxed slots the class
    /// object itself carries (its metaclass's instance-slot count).
    pub(crate) fn new_raw(
        name: Value,
        category: ClassCategory,
        metaclass: Option<Class>,
        islots: usize,
    ) -> Class {
        Class {
            inner: Rc::new(ClassInner {
                metaclass: RefCell::new(metaclass),
                name: RefCell::new(name),
                category,
                hooks: RefCell::new(ClassHooks::default()),
                direct_supers: RefCell::new(Vec::new()),
                cpa: RefCell::new(Vec::new()),
                direct_slots: RefCell::new(Vec::new()),
                slots: RefCell::new(Vec::new()),
                accessors: RefCell::new(AccessorTable::default()),
                direct_subclasses: RefCell::new(Vec::new()),
                num_instance_slots: Cell::new(0),
                instance_slot_offset: Cell::new(0),
                islots: RefCell::new(vec![Value::Unbound; islots]),
            }),
        }
    }

    /// Returns the class name (normally a symbol).
    #[must_use]
    pub fn name(&self) -> Value {
        self.inner.name.borrow().clone()
    }

    /// Returns the class name as text.
    #[must_use]
    pub fn name_string(&self) -> String {
        match &*self.inner.name.borrow() {
            Value::Symbol(sym) => sym.as_str().to_owned(),
            Value::Str(s) => s.to_string(),
            other => format!("{other:?}"),
        }
    }

    pub fn set_name(&self, name: Value) {
        *self.inner.name.borrow_mut() = name;
    }

    #[must_use]
    pub fn category(&self) -> ClassCategory {
        self.inner.category
    }

    /// Returns the metaclass, or `None` when it is `<class>` itself.
    #[must_use]
    pub fn metaclass(&self) -> Option<Class> {
        self.inner.metaclass.borrow().clone()
    }

    #[must_use]
    pub fn direct_supers(&self) -> Vec<Class> {
        self.inner.direct_supers.borrow().clone()
    }

    /// Returns the class precedence list, starting with this class.
    #[must_use]
    pub fn cpl(&self) -> Vec<Class> {
        let cpa = self.inner.cpa.borrow();
        let mut cpl = Vec::with_capacity(cpa.len() + 1);
        cpl.push(self.clone());
        cpl.extend(cpa.iter().cloned());
        cpl
    }

    /// Returns the class precedence list without this class.
    #[must_use]
    pub fn cpa(&self) -> Vec<Class> {
        self.inner.cpa.borrow().clone()
    }

    /// Runs `f` over the CPA without cloning it.
    pub fn with_cpa<R>(&self, f: impl FnOnce(&[Class]) -> R) -> R {
        f(&self.inner.cpa.borrow())
    }

    /// Checks whether this class is `other` or has `other` in its CPL.
    ///
    /// Reflexive and, because CPLs are closed under ancestry, transitive.
    #[must_use]
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self == other || self.inner.cpa.borrow().iter().any(|c| c == other)
    }

    #[must_use]
    pub fn direct_slots(&self) -> Vec<Value> {
        self.inner.direct_slots.borrow().clone()
    }

    #[must_use]
    pub fn slots(&self) -> Vec<Value> {
        self.inner.slots.borrow().clone()
    }

    /// Returns the accessor table in slot order.
    #[must_use]
    pub fn accessors(&self) -> Vec<(Symbol, SlotAccessor)> {
        self.inner.accessors.borrow().entries.clone()
    }

    /// Looks up the accessor for one slot.
    #[must_use]
    pub fn accessor(&self, name: Symbol) -> Option<SlotAccessor> {
        self.inner.accessors.borrow().get(name).cloned()
    }

    /// Returns the live direct subclasses.
    #[must_use]
    pub fn direct_subclasses(&self) -> Vec<Class> {
        self.inner
            .direct_subclasses
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|inner| Class { inner })
            .collect()
    }

    #[must_use]
    pub fn num_instance_slots(&self) -> usize {
        self.inner.num_instance_slots.get()
    }

    #[must_use]
    pub fn instance_slot_offset(&self) -> usize {
        self.inner.instance_slot_offset.get()
    }

    /// Returns the resolved allocation strategy, if the class can allocate.
    #[must_use]
    pub fn allocator(&self) -> Option<Allocator> {
        self.inner.hooks.borrow().allocate
    }

    #[must_use]
    pub fn hooks(&self) -> ClassHooks {
        self.inner.hooks.borrow().clone()
    }

    /// Installs a print hook for instances of this class and its subclasses.
    pub fn set_print_hook<F>(&self, hook: F)
    where
        F: Fn(&Runtime, &Value, &mut String) -> Result<()> + 'static,
    {
        self.inner.hooks.borrow_mut().print = Some(Rc::new(hook));
    }

    /// Installs a compare hook.
    pub fn set_compare_hook<F>(&self, hook: F)
    where
        F: Fn(&Runtime, &Value, &Value) -> Result<Option<std::cmp::Ordering>> + 'static,
    {
        self.inner.hooks.borrow_mut().compare = Some(Rc::new(hook));
    }

    /// Installs a serialize hook.
    pub fn set_serialize_hook<F>(&self, hook: F)
    where
        F: Fn(&Runtime, &Value, &mut String) -> Result<()> + 'static,
    {
        self.inner.hooks.borrow_mut().serialize = Some(Rc::new(hook));
    }

    /// Finds the nearest print hook along the CPL.
    pub(crate) fn find_print_hook(&self) -> Option<PrintHook> {
        self.find_hook(|h| h.print.clone())
    }

    pub(crate) fn find_compare_hook(&self) -> Option<CompareHook> {
        self.find_hook(|h| h.compare.clone())
    }

    pub(crate) fn find_serialize_hook(&self) -> Option<SerializeHook> {
        self.find_hook(|h| h.serialize.clone())
    }

    fn find_hook<T>(&self, pick: impl Fn(&ClassHooks) -> Option<T>) -> Option<T> {
        pick(&self.inner.hooks.borrow()).or_else(|| {
            self.inner
                .cpa
                .borrow()
                .iter()
                .find_map(|c| pick(&c.inner.hooks.borrow()))
        })
    }

    pub(crate) fn islots(&self) -> &RefCell<Vec<Value>> {
        &self.inner.islots
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Raw setters used while bootstrapping and finalizing.
    // ------------------------------------------------------------------

    pub(crate) fn set_allocator(&self, allocator: Option<Allocator>) {
        self.inner.hooks.borrow_mut().allocate = allocator;
    }

    pub(crate) fn set_instance_slot_offset(&self, offset: usize) {
        self.inner.instance_slot_offset.set(offset);
    }

    pub(crate) fn set_num_instance_slots(&self, count: usize) {
        self.inner.num_instance_slots.set(count);
    }

    pub(crate) fn set_hierarchy_raw(&self, direct_supers: Vec<Class>, cpa: Vec<Class>) {
        *self.inner.direct_supers.borrow_mut() = direct_supers;
        *self.inner.cpa.borrow_mut() = cpa;
    }

    pub(crate) fn set_slot_layout_raw(
        &self,
        direct_slots: Vec<Value>,
        slots: Vec<Value>,
        accessors: Vec<(Symbol, SlotAccessor)>,
    ) {
        *self.inner.direct_slots.borrow_mut() = direct_slots;
        *self.inner.slots.borrow_mut() = slots;
        *self.inner.accessors.borrow_mut() = AccessorTable::from_entries(accessors);
    }

    pub(crate) fn add_direct_subclass(&self, sub: &Class) {
        let mut subs = self.inner.direct_subclasses.borrow_mut();
        subs.retain(|w| w.strong_count() > 0);
        if !subs.iter().any(|w| w.as_ptr() == Rc::as_ptr(&sub.inner)) {
            subs.push(Rc::downgrade(&sub.inner));
        }
    }

    // ------------------------------------------------------------------
    // Validating setters (the native slots of <class>).
    // ------------------------------------------------------------------

    /// Builtin classes are immutable; only user-defined classes can be
    /// changed through their reflective slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImmutableClass`] for any other category.
    pub fn check_mutable(&self, slot: &str) -> Result<()> {
        if self.category() == ClassCategory::UserDefined {
            Ok(())
        } else {
            Err(Error::ImmutableClass {
                class: self.name_string(),
                slot: slot.to_owned(),
            })
        }
    }

    /// Replaces the direct supers. Every element must be a class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonClassInSupers`] naming the first non-class, and
    /// [`Error::ImmutableClass`] for builtin classes.
    pub fn set_direct_supers(&self, supers: &Value) -> Result<()> {
        self.check_mutable("direct-supers")?;
        let classes = class_list(supers, |value| Error::NonClassInSupers { value })?;
        *self.inner.direct_supers.borrow_mut() = classes;
        Ok(())
    }

    /// Replaces the class precedence list and re-resolves the allocator.
    ///
    /// The list must start with this class and end with `<top>`.
    ///
    /// # Errors
    ///
    /// - [`Error::ImmutableClass`] for builtin classes
    /// - [`Error::InvalidCpl`] for a malformed list
    /// - [`Error::FinalClassInherited`], [`Error::MultipleBaseClasses`] or
    ///   [`Error::NoBaseClass`] from allocator resolution
    pub fn set_cpl(&self, rt: &Runtime, cpl: &Value) -> Result<()> {
        self.check_mutable("cpl")?;
        let invalid = || Error::InvalidCpl {
            class: self.name_string(),
            cpl: format!("{cpl:?}"),
        };
        let classes = class_list(cpl, |_| invalid())?;
        let (first, cpa) = classes.split_first().ok_or_else(invalid)?;
        if first != self || cpa.last() != Some(&rt.builtins().top) {
            return Err(invalid());
        }

        let resolved = resolve_base(cpl, cpa)?;

        *self.inner.cpa.borrow_mut() = cpa.to_vec();
        self.set_allocator(Some(resolved.allocator));
        self.set_instance_slot_offset(resolved.instance_slot_offset);
        Ok(())
    }

    /// Replaces the direct slot specs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadSlotSpec`] if an element is not `(name . options)`.
    pub fn set_direct_slots(&self, specs: &Value) -> Result<()> {
        self.check_mutable("direct-slots")?;
        let specs = slot_spec_list(specs)?;
        *self.inner.direct_slots.borrow_mut() = specs;
        Ok(())
    }

    /// Replaces the effective slot specs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadSlotSpec`] if an element is not `(name . options)`.
    pub fn set_slots(&self, specs: &Value) -> Result<()> {
        self.check_mutable("slots")?;
        let specs = slot_spec_list(specs)?;
        *self.inner.slots.borrow_mut() = specs;
        Ok(())
    }

    /// Replaces the accessor table from an alist of
    /// `(name . <slot-accessor>)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadAccessorList`] naming the first bad entry.
    pub fn set_accessors(&self, alist: &Value) -> Result<()> {
        self.check_mutable("accessors")?;
        let items = alist.to_vec().ok_or_else(|| Error::BadAccessorList {
            entry: format!("{alist:?}"),
        })?;
        let mut entries = Vec::with_capacity(items.len());
        for item in &items {
            let entry = match (item.car(), item.cdr()) {
                (Some(Value::Symbol(name)), Some(Value::Accessor(acc))) => (*name, acc.clone()),
                _ => {
                    return Err(Error::BadAccessorList {
                        entry: format!("{item:?}"),
                    });
                }
            };
            entries.push(entry);
        }
        *self.inner.accessors.borrow_mut() = AccessorTable::from_entries(entries);
        Ok(())
    }

    /// Replaces the direct subclass list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongType`] unless given a proper list of classes.
    pub fn set_direct_subclasses(&self, subs: &Value) -> Result<()> {
        self.check_mutable("direct-subclasses")?;
        let classes = class_list(subs, |got| Error::WrongType {
            expected: "list of classes",
            got,
        })?;
        *self.inner.direct_subclasses.borrow_mut() =
            classes.iter().map(|c| Rc::downgrade(&c.inner)).collect();
        Ok(())
    }

    /// Sets the instance-slot count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongType`] unless given a non-negative integer.
    pub fn set_num_instance_slots_value(&self, count: &Value) -> Result<()> {
        self.check_mutable("num-instance-slots")?;
        match count.as_int().and_then(|n| usize::try_from(n).ok()) {
            Some(n) => {
                self.set_num_instance_slots(n);
                Ok(())
            }
            None => Err(Error::wrong_type("non-negative integer", count)),
        }
    }
}

/// Parses a proper list of classes. `bad` builds the error from the printed
/// offending element (or the whole value, if it is not a list).
fn class_list(value: &Value, bad: impl Fn(String) -> Error) -> Result<Vec<Class>> {
    let items = value.to_vec().ok_or_else(|| bad(format!("{value:?}")))?;
    items
        .iter()
        .map(|item| item.as_class().cloned().ok_or_else(|| bad(format!("{item:?}"))))
        .collect()
}

fn slot_spec_list(value: &Value) -> Result<Vec<Value>> {
    let items = value.to_vec().ok_or_else(|| Error::BadSlotSpec {
        spec: format!("{value:?}"),
    })?;
    for item in &items {
        if !matches!(item.car(), Some(Value::Symbol(_))) {
            return Err(Error::BadSlotSpec {
                spec: format!("{item:?}"),
            });
        }
    }
    Ok(items)
}

impl PartialEq for Class {
    fn eq(&self, other: &Class) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.inner).hash(state);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<class {}>", self.name_string())
    }
}

// ----------------------------------------------------------------------
// Class-creation protocol
// ----------------------------------------------------------------------

/// Normalizes a `:slots` argument: bare symbols become `(name)`.
fn normalize_slot_specs(slots: &Value) -> Result<Value> {
    let items = slots.to_vec().ok_or_else(|| Error::BadSlotSpec {
        spec: format!("{slots:?}"),
    })?;
    let normalized = items
        .into_iter()
        .map(|item| {
            if item.as_symbol().is_some() {
                Ok(Value::list([item]))
            } else if matches!(item.car(), Some(Value::Symbol(_))) {
                Ok(item)
            } else {
                Err(Error::BadSlotSpec {
                    spec: format!("{item:?}"),
                })
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::list(normalized))
}

/// Computes the effective slot specs of `class` from its CPL.
///
/// The CPL is walked from `<top>` towards the class. A spec from a more
/// specific class replaces a less specific spec of the same name in place,
/// so inherited slots keep their position.
#[must_use]
pub fn compute_slots(class: &Class) -> Vec<Value> {
    let mut slots: Vec<Value> = Vec::new();
    for ancestor in class.cpl().iter().rev() {
        for spec in ancestor.inner.direct_slots.borrow().iter() {
            let name = spec.car().and_then(Value::as_symbol);
            match slots
                .iter()
                .position(|s| s.car().and_then(Value::as_symbol) == name)
            {
                Some(i) => slots[i] = spec.clone(),
                None => slots.push(spec.clone()),
            }
        }
    }
    slots
}

/// The accessor of slot `name` in the nearest ancestor that has one, if that
/// ancestor's effective spec for it is `spec` itself.
fn inherited_accessor(cpa: &[Class], name: Symbol, spec: &Value) -> Option<SlotAccessor> {
    let (ancestor, accessor) = cpa
        .iter()
        .find_map(|c| c.accessor(name).map(|acc| (c, acc)))?;
    let same_spec = ancestor
        .inner
        .slots
        .borrow()
        .iter()
        .any(|s| s.is_eq(spec));
    same_spec.then_some(accessor)
}

/// Default `compute-get-n-set`: the access strategy of one slot spec.
///
/// Returns `:instance` for a boxed slot, `(getter . setter)` for
/// `:allocation :virtual` (setter `#f` when absent) and the given accessor
/// for `:allocation :builtin`.
///
/// # Errors
///
/// Returns [`Error::BadSlotSpec`] for an unknown allocation or missing or
/// non-applicable options.
pub(crate) fn compute_get_n_set(rt: &Runtime, spec: &Value) -> Result<Value> {
    let keys = rt.keys();
    let bad_spec = || Error::BadSlotSpec {
        spec: format!("{spec:?}"),
    };
    let options = spec.cdr().cloned().unwrap_or(Value::Nil);
    let allocation = get_keyword(keys.allocation, &options, Value::Keyword(keys.instance))?
        .as_keyword()
        .ok_or_else(bad_spec)?;

    if allocation == keys.instance {
        Ok(Value::Keyword(keys.instance))
    } else if allocation == keys.virtual_ {
        let getter = find_keyword(keys.slot_ref, &options)?.ok_or_else(bad_spec)?;
        let setter = find_keyword(keys.slot_set, &options)?.unwrap_or(Value::Bool(false));
        let pair = Value::cons(getter, setter);
        getter_n_setter(&pair).ok_or_else(bad_spec)?;
        Ok(pair)
    } else if allocation == keys.builtin {
        find_keyword(keys.slot_accessor, &options)?
            .filter(|v| v.as_accessor().is_some())
            .ok_or_else(bad_spec)
    } else {
        Err(bad_spec())
    }
}

/// Parses `(getter . setter)` into procedural storage. The setter may be
/// `#f`; both must otherwise be applicable.
pub(crate) fn getter_n_setter(value: &Value) -> Option<SlotStorage> {
    let (getter, setter) = (value.car()?, value.cdr()?);
    if !Runtime::is_applicable(getter) {
        return None;
    }
    let setter = match setter {
        Value::Bool(false) => None,
        s if Runtime::is_applicable(s) => Some(s.clone()),
        _ => return None,
    };
    Some(SlotStorage::Procedural {
        getter: getter.clone(),
        setter,
    })
}

/// Builds the accessor table for `class` from its effective slots.
///
/// Each slot's strategy comes from the `compute-get-n-set` generic, which
/// answers `:instance`, `(getter . setter)` or a `<slot-accessor>`.
/// Instance-allocated slots are numbered from the class's instance-slot
/// offset. An inherited accessor is reused when the slot spec is the very
/// same spec object and its storage is unchanged.
pub(crate) fn build_accessors(
    rt: &Runtime,
    class: &Class,
) -> Result<(Vec<(Symbol, SlotAccessor)>, usize)> {
    let keys = rt.keys();
    let this = Value::Class(class.clone());
    let offset = class.instance_slot_offset();
    let cpa = class.cpa();
    let mut count = 0;
    let mut entries = Vec::new();

    for spec in class.slots() {
        let bad_spec = || Error::BadSlotSpec {
            spec: format!("{spec:?}"),
        };
        let name = spec.car().and_then(Value::as_symbol).ok_or_else(bad_spec)?;
        let strategy = rt.apply_generic(
            &rt.generics().compute_get_n_set,
            &[this.clone(), spec.clone()],
        )?;
        let inherited = inherited_accessor(&cpa, name, &spec);

        let accessor = match &strategy {
            Value::Keyword(k) if *k == keys.instance => {
                let number = offset + count;
                count += 1;
                match inherited {
                    Some(acc) if acc.slot_number() == Some(number) => acc,
                    _ => SlotAccessor::from_options(rt, &spec, SlotStorage::Instance(number))?,
                }
            }
            Value::Accessor(acc) => acc.clone(),
            Value::Pair(_) => match inherited {
                Some(acc) if acc.is_procedural() => acc,
                _ => {
                    let storage = getter_n_setter(&strategy).ok_or_else(bad_spec)?;
                    SlotAccessor::from_options(rt, &spec, storage)?
                }
            },
            _ => return Err(bad_spec()),
        };
        entries.push((name, accessor));
    }
    Ok((entries, count))
}

/// `initialize` method on `<class>`: runs the class-creation protocol.
pub(crate) fn class_initialize(rt: &Runtime, class: &Class, initargs: &Value) -> Result<()> {
    let keys = rt.keys();
    let this = Value::Class(class.clone());

    let name = get_keyword(keys.name, initargs, Value::Bool(false))?;
    let supers = match get_keyword(keys.supers, initargs, Value::Nil)? {
        Value::Nil => Value::list([Value::Class(rt.builtins().object.clone())]),
        supers => supers,
    };
    let slots = normalize_slot_specs(&get_keyword(keys.slots, initargs, Value::Nil)?)?;

    class.set_name(name.clone());
    class.set_direct_supers(&supers)?;
    class.set_direct_slots(&slots)?;

    let cpl = rt.apply_generic(&rt.generics().compute_cpl, &[this.clone()])?;
    class.set_cpl(rt, &cpl)?;
    let slots = rt.apply_generic(&rt.generics().compute_slots, &[this.clone()])?;
    class.set_slots(&slots)?;

    let (accessors, count) = build_accessors(rt, class)?;
    *class.inner.accessors.borrow_mut() = AccessorTable::from_entries(accessors);
    class.set_num_instance_slots(count);

    let metaclass = rt.class_of(&this);
    initialize_slots(rt, &this, &metaclass, initargs, false)?;

    // Published only once every step has succeeded.
    for sup in class.direct_supers() {
        sup.add_direct_subclass(class);
    }
    if let Value::Symbol(sym) = name {
        rt.register_class(sym, class.clone());
    }
    debug!(
        "finalized class {} cpl={:?} instance_slots={}",
        class.name_string(),
        cpl,
        count
    );
    Ok(())
}
