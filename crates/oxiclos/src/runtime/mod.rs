//! The object-system runtime.
//!
//! A [`Runtime`] owns everything the object system shares: the symbol and
//! keyword tables, the builtin classes and generics, and the name
//! registries. There is no global state; two runtimes are fully independent.
//!
//! # Example
//!
//! ```
//! use oxiclos::{Runtime, SlotSpec, Value};
//!
//! let rt = Runtime::new();
//! let shape = rt.define_class("<shape>", &[], &[]).unwrap();
//! let square = rt
//!     .define_class("<square>", &[shape.clone()], &[SlotSpec::new("side").init_keyword("side").build(&rt)])
//!     .unwrap();
//!
//! let area = rt.define_generic("area");
//! rt.define_method(&area, &[square.clone()], false, |rt, args, _| {
//!     let side = rt.slot_ref(&args[0], "side")?.as_int().unwrap_or(0);
//!     Ok(Value::Int(side * side))
//! })
//! .unwrap();
//!
//! let sq = rt.make(&square, &[rt.keyword("side"), Value::Int(3)]).unwrap();
//! assert_eq!(rt.apply_generic(&area, &[sq]).unwrap(), Value::Int(9));
//! ```

pub mod bootstrap;
pub mod category;
pub mod class;
pub mod cpl;
pub mod dispatch;
pub mod generic;
pub mod introspection;
pub mod keyword;
pub mod object;
pub mod print;
pub mod procedure;
pub mod slot;
pub mod value;

use std::cell::RefCell;

use fxhash::FxHashMap;
use oxiclos_intern::{Interner, Symbol};
use oxiclos_log::info;

pub use bootstrap::{BuiltinClasses, BuiltinGenerics};
pub use category::{Allocator, ClassCategory, ClassHooks};
pub use class::Class;
pub use generic::{Fallback, Generic, Method, MethodBody, NextMethod};
pub use keyword::Keyword;
pub use object::Instance;
pub use procedure::Procedure;
pub use slot::{SlotAccessor, SlotName, SlotSpec, SlotStorage};
pub use value::Value;

use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use bootstrap::Keys;
use keyword::KeywordTable;

/// The object-system runtime.
pub struct Runtime {
    config: RuntimeConfig,
    symbols: RefCell<Interner>,
    keywords: RefCell<KeywordTable>,
    keys: Keys,
    classes: BuiltinClasses,
    generics: BuiltinGenerics,
    class_registry: RefCell<FxHashMap<Symbol, Class>>,
    generic_registry: RefCell<FxHashMap<Symbol, Generic>>,
}

impl Runtime {
    /// Creates a runtime with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Runtime::with_config(RuntimeConfig::default())
    }

    /// Creates a runtime, applying the configured log level.
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        if let Some(level) = config.log_level() {
            oxiclos_log::set_level(level);
        }

        let mut symbols = Interner::with_capacity(config.class_registry_capacity());
        let mut keywords = KeywordTable::with_capacity(config.keyword_capacity());
        let keys = Keys::new(&mut keywords);
        let classes = bootstrap::bootstrap_classes(&mut symbols, &mut keywords, &keys);
        let generics = bootstrap::bootstrap_generics(&mut symbols, &classes);

        let mut class_registry = FxHashMap::default();
        class_registry.reserve(config.class_registry_capacity());

        let rt = Runtime {
            config,
            symbols: RefCell::new(symbols),
            keywords: RefCell::new(keywords),
            keys,
            classes,
            generics,
            class_registry: RefCell::new(class_registry),
            generic_registry: RefCell::new(FxHashMap::default()),
        };
        for class in rt.classes.all() {
            if let Value::Symbol(name) = class.name() {
                rt.register_class(name, class);
            }
        }
        for generic in rt.generics.all() {
            if let Value::Symbol(name) = generic.name() {
                rt.register_generic(name, generic);
            }
        }
        info!(
            "runtime ready: {} builtin classes, {} builtin generics",
            rt.class_registry.borrow().len(),
            rt.generic_registry.borrow().len()
        );
        rt
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the builtin classes.
    #[must_use]
    pub fn builtins(&self) -> &BuiltinClasses {
        &self.classes
    }

    /// Returns the builtin generic functions.
    #[must_use]
    pub fn generics(&self) -> &BuiltinGenerics {
        &self.generics
    }

    pub(crate) fn keys(&self) -> &Keys {
        &self.keys
    }

    /// Interns a symbol name.
    pub fn intern(&self, name: &str) -> Symbol {
        self.symbols.borrow_mut().intern(name)
    }

    /// Returns the symbol `name` as a value.
    pub fn symbol(&self, name: &str) -> Value {
        Value::Symbol(self.intern(name))
    }

    /// Interns a keyword. A leading colon is optional.
    pub fn intern_keyword(&self, name: &str) -> Keyword {
        self.keywords.borrow_mut().intern(name)
    }

    /// Returns the keyword `name` as a value.
    pub fn keyword(&self, name: &str) -> Value {
        Value::Keyword(self.intern_keyword(name))
    }

    /// Returns the class of any value.
    #[must_use]
    pub fn class_of(&self, value: &Value) -> Class {
        let c = &self.classes;
        match value {
            Value::Unbound | Value::Undefined => c.unknown.clone(),
            Value::Nil => c.null.clone(),
            Value::Bool(_) => c.boolean.clone(),
            Value::Char(_) => c.char.clone(),
            Value::Int(_) => c.integer.clone(),
            Value::Str(_) => c.string.clone(),
            Value::Symbol(_) => c.symbol.clone(),
            Value::Keyword(_) => c.keyword.clone(),
            Value::Pair(_) => c.pair.clone(),
            Value::Procedure(_) => c.procedure.clone(),
            Value::Class(class) => class.metaclass().unwrap_or_else(|| c.class.clone()),
            Value::Generic(g) => g.class().clone(),
            Value::Method(m) => m.class().clone(),
            Value::NextMethod(_) => c.next_method.clone(),
            Value::Accessor(_) => c.slot_accessor.clone(),
            Value::Instance(i) => i.class().clone(),
        }
    }

    /// Checks whether `sub` is `sup` or one of its subclasses.
    #[must_use]
    pub fn subtype_of(&self, sub: &Class, sup: &Class) -> bool {
        sub.is_subclass_of(sup)
    }

    /// Checks whether `value` is an instance of `class` or a subclass.
    #[must_use]
    pub fn is_a(&self, value: &Value, class: &Class) -> bool {
        self.class_of(value).is_subclass_of(class)
    }

    /// Looks up a class by name.
    #[must_use]
    pub fn find_class(&self, name: &str) -> Option<Class> {
        let sym = self.symbols.borrow().get(name)?;
        self.class_registry.borrow().get(&sym).cloned()
    }

    /// Registers `class` under `name`, replacing any earlier binding.
    pub fn register_class(&self, name: Symbol, class: Class) {
        self.class_registry.borrow_mut().insert(name, class);
    }

    /// Looks up a generic function by name.
    #[must_use]
    pub fn find_generic(&self, name: &str) -> Option<Generic> {
        let sym = self.symbols.borrow().get(name)?;
        self.generic_registry.borrow().get(&sym).cloned()
    }

    /// Registers `generic` under `name`, replacing any earlier binding.
    pub fn register_generic(&self, name: Symbol, generic: Generic) {
        self.generic_registry.borrow_mut().insert(name, generic);
    }

    pub(crate) fn registered_classes(&self) -> Vec<Class> {
        self.class_registry.borrow().values().cloned().collect()
    }

    pub(crate) fn registered_generics(&self) -> Vec<Generic> {
        self.generic_registry.borrow().values().cloned().collect()
    }

    /// Defines a class whose metaclass is `<class>`.
    ///
    /// Empty `supers` means `(<object>)`. Slot specs are lists
    /// `(name :option value ...)`, usually built with [`SlotSpec`].
    ///
    /// # Errors
    ///
    /// Any error of the class-creation protocol, e.g.
    /// [`Error::InconsistentPrecedence`] or [`Error::FinalClassInherited`].
    pub fn define_class(&self, name: &str, supers: &[Class], slots: &[Value]) -> Result<Class> {
        let metaclass = self.classes.class.clone();
        self.make_class(&metaclass, name, supers, slots)
    }

    /// Defines a class through `make` on `metaclass`.
    ///
    /// # Errors
    ///
    /// See [`Runtime::define_class`].
    pub fn make_class(
        &self,
        metaclass: &Class,
        name: &str,
        supers: &[Class],
        slots: &[Value],
    ) -> Result<Class> {
        let initargs = [
            self.keyword("name"),
            self.symbol(name),
            self.keyword("supers"),
            Value::list(supers.iter().cloned().map(Value::Class)),
            self.keyword("slots"),
            Value::list(slots.iter().cloned()),
        ];
        let made = self.make(metaclass, &initargs)?;
        made.as_class()
            .cloned()
            .ok_or_else(|| Error::wrong_type("class", &made))
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}
