//! Class categories and per-class behavior hooks.
//!
//! Every class is tagged with a [`ClassCategory`] when it is created. The
//! category decides whether the class may be inherited from and whether it
//! can allocate instances:
//!
//! | category      | allocator          | subclassable |
//! |---------------|--------------------|--------------|
//! | `Native`      | none (one exception, `<slot-accessor>`) | no (final) |
//! | `Base`        | its own            | yes          |
//! | `Abstract`    | none               | yes          |
//! | `UserDefined` | resolved from CPL  | yes          |
//!
//! # Allocator resolution
//!
//! A class does not choose its allocator; it inherits exactly one from its
//! class precedence list when the CPL is set. [`resolve_base`] scans the CPL
//! (without the class itself) and enforces:
//!
//! - no `Native` class may appear,
//! - `<object>` (the object allocator) must appear,
//! - at most one other, distinct allocator may appear.
//!
//! The resolved allocator also fixes the instance-slot offset, which is the
//! number of native slots the contributing base class carries ahead of the
//! boxed slots.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::object::OBJECT_ALLOCATOR;
use crate::runtime::{Class, Runtime, Value};

/// Category of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassCategory {
    /// Builtin representation class. Final.
    Native,
    /// Builtin class with its own allocator and native slots.
    Base,
    /// Builtin class used only as a specializer.
    Abstract,
    /// Created through the class-creation protocol.
    UserDefined,
}

impl ClassCategory {
    /// Native classes may not appear in a subclass's CPL.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, ClassCategory::Native)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ClassCategory::Native => "native",
            ClassCategory::Base => "base",
            ClassCategory::Abstract => "abstract",
            ClassCategory::UserDefined => "user-defined",
        }
    }
}

/// Signature of an allocation strategy: `(runtime, class, initargs)`.
pub type AllocateFn = fn(&Runtime, &Class, &Value) -> Result<Value>;

/// An allocation strategy. Two allocators are the same strategy when their
/// ids match.
#[derive(Clone, Copy)]
pub struct Allocator {
    id: &'static str,
    allocate: AllocateFn,
}

impl Allocator {
    /// Creates an allocator.
    #[must_use]
    pub const fn new(id: &'static str, allocate: AllocateFn) -> Self {
        Allocator { id, allocate }
    }

    #[must_use]
    pub const fn id(&self) -> &'static str {
        self.id
    }

    /// Runs the strategy.
    ///
    /// # Errors
    ///
    /// Propagates whatever the strategy returns.
    pub fn allocate(&self, rt: &Runtime, class: &Class, initargs: &Value) -> Result<Value> {
        (self.allocate)(rt, class, initargs)
    }
}

impl PartialEq for Allocator {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Allocator {}

impl fmt::Debug for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Allocator({})", self.id)
    }
}

/// Print hook: writes the external representation of a value into a sink.
pub type PrintHook = Rc<dyn Fn(&Runtime, &Value, &mut String) -> Result<()>>;

/// Compare hook: orders two instances of the same class. `None` means
/// unordered.
pub type CompareHook = Rc<dyn Fn(&Runtime, &Value, &Value) -> Result<Option<Ordering>>>;

/// Serialize hook: writes a readable form of a value into a sink.
pub type SerializeHook = Rc<dyn Fn(&Runtime, &Value, &mut String) -> Result<()>>;

/// Per-class behavior. The allocator is resolved from the CPL; the other
/// hooks are looked up along the CPL at use.
#[derive(Clone, Default)]
pub struct ClassHooks {
    pub allocate: Option<Allocator>,
    pub print: Option<PrintHook>,
    pub compare: Option<CompareHook>,
    pub serialize: Option<SerializeHook>,
}

impl fmt::Debug for ClassHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassHooks")
            .field("allocate", &self.allocate)
            .field("print", &self.print.is_some())
            .field("compare", &self.compare.is_some())
            .field("serialize", &self.serialize.is_some())
            .finish()
    }
}

/// Outcome of allocator resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BaseResolution {
    pub allocator: Allocator,
    pub instance_slot_offset: usize,
}

/// Resolves the allocator for a class whose CPL (minus the class) is `cpa`.
///
/// `cpl` is only used for error reporting.
pub(crate) fn resolve_base(cpl: &Value, cpa: &[Class]) -> Result<BaseResolution> {
    let mut candidate: Option<BaseResolution> = None;
    let mut object_inherited = false;

    for ancestor in cpa {
        if ancestor.category().is_final() {
            return Err(Error::FinalClassInherited {
                class: ancestor.name_string(),
            });
        }
        let Some(allocator) = ancestor.allocator() else {
            continue;
        };
        if allocator == OBJECT_ALLOCATOR {
            object_inherited = true;
            continue;
        }
        match candidate {
            Some(found) if found.allocator != allocator => {
                return Err(Error::MultipleBaseClasses {
                    cpl: format!("{cpl:?}"),
                });
            }
            Some(_) => {}
            None => {
                candidate = Some(BaseResolution {
                    allocator,
                    instance_slot_offset: ancestor.instance_slot_offset(),
                });
            }
        }
    }

    if !object_inherited {
        return Err(Error::NoBaseClass {
            cpl: format!("{cpl:?}"),
        });
    }
    Ok(candidate.unwrap_or(BaseResolution {
        allocator: OBJECT_ALLOCATOR,
        instance_slot_offset: 0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_alloc(_: &Runtime, _: &Class, _: &Value) -> Result<Value> {
        Ok(Value::Undefined)
    }

    #[test]
    fn test_final_categories() {
        assert!(ClassCategory::Native.is_final());
        assert!(!ClassCategory::Base.is_final());
        assert!(!ClassCategory::Abstract.is_final());
        assert!(!ClassCategory::UserDefined.is_final());
        assert_eq!(ClassCategory::UserDefined.as_str(), "user-defined");
    }

    #[test]
    fn test_allocator_identity_is_by_id() {
        let a = Allocator::new("a", no_alloc);
        let a2 = Allocator::new("a", no_alloc);
        let b = Allocator::new("b", no_alloc);
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(format!("{a:?}"), "Allocator(a)");
    }

    #[test]
    fn test_resolve_plain_object_subclass() {
        let rt = Runtime::new();
        let b = rt.builtins();
        let cpa = vec![b.object.clone(), b.top.clone()];
        let resolved = resolve_base(&Value::Nil, &cpa).unwrap();
        assert_eq!(resolved.allocator, OBJECT_ALLOCATOR);
        assert_eq!(resolved.instance_slot_offset, 0);
    }

    #[test]
    fn test_resolve_metaclass_takes_class_allocator() {
        let rt = Runtime::new();
        let b = rt.builtins();
        let cpa = vec![b.class.clone(), b.object.clone(), b.top.clone()];
        let resolved = resolve_base(&Value::Nil, &cpa).unwrap();
        assert_eq!(Some(resolved.allocator), b.class.allocator());
        assert_eq!(resolved.instance_slot_offset, b.class.instance_slot_offset());
    }

    #[test]
    fn test_resolve_rejects_two_bases() {
        let rt = Runtime::new();
        let b = rt.builtins();
        let cpa = vec![
            b.class.clone(),
            b.generic.clone(),
            b.object.clone(),
            b.top.clone(),
        ];
        assert!(matches!(
            resolve_base(&Value::Nil, &cpa),
            Err(Error::MultipleBaseClasses { .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_missing_object() {
        let rt = Runtime::new();
        let b = rt.builtins();
        let cpa = vec![b.sequence.clone(), b.top.clone()];
        assert!(matches!(
            resolve_base(&Value::Nil, &cpa),
            Err(Error::NoBaseClass { .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_final_class() {
        let rt = Runtime::new();
        let b = rt.builtins();
        let cpa = vec![b.integer.clone(), b.object.clone(), b.top.clone()];
        assert_eq!(
            resolve_base(&Value::Nil, &cpa),
            Err(Error::FinalClassInherited {
                class: "<integer>".into()
            })
        );
    }
}
