//! Runtime introspection APIs.
//!
//! This module provides read-only queries over a runtime's state:
//!
//! - **Class enumeration** - list registered classes, find by name
//! - **Hierarchy queries** - precedence lists, subclass trees
//! - **Method enumeration** - generics, methods specialized on a class
//!
//! # Example
//!
//! ```rust
//! use oxiclos::Runtime;
//! use oxiclos::runtime::introspection::*;
//!
//! let rt = Runtime::new();
//! let shape = rt.define_class("<shape>", &[], &[]).unwrap();
//! rt.define_class("<circle>", &[shape.clone()], &[]).unwrap();
//!
//! let subs: Vec<String> = all_subclasses(&shape).iter().map(|c| c.name_string()).collect();
//! assert_eq!(subs, ["<circle>"]);
//! assert!(class_from_name(&rt, "<circle>").is_some());
//! ```

use fxhash::FxHashSet;

use crate::runtime::{Class, Generic, Method, Runtime};

// ============================================================================
// Class Enumeration
// ============================================================================

/// Enumerate all registered classes.
///
/// # Returns
///
/// Every class registered by name, builtins included, sorted by name.
///
/// # Example
///
/// ```rust
/// use oxiclos::Runtime;
/// use oxiclos::runtime::introspection::all_classes;
///
/// let rt = Runtime::new();
/// let names: Vec<String> = all_classes(&rt).iter().map(|c| c.name_string()).collect();
/// assert!(names.contains(&"<object>".to_string()));
/// ```
#[must_use]
pub fn all_classes(rt: &Runtime) -> Vec<Class> {
    let mut classes = rt.registered_classes();
    classes.sort_by_key(Class::name_string);
    classes
}

/// Get a class by name.
///
/// # Arguments
///
/// * `rt` - The runtime to search
/// * `name` - The class name, e.g. `"<point>"`
///
/// # Returns
///
/// `Some(Class)` if a class is registered under `name`, `None` otherwise.
#[must_use]
pub fn class_from_name(rt: &Runtime, name: &str) -> Option<Class> {
    rt.find_class(name)
}

// ============================================================================
// Hierarchy
// ============================================================================

/// Get the class precedence list of a class.
///
/// Starts with the class itself and ends with `<top>`.
#[must_use]
pub fn class_hierarchy(class: &Class) -> Vec<Class> {
    class.cpl()
}

/// Check if `child` is `parent` or one of its subclasses.
///
/// # Example
///
/// ```rust
/// use oxiclos::Runtime;
/// use oxiclos::runtime::introspection::is_subclass;
///
/// let rt = Runtime::new();
/// let b = rt.builtins();
/// assert!(is_subclass(&b.pair, &b.sequence));
/// assert!(!is_subclass(&b.sequence, &b.pair));
/// ```
#[must_use]
pub fn is_subclass(child: &Class, parent: &Class) -> bool {
    child.is_subclass_of(parent)
}

/// Get the live direct subclasses of a class.
#[must_use]
pub fn direct_subclasses(class: &Class) -> Vec<Class> {
    class.direct_subclasses()
}

/// Get every transitive subclass of a class, breadth first, each once.
#[must_use]
pub fn all_subclasses(class: &Class) -> Vec<Class> {
    let mut seen = FxHashSet::default();
    let mut result = Vec::new();
    let mut frontier = class.direct_subclasses();

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for sub in frontier {
            if seen.insert(sub.clone()) {
                next.extend(sub.direct_subclasses());
                result.push(sub);
            }
        }
        frontier = next;
    }
    result
}

// ============================================================================
// Generics and Methods
// ============================================================================

/// Enumerate all registered generic functions, sorted by name.
#[must_use]
pub fn all_generics(rt: &Runtime) -> Vec<Generic> {
    let mut generics = rt.registered_generics();
    generics.sort_by_key(Generic::name_string);
    generics
}

/// Find the methods of registered generics that specialize any argument
/// on `class`.
///
/// # Arguments
///
/// * `rt` - The runtime whose generics are searched
/// * `class` - The specializer to look for (exact match, not subclasses)
///
/// # Returns
///
/// Matching methods, grouped by generic in name order.
#[must_use]
pub fn methods_specialized_on(rt: &Runtime, class: &Class) -> Vec<Method> {
    all_generics(rt)
        .iter()
        .flat_map(Generic::methods)
        .filter(|m| m.with_specializers(|specs| specs.contains(class)))
        .collect()
}
