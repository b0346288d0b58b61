//! Error types for the `OxiCLOS` runtime.
//!
//! Every recoverable failure of the object system is one variant of
//! [`Error`]. Offending values are carried in their printed form so errors
//! stay `Clone + Eq` and can outlive the runtime that produced them.
//!
//! The only unrecoverable fault, a method-specificity contradiction during
//! dispatch, is a panic. The same contradiction reached through the
//! `method-more-specific?` generic is [`Error::IncomparableMethods`].

use std::fmt;

/// Errors that can occur in the `OxiCLOS` runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A direct-supers list contained something other than a class.
    NonClassInSupers {
        /// The offending element.
        value: String,
    },

    /// A class precedence list was not a proper list of classes starting
    /// with the class itself and ending with `<top>`.
    InvalidCpl {
        /// The class whose CPL was being set.
        class: String,
        /// The rejected list.
        cpl: String,
    },

    /// The superclasses impose contradictory orderings.
    InconsistentPrecedence {
        /// The class being finalized.
        class: String,
        /// Its direct supers.
        supers: String,
    },

    /// More than one base class (other than `<object>`) in a CPL.
    MultipleBaseClasses {
        /// The rejected CPL.
        cpl: String,
    },

    /// A CPL that does not include `<object>`.
    NoBaseClass {
        /// The rejected CPL.
        cpl: String,
    },

    /// A native (final) class appeared among the ancestors.
    FinalClassInherited {
        /// The final class.
        class: String,
    },

    /// A slot spec was not a `(name . options)` pair or had bad options.
    BadSlotSpec {
        /// The rejected spec.
        spec: String,
    },

    /// An accessor list element was not `(name . <slot-accessor>)`.
    BadAccessorList {
        /// The rejected element.
        entry: String,
    },

    /// Dispatch found no applicable method and the fallback was the default.
    NoApplicableMethod {
        /// The generic function.
        generic: String,
        /// The argument list.
        args: String,
    },

    /// The method is already bound to a different generic function.
    MethodAlreadyBound {
        /// The method.
        method: String,
        /// The generic it belongs to.
        generic: String,
    },

    /// The method already appears in the target generic's method list.
    MethodAlreadyAdded {
        /// The method.
        method: String,
        /// The target generic.
        generic: String,
    },

    /// Method construction arguments were inconsistent.
    InvalidMethod {
        /// What was wrong.
        reason: String,
    },

    /// An attempt to apply a value that is not applicable.
    NotApplicable {
        /// The value.
        value: String,
    },

    /// A procedure was called with the wrong number of arguments.
    ArityMismatch {
        /// The procedure name.
        name: String,
        /// Arguments required.
        required: usize,
        /// Whether extra arguments are allowed.
        rest: bool,
        /// Arguments supplied.
        given: usize,
    },

    /// The slot does not exist on the object's class.
    SlotMissing {
        /// The class.
        class: String,
        /// The slot name.
        slot: String,
    },

    /// The slot has no value.
    SlotUnbound {
        /// The class.
        class: String,
        /// The slot name.
        slot: String,
    },

    /// The slot cannot be written.
    SlotReadOnly {
        /// The class.
        class: String,
        /// The slot name.
        slot: String,
    },

    /// An instance slot number outside the object's slot vector.
    SlotIndexOutOfBounds {
        /// The object.
        object: String,
        /// The slot number.
        number: usize,
    },

    /// An instance-slot accessor was used on an object with no slot vector.
    NoInstanceSlots {
        /// The object.
        object: String,
    },

    /// The accessor has no storage strategy yet.
    SlotStorageUnresolved {
        /// The slot name.
        slot: String,
    },

    /// The class has no allocation strategy.
    NotInstantiable {
        /// The class.
        class: String,
    },

    /// A keyword-argument list had an odd number of elements.
    OddKeywordList {
        /// The rejected list.
        list: String,
    },

    /// A required keyword argument was absent.
    MissingKeyword {
        /// The keyword.
        keyword: String,
    },

    /// A value of the wrong type was supplied.
    WrongType {
        /// What was expected.
        expected: &'static str,
        /// What was supplied.
        got: String,
    },

    /// Two methods cannot be ordered for the given argument classes.
    IncomparableMethods {
        /// The first method.
        first: String,
        /// The second method.
        second: String,
        /// The argument classes.
        classes: String,
    },

    /// A reflective write to a builtin class.
    ImmutableClass {
        /// The class.
        class: String,
        /// The slot being written.
        slot: String,
    },

    /// An error raised by user code.
    Raised {
        /// The message.
        message: String,
    },
}

impl Error {
    /// Builds an [`Error::WrongType`] from a value's printed form.
    pub(crate) fn wrong_type(expected: &'static str, got: impl fmt::Debug) -> Self {
        Error::WrongType {
            expected,
            got: format!("{got:?}"),
        }
    }

    /// Creates an error carrying a user-supplied message.
    pub fn raise(message: impl Into<String>) -> Self {
        Error::Raised {
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NonClassInSupers { value } => {
                write!(f, "non-class object found in direct superclass list: {value}")
            }
            Error::InvalidCpl { class, cpl } => write!(
                f,
                "class precedence list of {class} must be a proper list of classes, \
                 beginning with the class itself and ending with <top>: {cpl}"
            ),
            Error::InconsistentPrecedence { class, supers } => write!(
                f,
                "inconsistent precedence graph for {class}: discrepancy found in \
                 class precedence lists of the superclasses {supers}"
            ),
            Error::MultipleBaseClasses { cpl } => write!(
                f,
                "class precedence list has more than one base class (except <object>): {cpl}"
            ),
            Error::NoBaseClass { cpl } => {
                write!(f, "class precedence list doesn't have a base class: {cpl}")
            }
            Error::FinalClassInherited { class } => {
                write!(f, "you can't inherit a final class {class}")
            }
            Error::BadSlotSpec { spec } => write!(f, "bad slot spec: {spec}"),
            Error::BadAccessorList { entry } => write!(
                f,
                "slot accessor list must be an assoc-list of slot name and \
                 slot accessor object, but found: {entry}"
            ),
            Error::NoApplicableMethod { generic, args } => {
                write!(f, "no applicable method for {generic} with arguments {args}")
            }
            Error::MethodAlreadyBound { method, generic } => {
                write!(f, "method {method} already added to a generic function {generic}")
            }
            Error::MethodAlreadyAdded { method, generic } => write!(
                f,
                "method {method} already appears in the method list of generic {generic}"
            ),
            Error::InvalidMethod { reason } => write!(f, "invalid method: {reason}"),
            Error::NotApplicable { value } => write!(f, "invalid application: {value}"),
            Error::ArityMismatch {
                name,
                required,
                rest,
                given,
            } => {
                let at_least = if *rest { "at least " } else { "" };
                write!(
                    f,
                    "wrong number of arguments for {name}: requires {at_least}{required}, \
                     but got {given}"
                )
            }
            Error::SlotMissing { class, slot } => {
                write!(f, "object of class {class} doesn't have such slot: {slot}")
            }
            Error::SlotUnbound { class, slot } => {
                write!(f, "slot {slot} of object of class {class} is unbound")
            }
            Error::SlotReadOnly { class, slot } => {
                write!(f, "slot {slot} of class {class} is read-only")
            }
            Error::SlotIndexOutOfBounds { object, number } => {
                write!(f, "instance slot index {number} out of bounds for {object}")
            }
            Error::NoInstanceSlots { object } => {
                write!(f, "instance slot accessor called on {object}, which has no instance slots")
            }
            Error::SlotStorageUnresolved { slot } => write!(
                f,
                "don't know how to access slot {slot}: accessor has no storage strategy"
            ),
            Error::NotInstantiable { class } => {
                write!(f, "cannot instantiate {class}: class has no allocator")
            }
            Error::OddKeywordList { list } => write!(f, "incomplete key list: {list}"),
            Error::MissingKeyword { keyword } => {
                write!(f, "value for key {keyword} is not provided")
            }
            Error::WrongType { expected, got } => {
                write!(f, "{expected} required, but got {got}")
            }
            Error::IncomparableMethods {
                first,
                second,
                classes,
            } => write!(
                f,
                "can't order methods {first} and {second}: not both applicable to {classes}"
            ),
            Error::ImmutableClass { class, slot } => {
                write!(f, "builtin class {class} is immutable: can't set slot {slot}")
            }
            Error::Raised { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for `OxiCLOS` runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!(
                "{}",
                Error::SlotReadOnly {
                    class: "<point>".into(),
                    slot: "x".into()
                }
            ),
            "slot x of class <point> is read-only"
        );
        assert_eq!(
            format!(
                "{}",
                Error::ArityMismatch {
                    name: "area".into(),
                    required: 1,
                    rest: true,
                    given: 0
                }
            ),
            "wrong number of arguments for area: requires at least 1, but got 0"
        );
        assert_eq!(
            format!("{}", Error::OddKeywordList { list: "(:a)".into() }),
            "incomplete key list: (:a)"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(Error::raise("boom"), Error::raise("boom"));
        assert_ne!(
            Error::NoBaseClass { cpl: "(<a> <top>)".into() },
            Error::NoBaseClass { cpl: "(<b> <top>)".into() }
        );
    }

    #[test]
    fn test_wrong_type_uses_debug_form() {
        let err = Error::wrong_type("class", "x");
        assert_eq!(format!("{err}"), "class required, but got \"x\"");
    }
}
