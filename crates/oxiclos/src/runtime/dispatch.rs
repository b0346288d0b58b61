//! Generic function dispatch.
//!
//! Applying a generic:
//!
//! 1. collect the methods whose arity fits and whose specializers are
//!    supertypes of the argument classes
//! 2. sort them most specific first (stable insertion sort)
//! 3. run the first, handing it a [`NextMethod`] over the rest
//!
//! With no applicable method the generic's fallback runs instead.

use std::rc::Rc;

use smallvec::SmallVec;

use oxiclos_log::trace;

use crate::error::{Error, Result};
use crate::runtime::{Class, Generic, Method, NextMethod, Runtime, Value};

/// Argument classes of one call.
pub type ArgClasses = SmallVec<[Class; 4]>;

/// Applicable methods of one call.
pub type MethodList = SmallVec<[Method; 4]>;

fn is_applicable_to(method: &Method, classes: &[Class]) -> bool {
    let required = method.required();
    let nargs = classes.len();
    if nargs < required || (!method.optional() && nargs != required) {
        return false;
    }
    method.with_specializers(|specs| {
        specs.len() == required
            && specs
                .iter()
                .zip(classes)
                .all(|(spec, class)| class.is_subclass_of(spec))
    })
}

/// Returns the methods of `generic` applicable to arguments of `classes`,
/// in method-list order.
#[must_use]
pub fn compute_applicable_methods(generic: &Generic, classes: &[Class]) -> MethodList {
    generic
        .methods()
        .into_iter()
        .filter(|m| is_applicable_to(m, classes))
        .collect()
}

/// Checks whether `x` is more specific than `y` for arguments of `classes`.
///
/// At the first position where the specializers differ, the one equal to the
/// argument's class wins, otherwise the one appearing first in that class's
/// CPL. If all positions agree, a method without optional arguments beats
/// one with them, and then more required arguments beat fewer.
///
/// # Panics
///
/// Panics if at a differing position neither specializer is in the
/// argument class's CPL. Both methods were found applicable, so this means
/// the class hierarchy changed under the dispatcher.
#[must_use]
pub fn method_more_specific(x: &Method, y: &Method, classes: &[Class]) -> bool {
    match try_method_more_specific(x, y, classes) {
        Some(more_specific) => more_specific,
        None => panic!("internal error: couldn't determine more specific method"),
    }
}

/// Non-panicking [`method_more_specific`]: `None` when a differing
/// specializer pair cannot be ordered by the argument's CPL.
#[must_use]
pub fn try_method_more_specific(x: &Method, y: &Method, classes: &[Class]) -> Option<bool> {
    let xs = x.specializers();
    let ys = y.specializers();
    for (i, (xc, yc)) in xs.iter().zip(&ys).enumerate() {
        if xc == yc {
            continue;
        }
        let Some(arg_class) = classes.get(i) else {
            return Some(false);
        };
        if xc == arg_class {
            return Some(true);
        }
        if yc == arg_class {
            return Some(false);
        }
        return arg_class.with_cpa(|cpa| {
            cpa.iter().find_map(|c| {
                if c == xc {
                    Some(true)
                } else if c == yc {
                    Some(false)
                } else {
                    None
                }
            })
        });
    }

    if x.optional() != y.optional() {
        return Some(!x.optional());
    }
    Some(x.required() > y.required())
}

/// Body of the `method-more-specific?` builtin method. Both methods must be
/// applicable to `classes`.
pub(crate) fn checked_method_more_specific(
    x: &Method,
    y: &Method,
    classes: &[Class],
) -> Result<bool> {
    let incomparable = || Error::IncomparableMethods {
        first: format!("{x:?}"),
        second: format!("{y:?}"),
        classes: format!("{:?}", Value::list(classes.iter().cloned().map(Value::Class))),
    };
    if !is_applicable_to(x, classes) || !is_applicable_to(y, classes) {
        return Err(incomparable());
    }
    try_method_more_specific(x, y, classes).ok_or_else(incomparable)
}

/// Sorts `methods` most specific first. Methods neither more nor less
/// specific than each other keep their relative order.
pub fn sort_methods(methods: &mut [Method], classes: &[Class]) {
    for i in 1..methods.len() {
        let mut j = i;
        while j > 0 && method_more_specific(&methods[j], &methods[j - 1], classes) {
            methods.swap(j, j - 1);
            j -= 1;
        }
    }
}

impl Runtime {
    /// Returns the classes of `args`.
    #[must_use]
    pub fn arg_classes(&self, args: &[Value]) -> ArgClasses {
        args.iter().map(|arg| self.class_of(arg)).collect()
    }

    /// Applies a generic function.
    ///
    /// Instances of `<generic>` subclasses go through the `apply-generic`
    /// generic as `(generic args)`, so their metaclass can take over
    /// dispatch.
    ///
    /// # Errors
    ///
    /// Whatever the selected method returns, or the fallback's result when
    /// no method applies ([`Error::NoApplicableMethod`] by default).
    ///
    /// # Example
    ///
    /// ```
    /// use oxiclos::{Runtime, Value};
    ///
    /// let rt = Runtime::new();
    /// let describe = rt.define_generic("describe");
    /// let integer = rt.builtins().integer.clone();
    /// let number = rt.builtins().number.clone();
    ///
    /// rt.define_method(&describe, &[number], false, |_, _, _| Ok(Value::string("number")))
    ///     .unwrap();
    /// rt.define_method(&describe, &[integer], false, |rt, _, next| {
    ///     let outer = next.call(rt)?;
    ///     Ok(Value::list([Value::string("integer"), outer]))
    /// })
    /// .unwrap();
    ///
    /// let result = rt.apply_generic(&describe, &[Value::Int(1)]).unwrap();
    /// assert_eq!(format!("{result:?}"), r#"("integer" "number")"#);
    /// ```
    pub fn apply_generic(&self, generic: &Generic, args: &[Value]) -> Result<Value> {
        if *generic.class() != self.builtins().generic {
            let hook = &self.generics().apply_generic;
            return self.dispatch_generic(
                hook,
                &[Value::Generic(generic.clone()), Value::list(args.iter().cloned())],
            );
        }
        self.dispatch_generic(generic, args)
    }

    /// Standard dispatch, bypassing the `apply-generic` hook. This is the
    /// builtin `apply-generic` method.
    ///
    /// # Errors
    ///
    /// See [`Runtime::apply_generic`].
    pub fn dispatch_generic(&self, generic: &Generic, args: &[Value]) -> Result<Value> {
        let classes = self.arg_classes(args);
        let mut applicable = compute_applicable_methods(generic, &classes);
        if applicable.is_empty() {
            trace!("{}: no applicable method, calling fallback", generic.name_string());
            return generic.call_fallback(self, args);
        }
        sort_methods(&mut applicable, &classes);
        trace!(
            "{}: {} applicable method(s), first {:?}",
            generic.name_string(),
            applicable.len(),
            applicable[0]
        );

        let methods: Rc<[Method]> = applicable.into_iter().collect();
        NextMethod::new(generic.clone(), methods, 0, Rc::from(args)).call(self)
    }

    /// Applies any applicable value: a procedure, a generic or a next-method
    /// object. A next-method called without arguments reuses the arguments
    /// of the original call.
    ///
    /// # Errors
    ///
    /// [`Error::NotApplicable`] for anything else, and whatever the callee
    /// returns.
    pub fn apply(&self, callee: &Value, args: &[Value]) -> Result<Value> {
        match callee {
            Value::Procedure(p) => p.call(self, args),
            Value::Generic(g) => self.apply_generic(g, args),
            Value::NextMethod(next) if args.is_empty() => next.call(self),
            Value::NextMethod(next) => next.call_with(self, args),
            other => Err(Error::NotApplicable {
                value: format!("{other:?}"),
            }),
        }
    }

    /// Returns true for values [`Runtime::apply`] accepts.
    #[must_use]
    pub fn is_applicable(value: &Value) -> bool {
        matches!(
            value,
            Value::Procedure(_) | Value::Generic(_) | Value::NextMethod(_)
        )
    }

    /// Creates a generic function of class `<generic>` and registers it
    /// under `name`.
    pub fn define_generic(&self, name: &str) -> Generic {
        let sym = self.intern(name);
        let generic = Generic::new(self.builtins().generic.clone(), Value::Symbol(sym));
        self.register_generic(sym, generic.clone());
        generic
    }

    /// Creates a method with a native body and adds it to `generic` through
    /// the `add-method!` generic.
    ///
    /// # Errors
    ///
    /// Errors from adding the method; see [`Generic::add_method`].
    pub fn define_method<F>(
        &self,
        generic: &Generic,
        specializers: &[Class],
        optional: bool,
        body: F,
    ) -> Result<Method>
    where
        F: Fn(&Runtime, &[Value], &NextMethod) -> Result<Value> + 'static,
    {
        let method = Method::native(
            self.builtins().method.clone(),
            specializers.to_vec(),
            optional,
            body,
        );
        self.add_method(generic, &method)?;
        Ok(method)
    }

    /// Adds `method` to `generic` through the `add-method!` generic.
    ///
    /// # Errors
    ///
    /// See [`Generic::add_method`].
    pub fn add_method(&self, generic: &Generic, method: &Method) -> Result<()> {
        self.apply_generic(
            &self.generics().add_method,
            &[Value::Generic(generic.clone()), Value::Method(method.clone())],
        )
        .map(|_| ())
    }
}
