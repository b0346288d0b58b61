//! Generic functions, methods and next-method continuations.
//!
//! A [`Generic`] owns an ordered list of [`Method`]s, newest first. A method
//! is bound to at most one generic, once; the back reference is weak so a
//! generic and its methods never keep each other alive, and the owner's name
//! is kept so the binding outlives the owner.
//!
//! Dispatch itself lives in `runtime::dispatch`. This module only holds the
//! metaobjects and the rules for adding methods.

use std::cell::{Cell, RefCell};
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use oxiclos_log::debug;

use crate::error::{Error, Result};
use crate::runtime::{Class, Procedure, Runtime, Value};

/// Native fallback: called with the generic and the original arguments.
pub type NativeFallback = fn(&Runtime, &Generic, &[Value]) -> Result<Value>;

/// What a generic does when no method applies.
#[derive(Clone)]
pub enum Fallback {
    Native(NativeFallback),
    Procedure(Procedure),
}

fn no_applicable_method(_: &Runtime, generic: &Generic, args: &[Value]) -> Result<Value> {
    Err(Error::NoApplicableMethod {
        generic: generic.name_string(),
        args: format!("{:?}", Value::list(args.iter().cloned())),
    })
}

/// A generic function.
#[derive(Clone)]
pub struct Generic {
    inner: Rc<GenericInner>,
}

pub(crate) struct GenericInner {
    class: Class,
    name: RefCell<Value>,
    methods: RefCell<Vec<Method>>,
    fallback: RefCell<Fallback>,
    islots: RefCell<Vec<Value>>,
}

impl Generic {
    /// Creates a generic of class `class` with no methods.
    pub(crate) fn new(class: Class, name: Value) -> Generic {
        let islots = vec![Value::Unbound; class.num_instance_slots()];
        Generic {
            inner: Rc::new(GenericInner {
                class,
                name: RefCell::new(name),
                methods: RefCell::new(Vec::new()),
                fallback: RefCell::new(Fallback::Native(no_applicable_method)),
                islots: RefCell::new(islots),
            }),
        }
    }

    #[must_use]
    pub fn class(&self) -> &Class {
        &self.inner.class
    }

    #[must_use]
    pub fn name(&self) -> Value {
        self.inner.name.borrow().clone()
    }

    #[must_use]
    pub fn name_string(&self) -> String {
        match &*self.inner.name.borrow() {
            Value::Symbol(sym) => sym.as_str().to_owned(),
            other => format!("{other:?}"),
        }
    }

    pub fn set_name(&self, name: Value) {
        *self.inner.name.borrow_mut() = name;
    }

    /// Returns the method list, newest first.
    #[must_use]
    pub fn methods(&self) -> Vec<Method> {
        self.inner.methods.borrow().clone()
    }

    #[must_use]
    pub fn method_count(&self) -> usize {
        self.inner.methods.borrow().len()
    }

    /// Replaces the fallback.
    pub fn set_fallback(&self, fallback: Fallback) {
        *self.inner.fallback.borrow_mut() = fallback;
    }

    /// Runs the fallback with the original arguments.
    ///
    /// # Errors
    ///
    /// The default fallback returns [`Error::NoApplicableMethod`].
    pub fn call_fallback(&self, rt: &Runtime, args: &[Value]) -> Result<Value> {
        let fallback = self.inner.fallback.borrow().clone();
        match fallback {
            Fallback::Native(f) => f(rt, self, args),
            Fallback::Procedure(p) => p.call(rt, args),
        }
    }

    /// Adds `method` to this generic.
    ///
    /// A method with the same required count, optional flag and
    /// specializers replaces the existing one in place; any other method is
    /// prepended.
    ///
    /// # Errors
    ///
    /// - [`Error::MethodAlreadyBound`] if the method belongs to another
    ///   generic
    /// - [`Error::MethodAlreadyAdded`] if it is already in this generic
    pub fn add_method(&self, method: &Method) -> Result<()> {
        let bound_elsewhere = match method.generic() {
            Some(owner) => (owner != *self).then(|| owner.name_string()),
            None => method.owner_name(),
        };
        if let Some(owner) = bound_elsewhere {
            return Err(Error::MethodAlreadyBound {
                method: format!("{method:?}"),
                generic: owner,
            });
        }
        if self.inner.methods.borrow().contains(method) {
            return Err(Error::MethodAlreadyAdded {
                method: format!("{method:?}"),
                generic: self.name_string(),
            });
        }

        method.bind(self);
        let mut methods = self.inner.methods.borrow_mut();
        match methods.iter_mut().find(|m| m.same_signature(method)) {
            Some(existing) => {
                debug!("replacing method {:?} of {}", method, self.name_string());
                *existing = method.clone();
            }
            None => methods.insert(0, method.clone()),
        }
        Ok(())
    }

    /// Adds a method without any checks. Bootstrap only.
    pub(crate) fn install(&self, method: Method) {
        method.bind(self);
        self.inner.methods.borrow_mut().insert(0, method);
    }

    pub(crate) fn islots(&self) -> &RefCell<Vec<Value>> {
        &self.inner.islots
    }
}

impl PartialEq for Generic {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Generic {}

impl Hash for Generic {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.inner).hash(state);
    }
}

/// A native method body: `(runtime, args, next-method)`.
pub type NativeBody = Rc<dyn Fn(&Runtime, &[Value], &NextMethod) -> Result<Value>>;

/// The body of a method.
#[derive(Clone)]
pub enum MethodBody {
    /// Receives the arguments as given.
    Native(NativeBody),
    /// Receives the required arguments, then the rest list if the method
    /// takes optional arguments, then the next-method object.
    Procedure(Procedure),
}

/// A method.
#[derive(Clone)]
pub struct Method {
    inner: Rc<MethodInner>,
}

struct MethodInner {
    class: Class,
    generic: RefCell<Weak<GenericInner>>,
    owner_name: RefCell<Option<String>>,
    specializers: RefCell<Vec<Class>>,
    required: Cell<usize>,
    optional: Cell<bool>,
    body: RefCell<Option<MethodBody>>,
    islots: RefCell<Vec<Value>>,
}

impl Method {
    /// Creates an empty method of class `class`.
    pub(crate) fn new(class: Class) -> Method {
        let islots = vec![Value::Unbound; class.num_instance_slots()];
        Method {
            inner: Rc::new(MethodInner {
                class,
                generic: RefCell::new(Weak::new()),
                owner_name: RefCell::new(None),
                specializers: RefCell::new(Vec::new()),
                required: Cell::new(0),
                optional: Cell::new(false),
                body: RefCell::new(None),
                islots: RefCell::new(islots),
            }),
        }
    }

    /// Creates a method with a native body. The required count is the
    /// number of specializers.
    pub fn native<F>(class: Class, specializers: Vec<Class>, optional: bool, body: F) -> Method
    where
        F: Fn(&Runtime, &[Value], &NextMethod) -> Result<Value> + 'static,
    {
        let method = Method::new(class);
        method.set_signature(specializers, optional);
        method.set_body(MethodBody::Native(Rc::new(body)));
        method
    }

    #[must_use]
    pub fn class(&self) -> &Class {
        &self.inner.class
    }

    /// Returns the generic this method is bound to, if it is still alive.
    #[must_use]
    pub fn generic(&self) -> Option<Generic> {
        self.inner
            .generic
            .borrow()
            .upgrade()
            .map(|inner| Generic { inner })
    }

    /// Checks whether the method has ever been bound to a generic.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.owner_name.borrow().is_some()
    }

    /// Returns the name of the generic the method was bound to, even after
    /// that generic is gone.
    #[must_use]
    pub fn owner_name(&self) -> Option<String> {
        self.inner.owner_name.borrow().clone()
    }

    #[must_use]
    pub fn specializers(&self) -> Vec<Class> {
        self.inner.specializers.borrow().clone()
    }

    /// Runs `f` over the specializers without cloning them.
    pub fn with_specializers<R>(&self, f: impl FnOnce(&[Class]) -> R) -> R {
        f(&self.inner.specializers.borrow())
    }

    #[must_use]
    pub fn required(&self) -> usize {
        self.inner.required.get()
    }

    #[must_use]
    pub fn optional(&self) -> bool {
        self.inner.optional.get()
    }

    #[must_use]
    pub fn has_body(&self) -> bool {
        self.inner.body.borrow().is_some()
    }

    pub(crate) fn set_signature(&self, specializers: Vec<Class>, optional: bool) {
        self.inner.required.set(specializers.len());
        self.inner.optional.set(optional);
        *self.inner.specializers.borrow_mut() = specializers;
    }

    pub(crate) fn set_body(&self, body: MethodBody) {
        *self.inner.body.borrow_mut() = Some(body);
    }

    pub(crate) fn bind(&self, generic: &Generic) {
        *self.inner.generic.borrow_mut() = Rc::downgrade(&generic.inner);
        *self.inner.owner_name.borrow_mut() = Some(generic.name_string());
    }

    fn same_signature(&self, other: &Method) -> bool {
        self.required() == other.required()
            && self.optional() == other.optional()
            && *self.inner.specializers.borrow() == *other.inner.specializers.borrow()
    }

    pub(crate) fn islots(&self) -> &RefCell<Vec<Value>> {
        &self.inner.islots
    }

    /// Runs the body with `next` as its next-method continuation.
    pub(crate) fn invoke(&self, rt: &Runtime, args: &[Value], next: &NextMethod) -> Result<Value> {
        let body = self.inner.body.borrow().clone();
        match body {
            Some(MethodBody::Native(f)) => f(rt, args, next),
            Some(MethodBody::Procedure(p)) => {
                let required = self.required().min(args.len());
                let mut call_args = args[..required].to_vec();
                if self.optional() {
                    call_args.push(Value::list(args[required..].iter().cloned()));
                }
                call_args.push(Value::NextMethod(next.clone()));
                p.call(rt, &call_args)
            }
            None => Err(Error::InvalidMethod {
                reason: format!("{self:?} has no body"),
            }),
        }
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Method {}

/// The continuation of a method: the remaining applicable methods and the
/// arguments of the call.
#[derive(Clone)]
pub struct NextMethod {
    inner: Rc<NextInner>,
}

struct NextInner {
    generic: Generic,
    methods: Rc<[Method]>,
    index: usize,
    args: Rc<[Value]>,
}

impl NextMethod {
    pub(crate) fn new(
        generic: Generic,
        methods: Rc<[Method]>,
        index: usize,
        args: Rc<[Value]>,
    ) -> NextMethod {
        NextMethod {
            inner: Rc::new(NextInner {
                generic,
                methods,
                index,
                args,
            }),
        }
    }

    #[must_use]
    pub fn generic(&self) -> &Generic {
        &self.inner.generic
    }

    /// Returns the arguments of the original call.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.inner.args
    }

    /// Returns true if another method remains before the fallback.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.inner.index < self.inner.methods.len()
    }

    #[must_use]
    pub fn remaining(&self) -> &[Method] {
        &self.inner.methods[self.inner.index.min(self.inner.methods.len())..]
    }

    /// Calls the next method with the original arguments.
    ///
    /// # Errors
    ///
    /// Whatever the next method (or the generic's fallback) returns.
    pub fn call(&self, rt: &Runtime) -> Result<Value> {
        let args = Rc::clone(&self.inner.args);
        self.invoke(rt, args)
    }

    /// Calls the next method with new arguments.
    ///
    /// # Errors
    ///
    /// Whatever the next method (or the generic's fallback) returns.
    pub fn call_with(&self, rt: &Runtime, args: &[Value]) -> Result<Value> {
        self.invoke(rt, Rc::from(args))
    }

    fn invoke(&self, rt: &Runtime, args: Rc<[Value]>) -> Result<Value> {
        let inner = &self.inner;
        let Some(method) = inner.methods.get(inner.index) else {
            return inner.generic.call_fallback(rt, &args);
        };
        let next = NextMethod::new(
            inner.generic.clone(),
            Rc::clone(&inner.methods),
            inner.index + 1,
            Rc::clone(&args),
        );
        method.invoke(rt, &args, &next)
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &NextMethod) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generic(rt: &Runtime, name: &str) -> Generic {
        rt.define_generic(name)
    }

    fn method(rt: &Runtime, specs: Vec<Class>, tag: i64) -> Method {
        Method::native(rt.builtins().method.clone(), specs, false, move |_, _, _| {
            Ok(Value::Int(tag))
        })
    }

    #[test]
    fn test_add_prepends() {
        let rt = Runtime::new();
        let b = rt.builtins();
        let g = generic(&rt, "g");
        let m1 = method(&rt, vec![b.integer.clone()], 1);
        let m2 = method(&rt, vec![b.string.clone()], 2);
        g.add_method(&m1).unwrap();
        g.add_method(&m2).unwrap();

        assert_eq!(g.methods(), vec![m2.clone(), m1.clone()]);
        assert_eq!(m1.generic(), Some(g.clone()));
    }

    #[test]
    fn test_same_signature_replaces_in_place() {
        let rt = Runtime::new();
        let b = rt.builtins();
        let g = generic(&rt, "g");
        let m1 = method(&rt, vec![b.integer.clone()], 1);
        let other = method(&rt, vec![b.string.clone()], 2);
        let m3 = method(&rt, vec![b.integer.clone()], 3);
        g.add_method(&m1).unwrap();
        g.add_method(&other).unwrap();
        g.add_method(&m3).unwrap();

        assert_eq!(g.methods(), vec![other, m3]);
    }

    #[test]
    fn test_add_twice_fails() {
        let rt = Runtime::new();
        let g = generic(&rt, "g");
        let m = method(&rt, vec![rt.builtins().top.clone()], 1);
        g.add_method(&m).unwrap();
        assert!(matches!(g.add_method(&m), Err(Error::MethodAlreadyAdded { .. })));
        assert_eq!(g.method_count(), 1);
    }

    #[test]
    fn test_bound_to_other_generic_fails() {
        let rt = Runtime::new();
        let g = generic(&rt, "g");
        let h = generic(&rt, "h");
        let m = method(&rt, vec![rt.builtins().top.clone()], 1);
        g.add_method(&m).unwrap();
        assert!(matches!(h.add_method(&m), Err(Error::MethodAlreadyBound { .. })));
        assert_eq!(h.method_count(), 0);
    }

    #[test]
    fn test_binding_outlives_the_owner() {
        let rt = Runtime::new();
        let m = method(&rt, vec![rt.builtins().top.clone()], 1);
        {
            let transient = rt
                .make(&rt.builtins().generic, &[rt.keyword("name"), rt.symbol("transient")])
                .unwrap();
            transient.as_generic().unwrap().add_method(&m).unwrap();
        }
        assert_eq!(m.generic(), None);
        assert!(m.is_bound());

        let h = generic(&rt, "h");
        assert_eq!(
            h.add_method(&m),
            Err(Error::MethodAlreadyBound {
                method: format!("{m:?}"),
                generic: "transient".into()
            })
        );
        assert_eq!(h.method_count(), 0);
    }

    #[test]
    fn test_default_fallback() {
        let rt = Runtime::new();
        let g = generic(&rt, "area");
        assert_eq!(
            g.call_fallback(&rt, &[Value::Int(1)]),
            Err(Error::NoApplicableMethod {
                generic: "area".into(),
                args: "(1)".into()
            })
        );
    }

    #[test]
    fn test_procedure_body_receives_rest_and_next() {
        let rt = Runtime::new();
        let g = generic(&rt, "g");
        let m = Method::new(rt.builtins().method.clone());
        m.set_signature(vec![rt.builtins().top.clone()], true);
        m.set_body(MethodBody::Procedure(Procedure::new("body", 3, false, |_, args| {
            assert!(matches!(args[2], Value::NextMethod(_)));
            Ok(args[1].clone())
        })));
        g.add_method(&m).unwrap();

        let result = rt
            .apply_generic(&g, &[Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        assert_eq!(result, Value::list([Value::Int(2), Value::Int(3)]));
    }
}
