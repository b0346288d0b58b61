//! Host procedures.
//!
//! A [`Procedure`] stands in for evaluator closures: slot getters and
//! setters for virtual slots, init-thunks, method bodies built through
//! `make <method>`, and generic fallbacks are all procedures.

use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::{Runtime, Value};

type ProcedureFn = dyn Fn(&Runtime, &[Value]) -> Result<Value>;

/// A named, arity-checked callable.
#[derive(Clone)]
pub struct Procedure {
    inner: Rc<ProcedureInner>,
}

struct ProcedureInner {
    name: String,
    required: usize,
    rest: bool,
    func: Box<ProcedureFn>,
}

impl Procedure {
    /// Creates a procedure taking `required` arguments, plus any number of
    /// extra arguments when `rest` is true.
    ///
    /// # Example
    ///
    /// ```
    /// use oxiclos::{Procedure, Runtime, Value};
    ///
    /// let rt = Runtime::new();
    /// let add = Procedure::new("add", 2, false, |_, args| {
    ///     match (&args[0], &args[1]) {
    ///         (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
    ///         _ => Ok(Value::Bool(false)),
    ///     }
    /// });
    ///
    /// assert_eq!(add.call(&rt, &[Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));
    /// assert!(add.call(&rt, &[Value::Int(2)]).is_err());
    /// ```
    pub fn new<F>(name: impl Into<String>, required: usize, rest: bool, func: F) -> Self
    where
        F: Fn(&Runtime, &[Value]) -> Result<Value> + 'static,
    {
        Procedure {
            inner: Rc::new(ProcedureInner {
                name: name.into(),
                required,
                rest,
                func: Box::new(func),
            }),
        }
    }

    /// Creates a procedure taking no arguments.
    pub fn thunk<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Runtime) -> Result<Value> + 'static,
    {
        Procedure::new(name, 0, false, move |rt, _| func(rt))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn required(&self) -> usize {
        self.inner.required
    }

    #[must_use]
    pub fn rest(&self) -> bool {
        self.inner.rest
    }

    /// Returns true if a call with `nargs` arguments passes the arity check.
    #[must_use]
    pub fn accepts(&self, nargs: usize) -> bool {
        nargs == self.inner.required || (self.inner.rest && nargs > self.inner.required)
    }

    /// Calls the procedure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArityMismatch`] when `args` does not fit the arity,
    /// and whatever the procedure body returns otherwise.
    pub fn call(&self, rt: &Runtime, args: &[Value]) -> Result<Value> {
        if !self.accepts(args.len()) {
            return Err(Error::ArityMismatch {
                name: self.inner.name.clone(),
                required: self.inner.required,
                rest: self.inner.rest,
                given: args.len(),
            });
        }
        (self.inner.func)(rt, args)
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &Procedure) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<procedure {}>", self.inner.name)
    }
}
