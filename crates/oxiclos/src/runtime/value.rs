//! Host value representation.
//!
//! [`Value`] is the object model the class system classifies and stores in
//! slots. Immediates (booleans, characters, integers, symbols, keywords) are
//! held inline; everything else is a reference-counted handle, so cloning a
//! `Value` never copies an object.
//!
//! Two notions of equality are provided:
//! - [`Value::is_eq`]: identity (`eq?`). Heap values compare by pointer.
//! - `PartialEq`: structural (`equal?`). Strings and pairs compare by
//!   content, metaobjects and instances still by identity.

use std::mem;
use std::rc::Rc;

use oxiclos_intern::Symbol;

use crate::runtime::{
    Class, Generic, Instance, Keyword, Method, NextMethod, Procedure, SlotAccessor,
};

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    /// The unbound-slot sentinel.
    Unbound,
    /// The "no useful value" sentinel. Also reads as unbound in slots.
    Undefined,
    /// The empty list.
    Nil,
    /// `#t` / `#f`.
    Bool(bool),
    /// A character.
    Char(char),
    /// A fixnum.
    Int(i64),
    /// An immutable string.
    Str(Rc<str>),
    /// An interned symbol.
    Symbol(Symbol),
    /// An interned keyword.
    Keyword(Keyword),
    /// A cons cell.
    Pair(Rc<Pair>),
    /// A host procedure.
    Procedure(Procedure),
    /// A class metaobject.
    Class(Class),
    /// A generic function.
    Generic(Generic),
    /// A method.
    Method(Method),
    /// A next-method continuation.
    NextMethod(NextMethod),
    /// A slot accessor.
    Accessor(SlotAccessor),
    /// An instance of a class with boxed slots.
    Instance(Instance),
}

/// A cons cell. Pairs are immutable once built.
pub struct Pair {
    /// First element.
    pub car: Value,
    /// Rest of the list.
    pub cdr: Value,
}

// Unlinks the cdr chain iteratively; the default drop recurses once per
// element and overflows the stack on long lists.
impl Drop for Pair {
    fn drop(&mut self) {
        let mut next = mem::replace(&mut self.cdr, Value::Nil);
        while let Value::Pair(cell) = next {
            match Rc::try_unwrap(cell) {
                Ok(mut pair) => next = mem::replace(&mut pair.cdr, Value::Nil),
                Err(_) => break,
            }
        }
    }
}

impl Value {
    /// Builds a cons cell.
    #[must_use]
    pub fn cons(car: Value, cdr: Value) -> Value {
        Value::Pair(Rc::new(Pair { car, cdr }))
    }

    /// Builds a proper list from `items`.
    ///
    /// ```
    /// use oxiclos::Value;
    ///
    /// let list = Value::list([Value::Int(1), Value::Int(2)]);
    /// assert_eq!(list.to_vec(), Some(vec![Value::Int(1), Value::Int(2)]));
    /// ```
    pub fn list<I>(items: I) -> Value
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        Value::list_with_tail(items, Value::Nil)
    }

    /// Builds a list from `items` ending in `tail` (dotted when `tail` is
    /// not a list).
    pub fn list_with_tail<I>(items: I, tail: Value) -> Value
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Value::cons(item, acc))
    }

    /// Builds a string value.
    #[must_use]
    pub fn string(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    /// Collects a proper list into a vector. Returns `None` for improper
    /// lists and non-lists.
    #[must_use]
    pub fn to_vec(&self) -> Option<Vec<Value>> {
        let mut iter = self.iter_list();
        let items: Vec<Value> = iter.by_ref().collect();
        iter.rest().is_null().then_some(items)
    }

    /// Iterates over the cars of a list. The tail left after iteration is
    /// available from [`ListIter::rest`].
    #[must_use]
    pub fn iter_list(&self) -> ListIter {
        ListIter { rest: self.clone() }
    }

    /// Returns the length of a proper list.
    #[must_use]
    pub fn list_len(&self) -> Option<usize> {
        let mut iter = self.iter_list();
        let len = iter.by_ref().count();
        iter.rest().is_null().then_some(len)
    }

    /// Returns true for `()`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Returns true for a cons cell.
    #[must_use]
    pub fn is_pair(&self) -> bool {
        matches!(self, Value::Pair(_))
    }

    /// Returns true for either unbound sentinel.
    #[must_use]
    pub fn is_unbound(&self) -> bool {
        matches!(self, Value::Unbound | Value::Undefined)
    }

    /// Scheme truthiness: everything except `#f` is true.
    #[must_use]
    pub fn is_true(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    /// Returns the car of a pair.
    #[must_use]
    pub fn car(&self) -> Option<&Value> {
        match self {
            Value::Pair(p) => Some(&p.car),
            _ => None,
        }
    }

    /// Returns the cdr of a pair.
    #[must_use]
    pub fn cdr(&self) -> Option<&Value> {
        match self {
            Value::Pair(p) => Some(&p.cdr),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Value::Class(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_symbol(&self) -> Option<Symbol> {
        match self {
            Value::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_keyword(&self) -> Option<Keyword> {
        match self {
            Value::Keyword(k) => Some(*k),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_procedure(&self) -> Option<&Procedure> {
        match self {
            Value::Procedure(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_generic(&self) -> Option<&Generic> {
        match self {
            Value::Generic(g) => Some(g),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_method(&self) -> Option<&Method> {
        match self {
            Value::Method(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_accessor(&self) -> Option<&SlotAccessor> {
        match self {
            Value::Accessor(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Identity comparison (`eq?`).
    #[must_use]
    pub fn is_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unbound, Value::Unbound)
            | (Value::Undefined, Value::Undefined)
            | (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            (Value::Procedure(a), Value::Procedure(b)) => a.ptr_eq(b),
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Generic(a), Value::Generic(b)) => a == b,
            (Value::Method(a), Value::Method(b)) => a == b,
            (Value::NextMethod(a), Value::NextMethod(b)) => a.ptr_eq(b),
            (Value::Accessor(a), Value::Accessor(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Pair(_), Value::Pair(_)) => {
                let (mut a, mut b) = (self, other);
                loop {
                    match (a, b) {
                        (Value::Pair(x), Value::Pair(y)) => {
                            if Rc::ptr_eq(x, y) {
                                return true;
                            }
                            if x.car != y.car {
                                return false;
                            }
                            a = &x.cdr;
                            b = &y.cdr;
                        }
                        _ => return a == b,
                    }
                }
            }
            _ => self.is_eq(other),
        }
    }
}

impl Eq for Value {}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Class> for Value {
    fn from(c: Class) -> Self {
        Value::Class(c)
    }
}

impl From<Generic> for Value {
    fn from(g: Generic) -> Self {
        Value::Generic(g)
    }
}

impl From<Method> for Value {
    fn from(m: Method) -> Self {
        Value::Method(m)
    }
}

impl From<Procedure> for Value {
    fn from(p: Procedure) -> Self {
        Value::Procedure(p)
    }
}

impl From<SlotAccessor> for Value {
    fn from(a: SlotAccessor) -> Self {
        Value::Accessor(a)
    }
}

impl From<Keyword> for Value {
    fn from(k: Keyword) -> Self {
        Value::Keyword(k)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

/// Iterator over the elements of a (possibly improper) list.
pub struct ListIter {
    rest: Value,
}

impl ListIter {
    /// The unconsumed tail: `()` after a proper list, the dotted tail after
    /// an improper one.
    #[must_use]
    pub fn rest(&self) -> &Value {
        &self.rest
    }
}

impl Iterator for ListIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let (car, cdr) = match &self.rest {
            Value::Pair(p) => (p.car.clone(), p.cdr.clone()),
            _ => return None,
        };
        self.rest = cdr;
        Some(car)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_roundtrip() {
        let list = Value::list([Value::Int(1), Value::Bool(true), Value::Nil]);
        assert_eq!(list.list_len(), Some(3));
        assert_eq!(
            list.to_vec(),
            Some(vec![Value::Int(1), Value::Bool(true), Value::Nil])
        );
    }

    #[test]
    fn test_dotted_list() {
        let dotted = Value::list_with_tail([Value::Int(1), Value::Int(2)], Value::Int(3));
        assert_eq!(dotted.to_vec(), None);
        assert_eq!(dotted.list_len(), None);

        let mut iter = dotted.iter_list();
        assert_eq!(iter.by_ref().count(), 2);
        assert_eq!(iter.rest(), &Value::Int(3));
    }

    #[test]
    fn test_non_list_is_not_proper() {
        assert_eq!(Value::Int(1).to_vec(), None);
        assert_eq!(Value::Nil.to_vec(), Some(vec![]));
    }

    #[test]
    fn test_eq_vs_equal_on_strings() {
        let a = Value::string("abc");
        let b = Value::string("abc");
        assert!(!a.is_eq(&b));
        assert_eq!(a, b);
        assert!(a.is_eq(&a.clone()));
    }

    #[test]
    fn test_eq_vs_equal_on_pairs() {
        let a = Value::list([Value::Int(1)]);
        let b = Value::list([Value::Int(1)]);
        assert!(!a.is_eq(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_long_list_drop_and_equality() {
        let a = Value::list((0..1_000_000).map(Value::Int));
        let b = Value::list((0..1_000_000).map(Value::Int));
        assert_eq!(a.list_len(), Some(1_000_000));
        assert_eq!(a, b);
        drop(a);
        drop(b);
    }

    #[test]
    fn test_drop_keeps_shared_tail() {
        let tail = Value::list([Value::Int(2), Value::Int(3)]);
        let list = Value::cons(Value::Int(1), tail.clone());
        drop(list);
        assert_eq!(tail.to_vec(), Some(vec![Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn test_unbound_sentinels() {
        assert!(Value::Unbound.is_unbound());
        assert!(Value::Undefined.is_unbound());
        assert!(!Value::Nil.is_unbound());
        assert!(!Value::Unbound.is_eq(&Value::Undefined));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Bool(false).is_true());
        assert!(Value::Nil.is_true());
        assert!(Value::Int(0).is_true());
    }
}
