//! External representations.
//!
//! [`write_simple`] renders any value without consulting the runtime; it
//! backs the `Debug` impls of [`Value`] and the metaobject handles.
//! [`Runtime::write`] additionally honors per-class print hooks, looked up
//! along the class precedence list.

use std::cmp::Ordering;
use std::fmt::{self, Write as _};

use crate::error::Result;
use crate::runtime::slot::SlotStorage;
use crate::runtime::{Generic, Instance, Method, NextMethod, Runtime, SlotAccessor, Value};

fn write_char(c: char, out: &mut String) {
    match c {
        ' ' => out.push_str("#\\space"),
        '\n' => out.push_str("#\\newline"),
        '\t' => out.push_str("#\\tab"),
        c => {
            out.push_str("#\\");
            out.push(c);
        }
    }
}

fn write_str_literal(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Writes a list, rendering each element with `item`.
fn write_list<F>(list: &Value, out: &mut String, mut item: F) -> Result<()>
where
    F: FnMut(&Value, &mut String) -> Result<()>,
{
    out.push('(');
    let mut iter = list.iter_list();
    let mut first = true;
    for value in iter.by_ref() {
        if !first {
            out.push(' ');
        }
        first = false;
        item(&value, out)?;
    }
    if !iter.rest().is_null() {
        out.push_str(" . ");
        item(iter.rest(), out)?;
    }
    out.push(')');
    Ok(())
}

/// `#<point>` for a class named `<point>`.
fn write_instance(instance: &Instance, out: &mut String) {
    let name = instance.class().name_string();
    let bare = name
        .strip_prefix('<')
        .and_then(|n| n.strip_suffix('>'))
        .unwrap_or(name.as_str());
    let _ = write!(out, "#<{bare}>");
}

fn write_generic(generic: &Generic, out: &mut String) {
    let _ = write!(
        out,
        "#<generic {} ({})>",
        generic.name_string(),
        generic.method_count()
    );
}

fn write_method(method: &Method, out: &mut String) {
    let generic = method
        .generic()
        .map_or_else(|| "#f".to_owned(), |g| g.name_string());
    let _ = write!(out, "#<method ({generic}");
    method.with_specializers(|specs| {
        for spec in specs {
            let _ = write!(out, " {}", spec.name_string());
        }
    });
    if method.optional() {
        out.push_str(" . rest");
    }
    out.push_str(")>");
}

fn write_next_method(next: &NextMethod, out: &mut String) {
    let _ = write!(
        out,
        "#<next-method {} ({} remaining)>",
        next.generic().name_string(),
        next.remaining().len()
    );
}

fn write_accessor(accessor: &SlotAccessor, out: &mut String) {
    out.push_str("#<slot-accessor ");
    match accessor.storage() {
        SlotStorage::Native { .. } => out.push_str("native"),
        SlotStorage::Instance(n) => {
            let _ = write!(out, "{n}");
        }
        SlotStorage::Procedural { .. } => out.push_str("proc"),
        SlotStorage::Unresolved => out.push_str("unknown"),
    }
    if let Some(kw) = accessor.init_keyword() {
        let _ = write!(out, " {kw}");
    }
    out.push('>');
}

/// Writes `value` without print hooks.
pub fn write_simple(value: &Value, out: &mut String) {
    match value {
        Value::Unbound => out.push_str("#<unbound>"),
        Value::Undefined => out.push_str("#<undef>"),
        Value::Nil => out.push_str("()"),
        Value::Bool(true) => out.push_str("#t"),
        Value::Bool(false) => out.push_str("#f"),
        Value::Char(c) => write_char(*c, out),
        Value::Int(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Str(s) => write_str_literal(s, out),
        Value::Symbol(sym) => out.push_str(sym.as_str()),
        Value::Keyword(kw) => {
            let _ = write!(out, "{kw}");
        }
        Value::Pair(_) => {
            let _ = write_list(value, out, |item, out| {
                write_simple(item, out);
                Ok(())
            });
        }
        Value::Procedure(p) => {
            let _ = write!(out, "#<procedure {}>", p.name());
        }
        Value::Class(c) => {
            let _ = write!(out, "#<class {}>", c.name_string());
        }
        Value::Generic(g) => write_generic(g, out),
        Value::Method(m) => write_method(m, out),
        Value::NextMethod(n) => write_next_method(n, out),
        Value::Accessor(a) => write_accessor(a, out),
        Value::Instance(i) => write_instance(i, out),
    }
}

fn debug_via_simple(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut out = String::new();
    write_simple(value, &mut out);
    f.write_str(&out)
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_via_simple(self, f)
    }
}

impl fmt::Debug for Generic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_generic(self, &mut out);
        f.write_str(&out)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_method(self, &mut out);
        f.write_str(&out)
    }
}

impl fmt::Debug for NextMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_next_method(self, &mut out);
        f.write_str(&out)
    }
}

impl fmt::Debug for SlotAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_accessor(self, &mut out);
        f.write_str(&out)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_instance(self, &mut out);
        f.write_str(&out)
    }
}

impl Runtime {
    /// Writes `value`, using the nearest print hook of its class.
    ///
    /// # Errors
    ///
    /// Propagates errors from print hooks.
    pub fn write(&self, value: &Value, out: &mut String) -> Result<()> {
        if let Value::Pair(_) = value {
            return write_list(value, out, |item, out| self.write(item, out));
        }
        match self.class_of(value).find_print_hook() {
            Some(hook) => hook(self, value, out),
            None => {
                write_simple(value, out);
                Ok(())
            }
        }
    }

    /// Renders `value` with [`Runtime::write`].
    ///
    /// # Errors
    ///
    /// Propagates errors from print hooks.
    pub fn write_to_string(&self, value: &Value) -> Result<String> {
        let mut out = String::new();
        self.write(value, &mut out)?;
        Ok(out)
    }

    /// Orders two values.
    ///
    /// Uses the compare hook of `a`'s class when both values have the same
    /// class. Without a hook, integers, characters and strings compare
    /// naturally and everything else is unordered (`None`).
    ///
    /// # Errors
    ///
    /// Propagates errors from compare hooks.
    pub fn compare(&self, a: &Value, b: &Value) -> Result<Option<Ordering>> {
        let class = self.class_of(a);
        if class == self.class_of(b) {
            if let Some(hook) = class.find_compare_hook() {
                return hook(self, a, b);
            }
        }
        Ok(match (a, b) {
            (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
            (Value::Char(x), Value::Char(y)) => Some(x.cmp(y)),
            (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
            _ if a.is_eq(b) => Some(Ordering::Equal),
            _ => None,
        })
    }

    /// Writes a readable form of `value`, using the nearest serialize hook
    /// and falling back to [`Runtime::write`].
    ///
    /// # Errors
    ///
    /// Propagates errors from hooks.
    pub fn serialize(&self, value: &Value, out: &mut String) -> Result<()> {
        match self.class_of(value).find_serialize_hook() {
            Some(hook) => hook(self, value, out),
            None => self.write(value, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Procedure, SlotSpec};

    fn simple(value: &Value) -> String {
        let mut out = String::new();
        write_simple(value, &mut out);
        out
    }

    #[test]
    fn test_atoms() {
        assert_eq!(simple(&Value::Nil), "()");
        assert_eq!(simple(&Value::Bool(true)), "#t");
        assert_eq!(simple(&Value::Char('a')), "#\\a");
        assert_eq!(simple(&Value::Char(' ')), "#\\space");
        assert_eq!(simple(&Value::Int(-4)), "-4");
        assert_eq!(simple(&Value::string("a\"b")), "\"a\\\"b\"");
        assert_eq!(simple(&Value::Unbound), "#<unbound>");
    }

    #[test]
    fn test_lists() {
        let rt = Runtime::new();
        let list = Value::list([rt.symbol("a"), rt.keyword("b"), Value::Int(1)]);
        assert_eq!(simple(&list), "(a :b 1)");
        let dotted = Value::list_with_tail([Value::Int(1)], Value::Int(2));
        assert_eq!(simple(&dotted), "(1 . 2)");
    }

    #[test]
    fn test_metaobjects() {
        let rt = Runtime::new();
        let g = rt.define_generic("area");
        assert_eq!(format!("{g:?}"), "#<generic area (0)>");
        let p = Procedure::thunk("t", |_| Ok(Value::Nil));
        assert_eq!(simple(&Value::Procedure(p)), "#<procedure t>");
        assert_eq!(
            simple(&Value::Class(rt.builtins().pair.clone())),
            "#<class <pair>>"
        );
    }

    #[test]
    fn test_instance_default_and_hook() {
        let rt = Runtime::new();
        let point = rt
            .define_class("<point>", &[], &[SlotSpec::new("x").init_keyword("x").build(&rt)])
            .unwrap();
        let p = rt.make(&point, &[rt.keyword("x"), Value::Int(3)]).unwrap();
        assert_eq!(rt.write_to_string(&p).unwrap(), "#<point>");

        point.set_print_hook(|rt, v, out| {
            let x = rt.slot_ref(v, "x")?;
            out.push_str(&format!("#<point x={x:?}>"));
            Ok(())
        });
        let sub = rt.define_class("<point3>", &[point.clone()], &[]).unwrap();
        let q = rt.make(&sub, &[rt.keyword("x"), Value::Int(4)]).unwrap();
        assert_eq!(
            rt.write_to_string(&Value::list([p, q])).unwrap(),
            "(#<point x=3> #<point x=4>)"
        );
    }

    #[test]
    fn test_compare_and_serialize_fallbacks() {
        let rt = Runtime::new();
        assert_eq!(rt.compare(&Value::Int(1), &Value::Int(2)), Ok(Some(Ordering::Less)));
        assert_eq!(rt.compare(&Value::Int(1), &Value::string("a")), Ok(None));

        let mut out = String::new();
        rt.serialize(&Value::list([Value::Int(1)]), &mut out).unwrap();
        assert_eq!(out, "(1)");
    }

    #[test]
    fn test_compare_hook() {
        let rt = Runtime::new();
        let version = rt
            .define_class("<version>", &[], &[SlotSpec::new("n").init_keyword("n").build(&rt)])
            .unwrap();
        version.set_compare_hook(|rt, a, b| {
            let a = rt.slot_ref(a, "n")?;
            let b = rt.slot_ref(b, "n")?;
            rt.compare(&a, &b)
        });
        let v1 = rt.make(&version, &[rt.keyword("n"), Value::Int(1)]).unwrap();
        let v2 = rt.make(&version, &[rt.keyword("n"), Value::Int(2)]).unwrap();
        assert_eq!(rt.compare(&v2, &v1), Ok(Some(Ordering::Greater)));
    }
}
