//! Class precedence list computation.
//!
//! The CPL is a C3-style monotonic merge of:
//!
//! 1. the direct supers (with `<object>` and `<top>` removed) followed by
//!    `<object>`,
//! 2. the CPL of each remaining direct super, in order,
//! 3. the CPL of `<object>`.
//!
//! The class itself is prepended to the result.

use crate::error::{Error, Result};
use crate::runtime::{Class, Runtime, Value};

/// Merges `sequences` into one list consistent with every sequence's order.
///
/// Each step takes, trying sequences in order, the first head that does not
/// occur in the tail of any sequence. Returns `None` when no head qualifies.
#[must_use]
pub fn merge(sequences: &[Vec<Class>]) -> Option<Vec<Class>> {
    let mut views: Vec<&[Class]> = sequences.iter().map(Vec::as_slice).collect();
    let mut result = Vec::new();

    loop {
        views.retain(|v| !v.is_empty());
        if views.is_empty() {
            return Some(result);
        }

        let next = views
            .iter()
            .map(|v| &v[0])
            .find(|head| !views.iter().any(|v| v[1..].contains(head)))?
            .clone();

        for view in &mut views {
            if view[0] == next {
                *view = &view[1..];
            }
        }
        result.push(next);
    }
}

/// Computes the class precedence list of `class` from its direct supers.
///
/// # Errors
///
/// Returns [`Error::InconsistentPrecedence`] when the supers impose
/// contradictory orderings.
pub fn compute_cpl(rt: &Runtime, class: &Class) -> Result<Vec<Class>> {
    let object = &rt.builtins().object;
    let top = &rt.builtins().top;
    let supers: Vec<Class> = class
        .direct_supers()
        .into_iter()
        .filter(|c| c != object && c != top)
        .collect();

    let mut sequences = Vec::with_capacity(supers.len() + 2);
    let mut head = supers.clone();
    head.push(object.clone());
    sequences.push(head);
    sequences.extend(supers.iter().map(Class::cpl));
    sequences.push(object.cpl());

    let merged = merge(&sequences).ok_or_else(|| Error::InconsistentPrecedence {
        class: class.name_string(),
        supers: format!(
            "{:?}",
            Value::list(class.direct_supers().into_iter().map(Value::Class))
        ),
    })?;

    let mut cpl = Vec::with_capacity(merged.len() + 1);
    cpl.push(class.clone());
    cpl.extend(merged);
    Ok(cpl)
}
