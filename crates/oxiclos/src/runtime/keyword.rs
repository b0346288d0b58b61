//! Keywords and keyword-argument lists.
//!
//! Keywords are interned in their own table, so there is at most one keyword
//! object per name and comparing two keywords is an id comparison.
//! Constructor argument lists are property lists of alternating keywords
//! and values (`(:x 1 :y 2)`), searched with [`get_keyword`].

use std::fmt;

use oxiclos_intern::{Interner, Symbol};

use crate::error::{Error, Result};
use crate::runtime::Value;

/// An interned keyword such as `:init-value`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keyword(Symbol);

impl Keyword {
    /// Returns the keyword's name without the leading colon.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.as_str()
    }

    /// Returns the underlying interned symbol.
    #[must_use]
    pub fn symbol(self) -> Symbol {
        self.0
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0.as_str())
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The keyword table.
#[derive(Debug, Default)]
pub struct KeywordTable {
    names: Interner,
}

impl KeywordTable {
    /// Creates a table sized for `capacity` keywords.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        KeywordTable {
            names: Interner::with_capacity(capacity),
        }
    }

    /// Returns the keyword named `name`, creating it on first use. A leading
    /// colon is accepted and ignored.
    pub fn intern(&mut self, name: &str) -> Keyword {
        let name = name.strip_prefix(':').unwrap_or(name);
        Keyword(self.names.intern(name))
    }

    /// Looks up an existing keyword.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Keyword> {
        let name = name.strip_prefix(':').unwrap_or(name);
        self.names.get(name).map(Keyword)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Searches `plist` for `key`.
///
/// Returns `Ok(None)` when the key is absent.
///
/// # Errors
///
/// Returns [`Error::OddKeywordList`] if a key without a value is reached
/// before `key` is found.
pub fn find_keyword(key: Keyword, plist: &Value) -> Result<Option<Value>> {
    let mut cursor = plist;
    while let Value::Pair(cell) = cursor {
        let Value::Pair(value_cell) = &cell.cdr else {
            return Err(Error::OddKeywordList {
                list: format!("{plist:?}"),
            });
        };
        if let Value::Keyword(k) = &cell.car {
            if *k == key {
                return Ok(Some(value_cell.car.clone()));
            }
        }
        cursor = &value_cell.cdr;
    }
    Ok(None)
}

/// Looks up `key` in `plist`, returning `fallback` when absent.
///
/// A `fallback` of [`Value::Unbound`] makes the key mandatory.
///
/// # Errors
///
/// - [`Error::OddKeywordList`] for a malformed list
/// - [`Error::MissingKeyword`] when the key is absent and mandatory
pub fn get_keyword(key: Keyword, plist: &Value, fallback: Value) -> Result<Value> {
    match find_keyword(key, plist)? {
        Some(value) => Ok(value),
        None if matches!(fallback, Value::Unbound) => Err(Error::MissingKeyword {
            keyword: key.to_string(),
        }),
        None => Ok(fallback),
    }
}

/// Checks that `plist` is a proper list of even length.
///
/// # Errors
///
/// Returns [`Error::OddKeywordList`] otherwise.
pub fn check_even(plist: &Value) -> Result<()> {
    match plist.list_len() {
        Some(len) if len % 2 == 0 => Ok(()),
        _ => Err(Error::OddKeywordList {
            list: format!("{plist:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> KeywordTable {
        KeywordTable::with_capacity(8)
    }

    #[test]
    fn test_one_keyword_per_name() {
        let mut kw = table();
        let a = kw.intern("init-value");
        let b = kw.intern(":init-value");
        assert_eq!(a, b);
        assert_eq!(kw.len(), 1);
        assert_eq!(a.name(), "init-value");
        assert_eq!(a.to_string(), ":init-value");
        assert_eq!(kw.get("init-value"), Some(a));
        assert_eq!(kw.get("missing"), None);
    }

    #[test]
    fn test_find_keyword() {
        let mut kw = table();
        let x = kw.intern("x");
        let y = kw.intern("y");
        let z = kw.intern("z");
        let plist = Value::list([x.into(), Value::Int(1), y.into(), Value::Int(2)]);

        assert_eq!(find_keyword(y, &plist), Ok(Some(Value::Int(2))));
        assert_eq!(find_keyword(z, &plist), Ok(None));
        assert_eq!(find_keyword(z, &Value::Nil), Ok(None));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut kw = table();
        let x = kw.intern("x");
        let plist = Value::list([x.into(), Value::Int(1), x.into(), Value::Int(2)]);
        assert_eq!(find_keyword(x, &plist), Ok(Some(Value::Int(1))));
    }

    #[test]
    fn test_incomplete_key_list() {
        let mut kw = table();
        let x = kw.intern("x");
        let y = kw.intern("y");
        let plist = Value::list([x.into(), Value::Int(1), y.into()]);

        assert!(matches!(
            find_keyword(y, &plist),
            Err(Error::OddKeywordList { .. })
        ));
        assert!(check_even(&plist).is_err());
        assert!(check_even(&Value::Nil).is_ok());
    }

    #[test]
    fn test_get_keyword_fallbacks() {
        let mut kw = table();
        let x = kw.intern("x");

        assert_eq!(get_keyword(x, &Value::Nil, Value::Bool(false)), Ok(Value::Bool(false)));
        assert_eq!(
            get_keyword(x, &Value::Nil, Value::Unbound),
            Err(Error::MissingKeyword {
                keyword: ":x".into()
            })
        );
    }
}
