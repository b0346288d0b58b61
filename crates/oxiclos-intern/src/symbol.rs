//! Interned name handle.
//!
//! A `Symbol` pairs the interner-assigned id with the interned text. Equality,
//! ordering and hashing look only at the id, so two symbols are equal exactly
//! when they came from the same `intern` call site string in the same
//! interner.
//!
//! # Examples
//!
//! ```
//! use oxiclos_intern::Interner;
//!
//! let mut interner = Interner::new();
//! let a = interner.intern("point");
//! let b = interner.intern("point");
//!
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "point");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An interned name.
///
/// Copyable and two words wide. The text is reachable without going back to
/// the interner, which keeps printing and error reporting free of lookups.
#[derive(Clone, Copy)]
pub struct Symbol {
    id: u32,
    name: &'static str,
}

impl Symbol {
    pub(crate) const fn new(id: u32, name: &'static str) -> Self {
        Self { id, name }
    }

    /// Returns the raw id assigned by the interner.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.id
    }

    /// Returns the raw id as an index.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.id as usize
    }

    /// Returns the interned text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.name
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({}, {:?})", self.id, self.name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.name
    }
}
