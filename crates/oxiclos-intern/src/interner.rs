//! String interning with id-based references.
//!
//! # Design
//!
//! The interner maintains two structures:
//! - `strings`: id → `&'static str` (resolving ids back to text)
//! - `symbols`: `&'static str` → `Symbol` (interning)
//!
//! Each distinct name is leaked once into a `'static` string. Interned names
//! are runtime metadata (class, slot and keyword names) and are never freed
//! before the process exits.
//!
//! # Examples
//!
//! ```
//! use oxiclos_intern::Interner;
//!
//! let mut interner = Interner::new();
//!
//! let x = interner.intern("x");
//! let y = interner.intern("y");
//!
//! assert_ne!(x, y);
//! assert_eq!(interner.resolve(x.as_u32()), Some(x));
//! assert_eq!(interner.get("y"), Some(y));
//! assert_eq!(interner.get("z"), None);
//! ```

use hashbrown::HashMap;

use crate::symbol::Symbol;

/// Bidirectional name table.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<&'static str>,
    symbols: HashMap<&'static str, Symbol>,
}

impl Interner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty interner sized for `capacity` names.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            strings: Vec::with_capacity(capacity),
            symbols: HashMap::with_capacity(capacity),
        }
    }

    /// Interns `s`, returning the existing symbol when `s` was seen before.
    ///
    /// # Examples
    ///
    /// ```
    /// use oxiclos_intern::Interner;
    ///
    /// let mut interner = Interner::new();
    /// let a = interner.intern("init-keyword");
    /// assert_eq!(interner.intern("init-keyword"), a);
    /// assert_eq!(interner.len(), 1);
    /// ```
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.symbols.get(s) {
            return sym;
        }

        #[allow(clippy::cast_possible_truncation)]
        let id = self.strings.len() as u32;
        let name: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let sym = Symbol::new(id, name);

        self.strings.push(name);
        self.symbols.insert(name, sym);
        sym
    }

    /// Looks up `s` without interning it.
    #[must_use]
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.symbols.get(s).copied()
    }

    /// Resolves a raw id back to its symbol.
    #[must_use]
    pub fn resolve(&self, id: u32) -> Option<Symbol> {
        self.strings
            .get(id as usize)
            .map(|&name| Symbol::new(id, name))
    }

    /// Returns the number of interned names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns true if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterates over all interned symbols in id order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.strings.iter().enumerate().map(|(id, &name)| {
            #[allow(clippy::cast_possible_truncation)]
            Symbol::new(id as u32, name)
        })
    }
}
