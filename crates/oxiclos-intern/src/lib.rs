//! Name interning for the `OxiCLOS` runtime.
//!
//! Class names, slot names, generic names and keywords are interned once and
//! then compared by id. Interned names live as long as the process, which
//! matches the lifetime of runtime metadata.
//!

pub mod interner;
pub mod symbol;

pub use interner::Interner;
pub use symbol::Symbol;
