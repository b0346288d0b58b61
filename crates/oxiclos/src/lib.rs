//! `OxiCLOS`: a CLOS-style metaobject protocol runtime
//!
//! `OxiCLOS` is the object-system core of a Scheme-family runtime, redesigned
//! around explicit ownership in Rust. It provides:
//!
//! - **Class Metaobjects** with reflective, validated slots
//! - **C3 Linearization** of class precedence lists
//! - **Generic Functions** with multiple dispatch and next-method chains
//! - **Slot Accessors** for boxed, native and virtual slots
//! - **Initialization Protocol** driven by `make`, `allocate-instance` and
//!   `initialize` generics that metaclasses can specialize
//!
//! # Architecture
//!
//! - **Runtime Layer** (`runtime`): the [`Runtime`] context owning the
//!   symbol and keyword tables, the builtin class lattice and the registries
//! - **Metaobject Layer**: [`Class`], [`Generic`], [`Method`] and
//!   [`SlotAccessor`] handles (`Rc` based, single-threaded)
//! - **Value Layer**: the [`Value`] model classified by [`Runtime::class_of`]
//!
//! # Example
//!
//! ```rust
//! use oxiclos::{Runtime, SlotSpec, Value};
//!
//! let rt = Runtime::new();
//! let point = rt
//!     .define_class("<point>", &[], &[
//!         SlotSpec::new("x").init_keyword("x").init_value(Value::Int(0)).build(&rt),
//!     ])
//!     .unwrap();
//!
//! let p = rt.make(&point, &[rt.keyword("x"), Value::Int(5)]).unwrap();
//! assert_eq!(rt.slot_ref(&p, "x").unwrap(), Value::Int(5));
//! assert_eq!(rt.write_to_string(&p).unwrap(), "#<point>");
//! ```

pub mod config;
pub mod error;
pub mod runtime;

// Re-export commonly used types
pub use config::RuntimeConfig;
pub use error::{Error, Result};
pub use runtime::{
    Runtime,
    Value,
    Class, ClassCategory,
    Generic, Method, NextMethod, Fallback,
    SlotAccessor, SlotSpec, SlotStorage,
    Keyword, Procedure, Instance,
};
