//! Naming directory for txharness
//!
//! A process-wide, thread-safe, hierarchical name → object registry used to
//! locate the transaction coordinator and other managed singletons, and as
//! a general registry for mock objects:
//! - [`Directory`]: bind/rebind/unbind/lookup/list over a sharded map
//! - [`CompositeName`]: `/`-separated hierarchical names
//! - [`NameParser`]: parses names relative to a root
//!
//! Type-keyed registrations live under [`RESERVED_PREFIX`] and can be
//! cleared without touching string-named bindings.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod directory;
pub mod name;

pub use directory::{Binding, Directory, NameClassPair, RESERVED_PREFIX};
pub use name::{CompositeName, DirectoryName, NameParser, SEPARATOR};
