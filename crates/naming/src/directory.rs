//! In-memory naming directory
//!
//! Replaces a container's naming service with a DashMap keyed by the
//! normalized name. Every operation is safe to call from any execution
//! context without external locking.
//!
//! # Semantics
//!
//! - `bind` fails if the name exists; concurrent binds of the same name race
//!   and exactly one wins (the check and insert happen under the shard lock)
//! - `rebind` always succeeds, last write wins
//! - `lookup` of an absent name fails with `NameNotFound`
//! - Type-keyed registrations (`put` / `get`) live under [`RESERVED_PREFIX`];
//!   `clear` removes only those
//!
//! Ownership of bound values is not tracked: callers own the lifecycle of
//! what they bind.

use crate::name::{CompositeName, DirectoryName, NameParser, SEPARATOR};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use txharness_core::{Error, Result};

/// Namespace for type-keyed registrations
pub const RESERVED_PREFIX: &str = "mock:";

/// A shared value stored in the directory
pub type BoundObject = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
struct Entry {
    value: BoundObject,
    type_name: &'static str,
}

impl Entry {
    fn new<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: type_name::<T>(),
        }
    }

    fn downcast<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.value
            .clone()
            .downcast::<T>()
            .map_err(|_| Error::WrongType {
                name: name.to_string(),
                expected: type_name::<T>(),
                actual: self.type_name,
            })
    }
}

/// A name and the type of the value bound to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameClassPair {
    /// Full directory name
    pub name: String,
    /// Type name recorded at bind time
    pub class_name: &'static str,
}

/// A name, its value's type and the value
#[derive(Clone)]
pub struct Binding {
    /// Full directory name
    pub name: String,
    /// Type name recorded at bind time
    pub class_name: &'static str,
    /// The bound value
    pub object: BoundObject,
}

impl Binding {
    /// Downcast the bound value
    pub fn object_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.object.clone().downcast::<T>().ok()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .finish_non_exhaustive()
    }
}

/// Thread-safe hierarchical name → object registry
///
/// # Example
///
/// ```ignore
/// let directory = Directory::new();
/// directory.bind("java:/comp/env/limit", Arc::new(10u32))?;
/// let limit: Arc<u32> = directory.lookup_as("java:/comp/env/limit")?;
/// ```
#[derive(Default)]
pub struct Directory {
    entries: DashMap<String, Entry>,
}

impl Directory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of bindings, including type-keyed ones
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ========================================================================
    // Named bindings
    // ========================================================================

    /// Bind `value` to `name`
    ///
    /// Fails with `NameAlreadyBound` if the name exists.
    pub fn bind<N, T>(&self, name: &N, value: Arc<T>) -> Result<()>
    where
        N: DirectoryName + ?Sized,
        T: Any + Send + Sync,
    {
        let key = checked_key(name)?;
        match self.entries.entry(key) {
            MapEntry::Occupied(occupied) => Err(Error::NameAlreadyBound {
                name: occupied.key().clone(),
            }),
            MapEntry::Vacant(vacant) => {
                tracing::trace!(name = %vacant.key(), "bind");
                vacant.insert(Entry::new(value));
                Ok(())
            }
        }
    }

    /// Bind `value` to `name`, replacing any existing binding
    pub fn rebind<N, T>(&self, name: &N, value: Arc<T>) -> Result<()>
    where
        N: DirectoryName + ?Sized,
        T: Any + Send + Sync,
    {
        let key = checked_key(name)?;
        tracing::trace!(name = %key, "rebind");
        self.entries.insert(key, Entry::new(value));
        Ok(())
    }

    /// Remove the binding for `name`
    ///
    /// Returns whether a binding was removed. Unbinding an absent name is
    /// not an error.
    pub fn unbind<N: DirectoryName + ?Sized>(&self, name: &N) -> bool {
        let key = name.to_key();
        tracing::trace!(name = %key, "unbind");
        self.entries.remove(&key).is_some()
    }

    /// Look up the value bound to `name`
    pub fn lookup<N: DirectoryName + ?Sized>(&self, name: &N) -> Result<BoundObject> {
        let key = name.to_key();
        self.entries
            .get(&key)
            .map(|entry| entry.value.clone())
            .ok_or(Error::NameNotFound { name: key })
    }

    /// Look up the value bound to `name` as a `T`
    ///
    /// Fails with `WrongType` if the value is of another type.
    pub fn lookup_as<N, T>(&self, name: &N) -> Result<Arc<T>>
    where
        N: DirectoryName + ?Sized,
        T: Any + Send + Sync,
    {
        let key = name.to_key();
        match self.entries.get(&key) {
            Some(entry) => entry.downcast(&key),
            None => Err(Error::NameNotFound { name: key }),
        }
    }

    /// Typed lookup that never fails: `None` if absent or of another type
    pub fn get_bound<N, T>(&self, name: &N) -> Option<Arc<T>>
    where
        N: DirectoryName + ?Sized,
        T: Any + Send + Sync,
    {
        self.lookup_as(name).ok()
    }

    /// Look up `name`, binding the value built by `create` if it is absent
    ///
    /// Atomic with respect to other callers: `create` runs at most once per
    /// absent name. `create` must not call back into this directory.
    pub fn get_or_bind_with<N, T, F>(&self, name: &N, create: F) -> Result<Arc<T>>
    where
        N: DirectoryName + ?Sized,
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let key = checked_key(name)?;
        match self.entries.entry(key) {
            MapEntry::Occupied(occupied) => occupied.get().downcast(occupied.key()),
            MapEntry::Vacant(vacant) => {
                tracing::debug!(name = %vacant.key(), "binding new singleton");
                let value = Arc::new(create());
                vacant.insert(Entry::new(value.clone()));
                Ok(value)
            }
        }
    }

    /// Check if `name` is bound
    pub fn contains<N: DirectoryName + ?Sized>(&self, name: &N) -> bool {
        self.entries.contains_key(&name.to_key())
    }

    /// Move the binding at `old_name` to `new_name`
    ///
    /// Fails with `NameNotFound` if `old_name` is not bound. An existing
    /// binding at `new_name` is replaced, including one bound concurrently
    /// while the rename runs.
    ///
    /// The move is not atomic across the two names: a concurrent lookup may
    /// briefly find neither of them.
    pub fn rename<N, M>(&self, old_name: &N, new_name: &M) -> Result<()>
    where
        N: DirectoryName + ?Sized,
        M: DirectoryName + ?Sized,
    {
        let old_key = old_name.to_key();
        let new_key = checked_key(new_name)?;
        let (_, entry) = self
            .entries
            .remove(&old_key)
            .ok_or_else(|| Error::NameNotFound {
                name: old_key.clone(),
            })?;
        tracing::trace!(from = %old_key, to = %new_key, "rename");
        match self.entries.entry(new_key) {
            MapEntry::Occupied(mut occupied) => {
                tracing::debug!(name = %occupied.key(), "rename replaced existing binding");
                occupied.insert(entry);
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
        Ok(())
    }

    /// Names and types bound below `prefix`
    ///
    /// Matches every name starting with `prefix` followed by the separator;
    /// an empty prefix lists everything. Order is unspecified.
    pub fn list<N: DirectoryName + ?Sized>(&self, prefix: &N) -> Vec<NameClassPair> {
        let matcher = child_prefix(prefix);
        self.entries
            .iter()
            .filter(|e| e.key().starts_with(&matcher))
            .map(|e| NameClassPair {
                name: e.key().clone(),
                class_name: e.value().type_name,
            })
            .collect()
    }

    /// Bindings below `prefix`, with their values
    pub fn list_bindings<N: DirectoryName + ?Sized>(&self, prefix: &N) -> Vec<Binding> {
        let matcher = child_prefix(prefix);
        self.entries
            .iter()
            .filter(|e| e.key().starts_with(&matcher))
            .map(|e| Binding {
                name: e.key().clone(),
                class_name: e.value().type_name,
                object: e.value().value.clone(),
            })
            .collect()
    }

    /// Parser for names below `root`
    pub fn name_parser(&self, root: &str) -> NameParser {
        NameParser::new(root)
    }

    /// `prefix` followed by `name`
    pub fn compose_name(&self, name: &CompositeName, prefix: &CompositeName) -> CompositeName {
        name.compose(prefix)
    }

    // ========================================================================
    // Type-keyed registrations
    // ========================================================================

    /// Register `value` under its type
    ///
    /// The key is derived from [`std::any::type_name`], which is not
    /// guaranteed unique: two distinct types with the same name share one
    /// registration, and [`get`](Self::get) through the other type returns
    /// `None`.
    pub fn put<T: Any + Send + Sync>(&self, value: Arc<T>) {
        let key = type_key::<T>();
        tracing::trace!(name = %key, "put");
        self.entries.insert(key, Entry::new(value));
    }

    /// The value registered under type `T`
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let key = type_key::<T>();
        self.entries.get(&key).and_then(|e| e.downcast(&key).ok())
    }

    /// Check if a value is registered under type `T`
    pub fn contains_type<T: Any + Send + Sync>(&self) -> bool {
        self.entries.contains_key(&type_key::<T>())
    }

    /// Remove every type-keyed registration
    ///
    /// String-named bindings are untouched. Returns how many entries were
    /// removed.
    pub fn clear(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            let reserved = key.starts_with(RESERVED_PREFIX);
            if reserved {
                removed += 1;
            }
            !reserved
        });
        tracing::debug!(removed, "cleared reserved namespace");
        removed
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn type_key<T: Any>() -> String {
    format!("{}{}", RESERVED_PREFIX, type_name::<T>())
}

fn checked_key<N: DirectoryName + ?Sized>(name: &N) -> Result<String> {
    let key = name.to_key();
    if key.is_empty() {
        return Err(Error::InvalidName {
            name: key,
            reason: "empty name".to_string(),
        });
    }
    Ok(key)
}

fn child_prefix<N: DirectoryName + ?Sized>(prefix: &N) -> String {
    let key = prefix.to_key();
    if key.is_empty() {
        key
    } else {
        key + SEPARATOR
    }
}
