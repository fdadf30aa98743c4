//! Schema Registry (C3): thread-safe registry keyed by record type and by
//! table name, lazy registration, `TableMetadata` storage (spec.md §4.3).

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::schema::TableMetadata;

/// Something that can describe its own database table shape. Implemented by
/// `#[derive(Table)]` (see `pebble-macros`), or constructed by hand for the
/// AST-parsing registration path (spec.md §9).
pub trait Table: 'static {
    /// Builds this type's canonical table metadata. Called at most once per
    /// registry per type; the result is cached.
    fn table_metadata() -> TableMetadata;
}

#[derive(Default)]
struct Inner {
    by_type: HashMap<TypeId, Arc<TableMetadata>>,
    by_name: HashMap<String, Arc<TableMetadata>>,
}

/// Thread-safe registry of `TableMetadata`, append-only during steady state.
///
/// Reads take a shared lock; writes (`register`, `clear`) take an exclusive
/// lock. `TableMetadata` values are immutable after publication (spec.md
/// §5): callers receive `Arc<TableMetadata>` and must not attempt to mutate
/// the contents in place.
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Registers `T`. A second registration of the same type is a no-op
    /// (idempotent registration, spec.md §4.3).
    pub fn register<T: Table>(&self) -> Arc<TableMetadata> {
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.inner.read().by_type.get(&type_id) {
            return existing.clone();
        }
        let metadata = Arc::new(T::table_metadata());
        let mut inner = self.inner.write();
        // Re-check under the write lock in case of a race between readers.
        if let Some(existing) = inner.by_type.get(&type_id) {
            return existing.clone();
        }
        inner.by_type.insert(type_id, metadata.clone());
        inner.by_name.insert(metadata.name.clone(), metadata.clone());
        metadata
    }

    /// Registers metadata built out-of-band (e.g. by an AST-parsing front
    /// end that has no host `TypeId` to key on), keyed only by table name.
    pub fn register_metadata(&self, metadata: TableMetadata) -> Arc<TableMetadata> {
        let metadata = Arc::new(metadata);
        let mut inner = self.inner.write();
        inner.by_name.insert(metadata.name.clone(), metadata.clone());
        metadata
    }

    pub fn get<T: Table>(&self) -> Option<Arc<TableMetadata>> {
        self.inner.read().by_type.get(&TypeId::of::<T>()).cloned()
    }

    /// Registers `T` lazily if absent, then returns its metadata.
    pub fn get_or_register<T: Table>(&self) -> Arc<TableMetadata> {
        if let Some(existing) = self.get::<T>() {
            return existing;
        }
        self.register::<T>()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<TableMetadata>> {
        self.inner.read().by_name.get(name).cloned()
    }

    pub fn has<T: Table>(&self) -> bool {
        self.inner.read().by_type.contains_key(&TypeId::of::<T>())
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }

    pub fn all(&self) -> Vec<Arc<TableMetadata>> {
        self.inner.read().by_type.values().cloned().collect()
    }

    pub fn all_tables(&self) -> Vec<Arc<TableMetadata>> {
        self.inner.read().by_name.values().cloned().collect()
    }

    /// Drops all registrations. Provided for test isolation (spec.md §4.3);
    /// not meant to be called in steady-state operation.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.by_type.clear();
        inner.by_name.clear();
    }
}

/// The process-wide default registry (spec.md §4.3, §9). Optional: callers
/// seeking hermetic tests should construct their own `Registry` instead.
static DEFAULT_REGISTRY: once_cell::sync::Lazy<Registry> = once_cell::sync::Lazy::new(Registry::new);

pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableMetadata;

    struct Widget;
    impl Table for Widget {
        fn table_metadata() -> TableMetadata {
            TableMetadata::new("widgets")
        }
    }

    #[test]
    fn register_is_idempotent() {
        let reg = Registry::new();
        let a = reg.register::<Widget>();
        let b = reg.register::<Widget>();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.all().len(), 1);
    }

    #[test]
    fn lookup_by_name() {
        let reg = Registry::new();
        reg.register::<Widget>();
        assert!(reg.get_by_name("widgets").is_some());
        assert!(reg.get_by_name("missing").is_none());
    }

    #[test]
    fn clear_resets_registry() {
        let reg = Registry::new();
        reg.register::<Widget>();
        reg.clear();
        assert!(!reg.has::<Widget>());
        assert!(reg.all().is_empty());
    }
}
