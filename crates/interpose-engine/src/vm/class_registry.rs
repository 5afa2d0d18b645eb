//! Class registry for loaded types

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::vm::class::{Class, ClassId};

#[derive(Debug, Default)]
struct Tables {
    by_name: FxHashMap<String, Arc<Class>>,
    by_id: FxHashMap<ClassId, Arc<Class>>,
}

/// Thread-safe name/ID to class table
#[derive(Debug, Default)]
pub struct ClassRegistry {
    tables: RwLock<Tables>,
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class, replacing any class previously registered under its name
    pub fn register(&self, class: Arc<Class>) -> ClassId {
        let id = class.id();
        let mut tables = self.tables.write();
        if let Some(previous) = tables.by_name.insert(class.name().to_string(), class.clone()) {
            tables.by_id.remove(&previous.id());
        }
        tables.by_id.insert(id, class);
        id
    }

    /// Get class by ID
    pub fn get(&self, id: ClassId) -> Option<Arc<Class>> {
        self.tables.read().by_id.get(&id).cloned()
    }

    /// Get class by full name
    pub fn get_by_name(&self, name: &str) -> Option<Arc<Class>> {
        self.tables.read().by_name.get(name).cloned()
    }

    /// Whether a class with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tables.read().by_name.contains_key(name)
    }

    /// Remove a class by name
    pub fn remove(&self, name: &str) -> Option<Arc<Class>> {
        let mut tables = self.tables.write();
        let class = tables.by_name.remove(name)?;
        tables.by_id.remove(&class.id());
        Some(class)
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.tables.read().by_name.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered class names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().by_name.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::ClassBuilder;

    #[test]
    fn test_register_and_lookup() {
        let registry = ClassRegistry::new();
        let point = ClassBuilder::new("geo.Point").build();
        let id = registry.register(point.clone());

        assert!(Arc::ptr_eq(&registry.get(id).unwrap(), &point));
        assert!(Arc::ptr_eq(&registry.get_by_name("geo.Point").unwrap(), &point));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reregister_replaces() {
        let registry = ClassRegistry::new();
        let first = ClassBuilder::new("geo.Point").build();
        let second = ClassBuilder::new("geo.Point").build();
        registry.register(first.clone());
        registry.register(second.clone());

        assert_eq!(registry.len(), 1);
        assert!(registry.get(first.id()).is_none());
        assert!(Arc::ptr_eq(&registry.get_by_name("geo.Point").unwrap(), &second));
    }

    #[test]
    fn test_remove_and_names() {
        let registry = ClassRegistry::new();
        registry.register(ClassBuilder::new("b.Two").build());
        registry.register(ClassBuilder::new("a.One").build());
        assert_eq!(registry.names(), vec!["a.One".to_string(), "b.Two".to_string()]);

        assert!(registry.remove("a.One").is_some());
        assert!(!registry.contains("a.One"));
        assert!(registry.remove("a.One").is_none());
    }
}
