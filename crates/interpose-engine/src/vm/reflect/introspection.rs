//! Class introspection for proxy generation
//!
//! Walks a target class and its ancestors, picks the initializer a derived
//! type delegates to, and checks whether the class can be extended at all.

use std::sync::Arc;

use crate::proxy::ProxyError;
use crate::vm::class::{Class, Initializer, Method};

/// Every declared method from `class` up through each ancestor, most-derived first
pub fn walk_operations(class: &Class) -> impl Iterator<Item = &Arc<Method>> + '_ {
    class
        .ancestors()
        .flat_map(|ancestor| ancestor.declared_methods().iter())
}

/// Shared handles to `class` and each ancestor, most-derived first
pub fn ancestor_chain(class: &Arc<Class>) -> Vec<Arc<Class>> {
    let mut chain = vec![class.clone()];
    while let Some(parent) = chain.last().and_then(|c| c.parent().cloned()) {
        chain.push(parent);
    }
    chain
}

/// Accessible initializer with the fewest parameters; ties go to declaration order
pub fn select_initializer(class: &Class) -> Option<Arc<Initializer>> {
    class
        .initializers()
        .iter()
        .filter(|init| init.is_accessible())
        .min_by_key(|init| (init.params.len(), init.index))
        .cloned()
}

/// Reject classes a derived type cannot be generated for
pub fn validate_target(class: &Class) -> Result<(), ProxyError> {
    let name = class.name().to_string();
    if class.is_anonymous() {
        return Err(ProxyError::AnonymousType { name });
    }
    if let Some(nesting) = class.nesting() {
        if !nesting.exported {
            return Err(ProxyError::NonExportedNestedType { name });
        }
    }
    if class.is_final() {
        return Err(ProxyError::SealedType { name });
    }
    if class.nesting().is_some() && select_initializer(class).is_none() {
        return Err(ProxyError::NoAccessibleInitializer { name });
    }
    Ok(())
}

/// First of `preferred`, `preferred0`, `preferred1`, … not declared as a field
/// anywhere in the ancestor chain
pub fn choose_handler_slot(class: &Class, preferred: &str) -> String {
    if !class.chain_declares_field(preferred) {
        return preferred.to_string();
    }
    (0u32..)
        .map(|n| format!("{}{}", preferred, n))
        .find(|candidate| !class.chain_declares_field(candidate))
        .unwrap_or_else(|| preferred.to_string())
}
