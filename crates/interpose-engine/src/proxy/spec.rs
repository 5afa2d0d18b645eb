//! Proxy specifications
//!
//! A [`ProxySpecification`] is everything needed to render a derived proxy
//! type for one originating class: the operations to override (each paired
//! with the ancestor that declares it), the initializer to delegate to, the
//! handler field name and the types the rendered unit depends on.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::proxy::error::ProxyError;
use crate::proxy::options::ProxyOptions;
use crate::vm::reflect::{
    ancestor_chain, choose_handler_slot, select_initializer, validate_target, EligibilityFilter,
};
use crate::vm::{Class, Initializer, Method, TypeRef, Visibility};

/// Suffix appended to the originating class's full name
pub const GENERATED_SUFFIX: &str = "$$Intercepted";

/// An operation to override and the class declaring its real implementation
#[derive(Debug, Clone)]
pub struct ProxyOperation {
    /// The overridden method
    pub method: Arc<Method>,
    /// Class declaring `method`
    pub origin: Arc<Class>,
}

/// Resolved description of a proxy type
#[derive(Debug, Clone)]
pub struct ProxySpecification {
    origin: Arc<Class>,
    initializer: Option<Arc<Initializer>>,
    handler_slot: String,
    operations: Vec<ProxyOperation>,
    dependencies: Vec<Arc<Class>>,
    unique_name: String,
}

impl ProxySpecification {
    /// Validate `class` and resolve its proxy specification
    pub fn build(class: &Arc<Class>, options: &ProxyOptions) -> Result<Self, ProxyError> {
        validate_target(class)?;

        let chain = ancestor_chain(class);
        let operations: Vec<ProxyOperation> = EligibilityFilter::eligible_operations(class)
            .into_iter()
            .filter_map(|method| {
                let origin = chain
                    .iter()
                    .find(|c| c.name() == method.signature.declaring_type)?
                    .clone();
                Some(ProxyOperation { method, origin })
            })
            .collect();

        let mut dependencies: BTreeMap<String, Arc<Class>> = BTreeMap::new();
        dependencies.insert(class.name().to_string(), class.clone());
        for op in &operations {
            dependencies
                .entry(op.origin.name().to_string())
                .or_insert_with(|| op.origin.clone());
        }

        let spec = Self {
            origin: class.clone(),
            initializer: select_initializer(class),
            handler_slot: choose_handler_slot(class, &options.handler_slot),
            operations,
            dependencies: dependencies.into_values().collect(),
            unique_name: Self::unique_name_for(class),
        };
        debug!(
            target_type = %class.name(),
            operations = spec.operations.len(),
            slot = %spec.handler_slot,
            "built proxy specification"
        );
        Ok(spec)
    }

    /// Deterministic generated-type name for `class`
    pub fn unique_name_for(class: &Class) -> String {
        format!("{}{}", class.name(), GENERATED_SUFFIX)
    }

    /// Originating class
    pub fn origin(&self) -> &Arc<Class> {
        &self.origin
    }

    /// Initializer the generated initializers delegate to
    pub fn initializer(&self) -> Option<&Arc<Initializer>> {
        self.initializer.as_ref()
    }

    /// Handler field name
    pub fn handler_slot(&self) -> &str {
        &self.handler_slot
    }

    /// Operations to override, most-derived first
    pub fn operations(&self) -> &[ProxyOperation] {
        &self.operations
    }

    /// Referenced classes, ordered by name
    pub fn dependencies(&self) -> &[Arc<Class>] {
        &self.dependencies
    }

    /// Generated type name
    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    /// Serializable view for tooling
    pub fn summary(&self) -> SpecSummary {
        SpecSummary {
            origin: self.origin.name().to_string(),
            unique_name: self.unique_name.clone(),
            handler_slot: self.handler_slot.clone(),
            initializer: self.initializer.as_ref().map(|init| InitializerSummary {
                index: init.index,
                params: init.params.clone(),
            }),
            operations: self
                .operations
                .iter()
                .map(|op| {
                    let sig = &op.method.signature;
                    OperationSummary {
                        name: sig.name.clone(),
                        params: sig.params.clone(),
                        return_type: sig.return_type.clone(),
                        throws: sig.throws.iter().map(|k| k.name().to_string()).collect(),
                        declared_in: op.origin.name().to_string(),
                        visibility: sig.visibility,
                        variadic: sig.variadic,
                    }
                })
                .collect(),
            dependencies: self
                .dependencies
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        }
    }
}

/// Serializable summary of a [`ProxySpecification`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecSummary {
    /// Originating class
    pub origin: String,
    /// Generated type name
    pub unique_name: String,
    /// Handler field name
    pub handler_slot: String,
    /// Delegated initializer
    pub initializer: Option<InitializerSummary>,
    /// Overridden operations
    pub operations: Vec<OperationSummary>,
    /// Referenced classes
    pub dependencies: Vec<String>,
}

/// Serializable initializer reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitializerSummary {
    /// Declaration index in the originating class
    pub index: usize,
    /// Parameter types
    pub params: Vec<TypeRef>,
}

/// Serializable operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    /// Operation name
    pub name: String,
    /// Parameter types
    pub params: Vec<TypeRef>,
    /// Return type
    pub return_type: TypeRef,
    /// Declared failure kinds
    pub throws: Vec<String>,
    /// Declaring class
    pub declared_in: String,
    /// Visibility
    pub visibility: Visibility,
    /// Variadic flag
    pub variadic: bool,
}
