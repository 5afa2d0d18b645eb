//! Choosing between derived-type and capability-interface proxies.

use std::fmt;

use dashmap::DashMap;
use interpose_engine::proxy::InterfaceProxyBuilder;
use interpose_engine::vm::ClassId;
use interpose_engine::Class;
use tracing::debug;

/// How a proxy is built for a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyStrategy {
    /// Synthesized and compiled subclass of the target class
    DerivedType,
    /// Built-in type implementing the target's interfaces
    CapabilityInterface,
}

impl fmt::Display for ProxyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyStrategy::DerivedType => write!(f, "derived-type"),
            ProxyStrategy::CapabilityInterface => write!(f, "capability-interface"),
        }
    }
}

/// Classes registered to always receive derived-type proxies
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    forced: DashMap<ClassId, String>,
}

impl StrategyRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the derived-type strategy for `class`
    pub fn always_use_derived_type_for(&self, class: &Class) {
        debug!(target_type = %class.name(), "forcing derived-type proxies");
        self.forced.insert(class.id(), class.name().to_string());
    }

    /// Whether `class` was registered
    pub fn is_forced(&self, class: &Class) -> bool {
        self.forced.contains_key(&class.id())
    }

    /// Drop the registration for `class`; returns whether one existed
    pub fn forget(&self, class: &Class) -> bool {
        self.forced.remove(&class.id()).is_some()
    }

    /// Names of every registered class, sorted
    pub fn forced_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.forced.iter().map(|e| e.value().clone()).collect();
        names.sort();
        names
    }

    /// Strategy for `class`: capability interfaces when it has any and is not forced
    pub fn select(&self, class: &Class) -> ProxyStrategy {
        let strategy = if !self.is_forced(class)
            && !InterfaceProxyBuilder::interfaces_of(class).is_empty()
        {
            ProxyStrategy::CapabilityInterface
        } else {
            ProxyStrategy::DerivedType
        };
        debug!(target_type = %class.name(), %strategy, "selected proxy strategy");
        strategy
    }
}
