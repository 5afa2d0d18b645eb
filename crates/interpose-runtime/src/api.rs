//! Proxy request API
//!
//! [`Interposer`] owns a [`ProxyFactory`] and a [`StrategyRegistry`]; the free
//! functions of this crate delegate to a process-wide default instance.

use std::sync::Arc;

use interpose_engine::proxy::{
    BoundHandler, ForwardingHandler, HandlerRef, ProxyError, ProxyFactory, ProxyOptions,
};
use interpose_engine::{Class, Failure, FailureKind, ObjectRef};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::strategy::{ProxyStrategy, StrategyRegistry};
use crate::verify::{ExpectFailure, ResultVerifier, VerifyingHandler};

/// Creates intercepting proxies for target objects
#[derive(Debug)]
pub struct Interposer {
    factory: ProxyFactory,
    strategies: StrategyRegistry,
}

impl Interposer {
    /// Interposer with its own factory configured by `options`
    pub fn new(options: ProxyOptions) -> Result<Self, ProxyError> {
        Ok(Self::with_factory(ProxyFactory::new(options)?))
    }

    /// Interposer around an existing factory
    pub fn with_factory(factory: ProxyFactory) -> Self {
        Self {
            factory,
            strategies: StrategyRegistry::new(),
        }
    }

    /// Interposer with default options
    pub fn with_defaults() -> Self {
        Self::with_factory(ProxyFactory::with_defaults())
    }

    /// The proxy factory
    pub fn factory(&self) -> &ProxyFactory {
        &self.factory
    }

    /// The strategy registry
    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// Force derived-type proxies for `class` even when it implements interfaces
    pub fn always_use_derived_type_proxy_for(&self, class: &Class) {
        self.strategies.always_use_derived_type_for(class);
    }

    /// Proxy for `target` routing every call to `handler`
    ///
    /// The handler receives `target` as the instance it is called on.
    pub fn create_intercepting_proxy(
        &self,
        target: &ObjectRef,
        handler: HandlerRef,
    ) -> Result<ObjectRef, ProxyError> {
        let bound: HandlerRef = Arc::new(BoundHandler::new(target.clone(), handler));
        self.install(target, bound)
    }

    /// Proxy for `target` that asserts every call raises a failure of `kind`
    pub fn expect_failure_kind(
        &self,
        kind: FailureKind,
        target: &ObjectRef,
    ) -> Result<ObjectRef, ProxyError> {
        self.create_verifying_proxy(target, ExpectFailure::kind(kind))
    }

    /// Proxy for `target` that asserts every call raises `failure` (kind and message)
    pub fn expect_failure(
        &self,
        failure: Failure,
        target: &ObjectRef,
    ) -> Result<ObjectRef, ProxyError> {
        self.create_verifying_proxy(target, ExpectFailure::exact(failure))
    }

    /// Proxy for `target` that asserts every call raises some failure
    pub fn expect_any_failure(&self, target: &ObjectRef) -> Result<ObjectRef, ProxyError> {
        self.create_verifying_proxy(target, ExpectFailure::any())
    }

    /// Proxy for `target` running every call through `verifier`
    pub fn create_verifying_proxy<V>(
        &self,
        target: &ObjectRef,
        verifier: V,
    ) -> Result<ObjectRef, ProxyError>
    where
        V: ResultVerifier + 'static,
    {
        let handler: HandlerRef = Arc::new(VerifyingHandler::new(target.clone(), verifier));
        self.install(target, handler)
    }

    /// Proxy for `target` that forwards every call unchanged
    pub fn create_forwarding_proxy(&self, target: &ObjectRef) -> Result<ObjectRef, ProxyError> {
        let handler: HandlerRef = Arc::new(ForwardingHandler::new(target.clone()));
        self.install(target, handler)
    }

    fn install(&self, target: &ObjectRef, handler: HandlerRef) -> Result<ObjectRef, ProxyError> {
        let class = target.class();
        let strategy = self.strategies.select(class);
        let proxy = match strategy {
            ProxyStrategy::DerivedType => self.factory.create_proxy(class, Some(handler))?,
            ProxyStrategy::CapabilityInterface => {
                self.factory.create_capability_proxy(class, handler)?
            }
        };
        debug!(target_type = %class.name(), proxy_type = %proxy.class().name(), %strategy, "created proxy");
        Ok(proxy)
    }
}

impl Default for Interposer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

static DEFAULT: Lazy<Interposer> = Lazy::new(Interposer::with_defaults);

/// The process-wide default interposer
pub fn interposer() -> &'static Interposer {
    &DEFAULT
}

/// Proxy for `target` routing every call to `handler`, using the default interposer
pub fn create_intercepting_proxy(
    target: &ObjectRef,
    handler: HandlerRef,
) -> Result<ObjectRef, ProxyError> {
    interposer().create_intercepting_proxy(target, handler)
}

/// Proxy asserting a failure of `kind`, using the default interposer
pub fn expect_failure_kind(kind: FailureKind, target: &ObjectRef) -> Result<ObjectRef, ProxyError> {
    interposer().expect_failure_kind(kind, target)
}

/// Proxy asserting exactly `failure`, using the default interposer
pub fn expect_failure(failure: Failure, target: &ObjectRef) -> Result<ObjectRef, ProxyError> {
    interposer().expect_failure(failure, target)
}

/// Proxy asserting any failure, using the default interposer
pub fn expect_any_failure(target: &ObjectRef) -> Result<ObjectRef, ProxyError> {
    interposer().expect_any_failure(target)
}

/// Proxy running every call through `verifier`, using the default interposer
pub fn create_verifying_proxy<V>(target: &ObjectRef, verifier: V) -> Result<ObjectRef, ProxyError>
where
    V: ResultVerifier + 'static,
{
    interposer().create_verifying_proxy(target, verifier)
}

/// Forwarding proxy for `target`, using the default interposer
pub fn create_forwarding_proxy(target: &ObjectRef) -> Result<ObjectRef, ProxyError> {
    interposer().create_forwarding_proxy(target)
}

/// Force derived-type proxies for `class` in the default interposer
pub fn always_use_derived_type_proxy_for(class: &Class) {
    interposer().always_use_derived_type_proxy_for(class);
}
