//! Intercepting proxies
//!
//! The pipeline for a derived-type proxy is
//!
//! ```text
//! validate ─▶ introspect ─▶ filter ─▶ ProxySpecification ─▶ Synthesizer
//!          ─▶ CompilationService ─▶ TypeCache ─▶ InstanceFactory
//! ```
//!
//! [`ProxyFactory`] wires these together around one cache and one compiler.

mod cache;
mod error;
mod factory;
mod interface;
mod options;
pub mod router;
mod spec;
mod synth;

pub use cache::{GeneratedTypeRecord, TypeCache};
pub use error::{ConfigError, ProxyError};
pub use factory::{InstanceFactory, InstantiationStrategy, StrategyPreference};
pub use interface::{InterfaceProxyBuilder, CAPABILITY_SUFFIX};
pub use options::{InstantiationMode, ProxyOptions};
pub use router::{
    BoundHandler, CallPhase, ForwardingHandler, HandlerRef, InvocationHandler, OperationId,
    PassThroughHandler,
};
pub use spec::{
    InitializerSummary, OperationSummary, ProxyOperation, ProxySpecification, SpecSummary,
    GENERATED_SUFFIX,
};
pub use synth::{default_literal, RenderedUnit, Synthesizer};

use std::sync::Arc;

use tracing::debug;

use crate::compiler::{CompilationService, InProcessCompiler};
use crate::vm::{Class, ObjectRef};

/// Generates, caches and instantiates proxy types
pub struct ProxyFactory {
    options: ProxyOptions,
    compiler: Arc<dyn CompilationService>,
    synthesizer: Synthesizer,
    derived: TypeCache,
    capability: TypeCache,
    instances: InstanceFactory,
}

impl ProxyFactory {
    /// Factory backed by a fresh in-process compiler
    pub fn new(options: ProxyOptions) -> Result<Self, ProxyError> {
        Self::with_compiler(options, Arc::new(InProcessCompiler::new()))
    }

    /// Factory backed by `compiler`
    pub fn with_compiler(
        options: ProxyOptions,
        compiler: Arc<dyn CompilationService>,
    ) -> Result<Self, ProxyError> {
        options.validate()?;
        Ok(Self::assemble(options, compiler))
    }

    /// Factory with default options and an in-process compiler
    pub fn with_defaults() -> Self {
        Self::assemble(ProxyOptions::default(), Arc::new(InProcessCompiler::new()))
    }

    fn assemble(options: ProxyOptions, compiler: Arc<dyn CompilationService>) -> Self {
        Self {
            instances: InstanceFactory::new(options.allow_raw_allocation),
            options,
            compiler,
            synthesizer: Synthesizer::new(),
            derived: TypeCache::new(),
            capability: TypeCache::new(),
        }
    }

    /// Active options
    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    /// Compilation service
    pub fn compiler(&self) -> &Arc<dyn CompilationService> {
        &self.compiler
    }

    /// Derived-type cache
    pub fn cache(&self) -> &TypeCache {
        &self.derived
    }

    /// Capability-interface cache
    pub fn capability_cache(&self) -> &TypeCache {
        &self.capability
    }

    /// Validate `class` and resolve its specification
    pub fn specification(&self, class: &Arc<Class>) -> Result<ProxySpecification, ProxyError> {
        ProxySpecification::build(class, &self.options)
    }

    /// Render the descriptor for `class` without compiling it
    pub fn render(&self, class: &Arc<Class>) -> Result<RenderedUnit, ProxyError> {
        let spec = self.specification(class)?;
        Ok(self.synthesizer.render(&spec))
    }

    /// Generated derived type for `class`, created on first request
    pub fn generated_type(&self, class: &Arc<Class>) -> Result<Arc<Class>, ProxyError> {
        let record = self.derived.get_or_create(class, || {
            let unit = self.render(class)?;
            debug!(target_type = %class.name(), proxy_type = %unit.unique_name, "compiling proxy type");
            self.compiler
                .compile(&unit.unique_name, &unit)
                .map_err(|source| ProxyError::Compile {
                    name: unit.unique_name.clone(),
                    source,
                })
        })?;
        Ok(record.generated)
    }

    /// Capability-interface proxy type for `class`, created on first request
    pub fn capability_type(&self, class: &Arc<Class>) -> Result<Arc<Class>, ProxyError> {
        let builder = InterfaceProxyBuilder::new(self.options.handler_slot.clone());
        let record = self.capability.get_or_create(class, || builder.build(class))?;
        Ok(record.generated)
    }

    /// Instantiate a generated type with `handler` installed
    pub fn instantiate(
        &self,
        generated: &Arc<Class>,
        handler: Option<HandlerRef>,
    ) -> Result<ObjectRef, ProxyError> {
        self.instances
            .new_instance(generated, handler, self.options.instantiation.preference())
    }

    /// Derived-type proxy instance for `class` with `handler` installed
    pub fn create_proxy(
        &self,
        class: &Arc<Class>,
        handler: Option<HandlerRef>,
    ) -> Result<ObjectRef, ProxyError> {
        let generated = self.generated_type(class)?;
        self.instantiate(&generated, handler)
    }

    /// Capability-interface proxy instance for `class` with `handler` installed
    pub fn create_capability_proxy(
        &self,
        class: &Arc<Class>,
        handler: HandlerRef,
    ) -> Result<ObjectRef, ProxyError> {
        let generated = self.capability_type(class)?;
        self.instantiate(&generated, Some(handler))
    }
}

impl std::fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("options", &self.options)
            .field("derived", &self.derived.len())
            .field("capability", &self.capability.len())
            .finish()
    }
}
