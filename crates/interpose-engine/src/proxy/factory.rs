//! Proxy instance creation

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::proxy::error::ProxyError;
use crate::proxy::router::{HandlerRef, PassThroughHandler};
use crate::vm::{Class, Object, ObjectRef, Value};

/// Ways to bring a generated-type instance to life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantiationStrategy {
    /// Allocate without running any initializer, then install the handler
    BypassInitializer,
    /// Run the generated handler-accepting initializer
    InvokeInitializer,
}

impl fmt::Display for InstantiationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstantiationStrategy::BypassInitializer => f.write_str("bypass-initializer"),
            InstantiationStrategy::InvokeInitializer => f.write_str("invoke-initializer"),
        }
    }
}

/// Which strategies to try
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StrategyPreference {
    /// Bypass first, then invoke
    #[default]
    Auto,
    /// Exactly one strategy
    Only(InstantiationStrategy),
}

impl StrategyPreference {
    fn strategies(self) -> &'static [InstantiationStrategy] {
        match self {
            StrategyPreference::Auto => &[
                InstantiationStrategy::BypassInitializer,
                InstantiationStrategy::InvokeInitializer,
            ],
            StrategyPreference::Only(InstantiationStrategy::BypassInitializer) => {
                &[InstantiationStrategy::BypassInitializer]
            }
            StrategyPreference::Only(InstantiationStrategy::InvokeInitializer) => {
                &[InstantiationStrategy::InvokeInitializer]
            }
        }
    }
}

/// Creates instances of generated proxy types
#[derive(Debug, Clone)]
pub struct InstanceFactory {
    allow_raw_allocation: bool,
}

impl InstanceFactory {
    /// Factory; `allow_raw_allocation` enables the bypass strategy
    pub fn new(allow_raw_allocation: bool) -> Self {
        Self {
            allow_raw_allocation,
        }
    }

    /// Instantiate `generated` with `handler` installed (pass-through when `None`)
    pub fn new_instance(
        &self,
        generated: &Arc<Class>,
        handler: Option<HandlerRef>,
        preference: StrategyPreference,
    ) -> Result<ObjectRef, ProxyError> {
        if generated.proxy_info().is_none() {
            return Err(ProxyError::NotAProxyType {
                name: generated.name().to_string(),
            });
        }

        let mut attempts = Vec::new();
        let strategies = preference.strategies();
        for (i, strategy) in strategies.iter().enumerate() {
            match self.attempt(*strategy, generated, handler.clone()) {
                Ok(instance) => {
                    debug!(proxy_type = %generated.name(), %strategy, "instantiated proxy");
                    return Ok(instance);
                }
                Err(reason) => {
                    if i + 1 < strategies.len() {
                        warn!(proxy_type = %generated.name(), %strategy, %reason, "instantiation failed, trying fallback");
                    }
                    attempts.push(format!("{}: {}", strategy, reason));
                }
            }
        }
        Err(ProxyError::Instantiation {
            type_name: generated.name().to_string(),
            attempts,
        })
    }

    fn attempt(
        &self,
        strategy: InstantiationStrategy,
        generated: &Arc<Class>,
        handler: Option<HandlerRef>,
    ) -> Result<ObjectRef, String> {
        match strategy {
            InstantiationStrategy::BypassInitializer => {
                if !self.allow_raw_allocation {
                    return Err("allocation without construction is disabled".to_string());
                }
                let slot = generated
                    .proxy_info()
                    .and_then(|info| generated.field_index(&info.handler_slot))
                    .ok_or_else(|| "generated type has no handler slot".to_string())?;
                let handler = handler.unwrap_or_else(|| Arc::new(PassThroughHandler));
                let instance = Object::allocate(generated);
                instance
                    .set_field_at(slot, Value::Handler(handler))
                    .map_err(|f| f.to_string())?;
                Ok(instance)
            }
            InstantiationStrategy::InvokeInitializer => {
                if generated.initializers().is_empty() {
                    let origin = generated
                        .proxy_info()
                        .map(|info| info.origin.name().to_string())
                        .unwrap_or_else(|| generated.name().to_string());
                    return Err(format!(
                        "no accessible initializer of {} to delegate to",
                        origin
                    ));
                }
                let args: Vec<Value> = handler.map(Value::Handler).into_iter().collect();
                Object::construct(generated, &args).map_err(|f| f.to_string())
            }
        }
    }
}

impl Default for InstanceFactory {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::router::OperationId;
    use crate::vm::{ClassBuilder, Failure, FieldDef, InitializerDef, TypeRef, Visibility};

    fn generated(origin: &Arc<Class>, with_inits: bool) -> Arc<Class> {
        let mut builder = ClassBuilder::new("demo.Plain$$Intercepted")
            .extends(origin)
            .field(FieldDef::new("handler", TypeRef::Handler).visibility(Visibility::Private))
            .proxy_of(origin, "handler");
        if with_inits {
            builder = builder
                .initializer(InitializerDef::new().body(|this, _| {
                    this.set_field("handler", Value::Handler(Arc::new(PassThroughHandler)))?;
                    Ok(Value::Null)
                }))
                .initializer(InitializerDef::new().param(TypeRef::Handler).body(|this, args| {
                    this.set_field("handler", args[0].clone())?;
                    Ok(Value::Null)
                }));
        }
        builder.build()
    }

    fn noop() -> HandlerRef {
        Arc::new(|_: &ObjectRef, _: &OperationId, _: &[Value]| -> Result<Value, Failure> {
            Ok(Value::Null)
        })
    }

    #[test]
    fn test_bypass_installs_handler() {
        let origin = ClassBuilder::new("demo.Plain").build();
        let class = generated(&origin, false);
        let handler = noop();
        let instance = InstanceFactory::default()
            .new_instance(&class, Some(handler.clone()), StrategyPreference::Auto)
            .unwrap();
        assert_eq!(instance.get_field("handler").unwrap(), Value::Handler(handler));
    }

    #[test]
    fn test_fallback_to_initializer() {
        let origin = ClassBuilder::new("demo.Plain").build();
        let class = generated(&origin, true);
        let instance = InstanceFactory::new(false)
            .new_instance(&class, Some(noop()), StrategyPreference::Auto)
            .unwrap();
        assert!(matches!(instance.get_field("handler").unwrap(), Value::Handler(_)));
    }

    #[test]
    fn test_all_strategies_fail() {
        let origin = ClassBuilder::new("demo.Plain").build();
        let class = generated(&origin, false);
        let err = InstanceFactory::new(false)
            .new_instance(&class, Some(noop()), StrategyPreference::Auto)
            .unwrap_err();
        match err {
            ProxyError::Instantiation { attempts, .. } => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("bypass-initializer:"));
                assert!(attempts[1].starts_with("invoke-initializer:"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invoke_needs_generated_initializer() {
        let origin = ClassBuilder::new("demo.Plain").build();
        let class = generated(&origin, false);
        let err = InstanceFactory::new(true)
            .new_instance(
                &class,
                None,
                StrategyPreference::Only(InstantiationStrategy::InvokeInitializer),
            )
            .unwrap_err();
        match err {
            ProxyError::Instantiation { attempts, .. } => assert_eq!(
                attempts,
                vec!["invoke-initializer: no accessible initializer of demo.Plain to delegate to"
                    .to_string()]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_ordinary_class() {
        let plain = ClassBuilder::new("demo.Plain").build();
        let err = InstanceFactory::default()
            .new_instance(&plain, None, StrategyPreference::Auto)
            .unwrap_err();
        assert!(matches!(err, ProxyError::NotAProxyType { .. }));
    }
}
