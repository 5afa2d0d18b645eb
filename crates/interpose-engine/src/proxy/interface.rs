//! Capability-interface proxies
//!
//! For a class implementing interfaces, a proxy type can be built directly
//! from the interface operations without rendering or compiling anything.
//! The resulting class derives only from the root class, implements every
//! interface of the target's chain and routes each interface operation to
//! its handler.

use std::sync::Arc;

use tracing::debug;

use crate::builtins;
use crate::proxy::error::ProxyError;
use crate::proxy::router::{self, OperationId};
use crate::vm::reflect::choose_handler_slot;
use crate::vm::{
    Class, ClassBuilder, FieldDef, InitializerDef, Interface, MethodDef, TypeRef, Value,
    Visibility,
};

/// Suffix appended to the originating class's full name
pub const CAPABILITY_SUFFIX: &str = "$$Capability";

/// Builds interface-based proxy types
#[derive(Debug, Clone)]
pub struct InterfaceProxyBuilder {
    preferred_slot: String,
}

impl InterfaceProxyBuilder {
    /// Builder using `preferred_slot` as the handler field name
    pub fn new(preferred_slot: impl Into<String>) -> Self {
        Self {
            preferred_slot: preferred_slot.into(),
        }
    }

    /// Every interface implemented anywhere in the chain of `class`, in order
    pub fn interfaces_of(class: &Class) -> Vec<Arc<Interface>> {
        let mut found: Vec<Arc<Interface>> = Vec::new();
        for ancestor in class.ancestors() {
            for iface in ancestor.interfaces() {
                if !found.iter().any(|f| f.name == iface.name) {
                    found.push(iface.clone());
                }
            }
        }
        found
    }

    /// Build the capability proxy type for `class`
    pub fn build(&self, class: &Arc<Class>) -> Result<Arc<Class>, ProxyError> {
        let interfaces = Self::interfaces_of(class);
        if interfaces.is_empty() {
            return Err(ProxyError::NoCapabilityInterfaces {
                name: class.name().to_string(),
            });
        }

        let root = builtins::object_class();
        let slot = choose_handler_slot(&root, &self.preferred_slot);
        let slot_index = root.field_layout().len();

        let mut builder = ClassBuilder::new(format!("{}{}", class.name(), CAPABILITY_SUFFIX))
            .extends(&root)
            .field(FieldDef::new(slot.clone(), TypeRef::Handler).visibility(Visibility::Private))
            .proxy_of(class, &slot);
        for iface in &interfaces {
            builder = builder.implements(iface);
        }

        for sig in class.interface_operations() {
            let op = OperationId::abstract_op(class.clone(), sig.clone());
            let mut def = MethodDef::new(sig.name.clone()).returns(sig.return_type.clone());
            for param in &sig.params {
                def = def.param(param.clone());
            }
            for kind in &sig.throws {
                def = def.throws(kind.clone());
            }
            if sig.variadic {
                def = def.variadic();
            }
            builder = builder.method(
                def.body(move |this, args| router::dispatch(this, &op, slot_index, args)),
            );
        }

        let handler_slot = slot.clone();
        builder = builder.initializer(InitializerDef::new().param(TypeRef::Handler).body(
            move |this, args| {
                this.set_field(&handler_slot, args.first().cloned().unwrap_or(Value::Null))?;
                Ok(Value::Null)
            },
        ));

        let generated = builder.build();
        debug!(
            target_type = %class.name(),
            proxy_type = %generated.name(),
            interfaces = interfaces.len(),
            "built capability proxy type"
        );
        Ok(generated)
    }
}

impl Default for InterfaceProxyBuilder {
    fn default() -> Self {
        Self::new("handler")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::router::{ForwardingHandler, HandlerRef};
    use crate::vm::{InterfaceDef, Object};

    fn greeter() -> Arc<Class> {
        let iface = InterfaceDef::new("demo.Greeter")
            .operation(MethodDef::new("greet").param(TypeRef::Str).returns(TypeRef::Str))
            .build();
        ClassBuilder::new("demo.English")
            .extends(&builtins::object_class())
            .implements(&iface)
            .method(
                MethodDef::new("greet")
                    .param(TypeRef::Str)
                    .returns(TypeRef::Str)
                    .body(|_, args| Ok(Value::str(format!("hello {}", args[0])))),
            )
            .method(MethodDef::new("secret").returns(TypeRef::I32))
            .build()
    }

    #[test]
    fn test_capability_proxy_routes_interface_operations() {
        let class = greeter();
        let generated = InterfaceProxyBuilder::default().build(&class).unwrap();
        assert!(generated.is_subclass_of("demo.Greeter"));
        assert!(!generated.is_subclass_of("demo.English"));
        assert_eq!(generated.declared_methods().len(), 1);

        let target = Object::allocate(&class);
        let handler: HandlerRef = Arc::new(ForwardingHandler::new(target));
        let proxy = Object::construct(&generated, &[Value::Handler(handler)]).unwrap();
        let out = Object::invoke(&proxy, "greet", &[Value::str("bob")]).unwrap();
        assert_eq!(out, Value::str("hello \"bob\""));
    }

    #[test]
    fn test_requires_interfaces() {
        let plain = ClassBuilder::new("demo.Plain").build();
        let err = InterfaceProxyBuilder::default().build(&plain).unwrap_err();
        assert!(matches!(err, ProxyError::NoCapabilityInterfaces { .. }));
    }
}
