//! Object instances and virtual dispatch

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::vm::class::{Class, OperationSignature};
use crate::vm::failure::Failure;
use crate::vm::value::Value;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Shared object reference
pub type ObjectRef = Arc<Object>;

/// Object instance
pub struct Object {
    id: u64,
    class: Arc<Class>,
    fields: RwLock<Vec<Value>>,
}

impl Object {
    /// Allocate an instance with default field values, running no initializer
    pub fn allocate(class: &Arc<Class>) -> ObjectRef {
        let fields = class
            .field_layout()
            .iter()
            .map(|f| f.ty.default_value())
            .collect();
        Arc::new(Object {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            class: class.clone(),
            fields: RwLock::new(fields),
        })
    }

    /// Allocate an instance and run the first initializer accepting `args`
    pub fn construct(class: &Arc<Class>, args: &[Value]) -> Result<ObjectRef, Failure> {
        if class.flags().is_abstract {
            return Err(Failure::illegal_state(format!(
                "cannot instantiate abstract type {}",
                class.name()
            )));
        }
        let object = Object::allocate(class);
        if class.initializers().is_empty() {
            if !args.is_empty() {
                return Err(Failure::illegal_argument(format!(
                    "{} declares no initializer taking {} arguments",
                    class.name(),
                    args.len()
                )));
            }
            return Ok(object);
        }
        let init = class
            .initializers()
            .iter()
            .find(|init| {
                init.params.len() == args.len()
                    && init.params.iter().zip(args).all(|(p, a)| p.accepts(a))
            })
            .ok_or_else(|| {
                Failure::illegal_argument(format!(
                    "{} declares no initializer accepting ({})",
                    class.name(),
                    args.iter().map(Value::type_name).collect::<Vec<_>>().join(", ")
                ))
            })?;
        init.run(&object, args)?;
        Ok(object)
    }

    /// Object identity
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Runtime class
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Whether the runtime class is, extends or implements `name`
    pub fn instance_of(&self, name: &str) -> bool {
        self.class.is_subclass_of(name)
    }

    /// Read a field by name
    pub fn get_field(&self, name: &str) -> Result<Value, Failure> {
        let index = self.slot(name)?;
        self.field_at(index)
    }

    /// Write a field by name
    pub fn set_field(&self, name: &str, value: Value) -> Result<(), Failure> {
        let index = self.slot(name)?;
        self.set_field_at(index, value)
    }

    /// Read a field by slot index
    pub fn field_at(&self, index: usize) -> Result<Value, Failure> {
        self.fields.read().get(index).cloned().ok_or_else(|| {
            Failure::index_out_of_bounds(format!(
                "field index {} out of bounds for {}",
                index,
                self.class.name()
            ))
        })
    }

    /// Write a field by slot index, checking the declared type
    pub fn set_field_at(&self, index: usize, value: Value) -> Result<(), Failure> {
        let decl = self.class.field_layout().get(index).ok_or_else(|| {
            Failure::index_out_of_bounds(format!(
                "field index {} out of bounds for {}",
                index,
                self.class.name()
            ))
        })?;
        let value = decl.ty.coerce(value)?;
        let mut fields = self.fields.write();
        if let Some(slot) = fields.get_mut(index) {
            *slot = value;
        }
        Ok(())
    }

    fn slot(&self, name: &str) -> Result<usize, Failure> {
        self.class.field_index(name).ok_or_else(|| {
            Failure::illegal_argument(format!("{} has no field {}", self.class.name(), name))
        })
    }

    /// Virtual dispatch by name and argument compatibility
    pub fn invoke(this: &ObjectRef, name: &str, args: &[Value]) -> Result<Value, Failure> {
        let method = this.class.resolve_by_args(name, args)?;
        method.call(this, args)
    }

    /// Virtual dispatch by name and parameter types
    pub fn invoke_signature(
        this: &ObjectRef,
        signature: &OperationSignature,
        args: &[Value],
    ) -> Result<Value, Failure> {
        let method = this
            .class
            .resolve_method(&signature.name, &signature.params)?;
        method.call(this, args)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("class", &self.class.name())
            .field("fields", &self.fields.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{ClassBuilder, FieldDef, InitializerDef, MethodDef, TypeRef};

    fn counter() -> Arc<Class> {
        ClassBuilder::new("demo.Counter")
            .field(FieldDef::new("count", TypeRef::I32))
            .initializer(InitializerDef::new().param(TypeRef::I32).body(|this, args| {
                this.set_field("count", args[0].clone())?;
                Ok(Value::Null)
            }))
            .method(
                MethodDef::new("count")
                    .returns(TypeRef::I32)
                    .body(|this, _| this.get_field("count")),
            )
            .method(
                MethodDef::new("add")
                    .param(TypeRef::I32)
                    .body(|this, args| {
                        let current = this.get_field("count")?.as_i32().unwrap_or(0);
                        let delta = args[0].as_i32().unwrap_or(0);
                        this.set_field("count", Value::I32(current + delta))?;
                        Ok(Value::Null)
                    }),
            )
            .build()
    }

    #[test]
    fn test_allocate_runs_no_initializer() {
        let class = counter();
        let obj = Object::allocate(&class);
        assert_eq!(obj.get_field("count").unwrap(), Value::I32(0));
    }

    #[test]
    fn test_construct_and_invoke() {
        let class = counter();
        let obj = Object::construct(&class, &[Value::I32(5)]).unwrap();
        Object::invoke(&obj, "add", &[Value::I32(2)]).unwrap();
        assert_eq!(Object::invoke(&obj, "count", &[]).unwrap(), Value::I32(7));
    }

    #[test]
    fn test_construct_rejects_bad_arguments() {
        let class = counter();
        let err = Object::construct(&class, &[Value::str("x")]).unwrap_err();
        assert_eq!(err.kind().name(), "IllegalArgument");
    }

    #[test]
    fn test_set_field_checks_type() {
        let obj = Object::allocate(&counter());
        let err = obj.set_field("count", Value::str("x")).unwrap_err();
        assert_eq!(err.kind().name(), "ClassCast");
        assert!(obj.set_field("missing", Value::Null).is_err());
    }

    #[test]
    fn test_virtual_dispatch_prefers_override() {
        let base = counter();
        let child = ClassBuilder::new("demo.Doubling")
            .extends(&base)
            .method(
                MethodDef::new("count")
                    .returns(TypeRef::I32)
                    .body(|_, _| Ok(Value::I32(42))),
            )
            .build();
        let obj = Object::allocate(&child);
        assert_eq!(Object::invoke(&obj, "count", &[]).unwrap(), Value::I32(42));
        assert!(obj.instance_of("demo.Counter"));
    }
}
