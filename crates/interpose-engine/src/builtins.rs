//! Built-in classes
//!
//! - `lang.Object`: root class (`to_string`, `hash_code`, `equals`)
//! - `collections.List`: ordered-collection interface
//! - `collections.ArrayList`: growable list implementing `collections.List`
//! - `collections.Stack`: LIFO stack extending `collections.ArrayList`
//!
//! Each class is created once per process, so its identity is stable.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::vm::{
    Class, ClassBuilder, ClassRegistry, Failure, FieldDef, InitializerDef, Interface, InterfaceDef,
    ListRef, MethodDef, ObjectRef, TypeRef, Value, Visibility, ROOT_CLASS,
};

static OBJECT: Lazy<Arc<Class>> = Lazy::new(build_object);
static LIST: Lazy<Arc<Interface>> = Lazy::new(build_list_interface);
static ARRAY_LIST: Lazy<Arc<Class>> = Lazy::new(build_array_list);
static STACK: Lazy<Arc<Class>> = Lazy::new(build_stack);

/// `lang.Object`
pub fn object_class() -> Arc<Class> {
    OBJECT.clone()
}

/// `collections.List`
pub fn list_interface() -> Arc<Interface> {
    LIST.clone()
}

/// `collections.ArrayList`
pub fn array_list_class() -> Arc<Class> {
    ARRAY_LIST.clone()
}

/// `collections.Stack`
pub fn stack_class() -> Arc<Class> {
    STACK.clone()
}

/// Every built-in class
pub fn all() -> Vec<Arc<Class>> {
    vec![object_class(), array_list_class(), stack_class()]
}

/// Built-in class by full name
pub fn lookup(name: &str) -> Option<Arc<Class>> {
    all().into_iter().find(|c| c.name() == name)
}

/// Register every built-in class
pub fn register_all(registry: &ClassRegistry) {
    for class in all() {
        registry.register(class);
    }
}

fn object_type() -> TypeRef {
    TypeRef::class(ROOT_CLASS)
}

fn build_object() -> Arc<Class> {
    ClassBuilder::new(ROOT_CLASS)
        .initializer(InitializerDef::new())
        .method(
            MethodDef::new("to_string")
                .returns(TypeRef::Str)
                .body(|this, _| Ok(Value::str(format!("{}@{}", this.class().name(), this.id())))),
        )
        .method(
            MethodDef::new("hash_code")
                .returns(TypeRef::I32)
                .body(|this, _| Ok(Value::I32(this.id() as i32))),
        )
        .method(
            MethodDef::new("equals")
                .param(object_type())
                .returns(TypeRef::BOOL)
                .body(|this, args| {
                    let same = matches!(args.first(), Some(Value::Object(other)) if Arc::ptr_eq(this, other));
                    Ok(Value::Bool(same))
                }),
        )
        .build()
}

fn build_list_interface() -> Arc<Interface> {
    InterfaceDef::new("collections.List")
        .operation(MethodDef::new("size").returns(TypeRef::I32))
        .operation(MethodDef::new("is_empty").returns(TypeRef::BOOL))
        .operation(MethodDef::new("get").param(TypeRef::I32).returns(object_type()))
        .operation(MethodDef::new("add").param(object_type()).returns(TypeRef::BOOL))
        .build()
}

/// Backing storage; allocated lazily for instances created without an initializer
fn items(this: &ObjectRef) -> Result<ListRef, Failure> {
    match this.get_field("items")? {
        Value::List(list) => Ok(list),
        _ => {
            let list: ListRef = Arc::new(RwLock::new(Vec::new()));
            this.set_field("items", Value::List(list.clone()))?;
            Ok(list)
        }
    }
}

fn index_arg(args: &[Value]) -> Result<i32, Failure> {
    args.first()
        .and_then(Value::as_i32)
        .ok_or_else(|| Failure::illegal_argument("expected an i32 index"))
}

fn checked_index(index: i32, len: usize) -> Result<usize, Failure> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| {
            Failure::index_out_of_bounds(format!(
                "index {} out of bounds for length {}",
                index, len
            ))
        })
}

fn build_array_list() -> Arc<Class> {
    ClassBuilder::new("collections.ArrayList")
        .extends(&object_class())
        .implements(&list_interface())
        .field(FieldDef::new("items", TypeRef::List).visibility(Visibility::Private))
        .initializer(InitializerDef::new().body(|this, _| {
            this.set_field("items", Value::list(Vec::new()))?;
            Ok(Value::Null)
        }))
        .initializer(InitializerDef::new().param(TypeRef::I32).body(|this, args| {
            let capacity = index_arg(args)?;
            let capacity = usize::try_from(capacity).map_err(|_| {
                Failure::illegal_argument(format!("illegal capacity: {}", capacity))
            })?;
            this.set_field("items", Value::list(Vec::with_capacity(capacity)))?;
            Ok(Value::Null)
        }))
        .method(
            MethodDef::new("size")
                .returns(TypeRef::I32)
                .body(|this, _| Ok(Value::I32(items(this)?.read().len() as i32))),
        )
        .method(
            MethodDef::new("is_empty")
                .returns(TypeRef::BOOL)
                .body(|this, _| Ok(Value::Bool(items(this)?.read().is_empty()))),
        )
        .method(
            MethodDef::new("get")
                .param(TypeRef::I32)
                .returns(object_type())
                .body(|this, args| {
                    let list = items(this)?;
                    let items = list.read();
                    let i = checked_index(index_arg(args)?, items.len())?;
                    Ok(items[i].clone())
                }),
        )
        .method(
            MethodDef::new("set")
                .param(TypeRef::I32)
                .param(object_type())
                .returns(object_type())
                .body(|this, args| {
                    let list = items(this)?;
                    let mut items = list.write();
                    let i = checked_index(index_arg(args)?, items.len())?;
                    let value = args.get(1).cloned().unwrap_or_default();
                    Ok(std::mem::replace(&mut items[i], value))
                }),
        )
        .method(
            MethodDef::new("add")
                .param(object_type())
                .returns(TypeRef::BOOL)
                .body(|this, args| {
                    items(this)?.write().push(args.first().cloned().unwrap_or_default());
                    Ok(Value::Bool(true))
                }),
        )
        .method(
            MethodDef::new("remove_at")
                .param(TypeRef::I32)
                .returns(object_type())
                .body(|this, args| {
                    let list = items(this)?;
                    let mut items = list.write();
                    let i = checked_index(index_arg(args)?, items.len())?;
                    Ok(items.remove(i))
                }),
        )
        .method(
            MethodDef::new("contains")
                .param(object_type())
                .returns(TypeRef::BOOL)
                .body(|this, args| {
                    let needle = args.first().cloned().unwrap_or_default();
                    Ok(Value::Bool(items(this)?.read().contains(&needle)))
                }),
        )
        .method(MethodDef::new("clear").body(|this, _| {
            items(this)?.write().clear();
            Ok(Value::Null)
        }))
        .method(
            MethodDef::new("to_string")
                .returns(TypeRef::Str)
                .body(|this, _| Ok(Value::str(Value::List(items(this)?).describe()))),
        )
        .build()
}

fn build_stack() -> Arc<Class> {
    ClassBuilder::new("collections.Stack")
        .extends(&array_list_class())
        .initializer(InitializerDef::new().body(|this, _| {
            this.set_field("items", Value::list(Vec::new()))?;
            Ok(Value::Null)
        }))
        .method(
            MethodDef::new("push")
                .param(object_type())
                .returns(object_type())
                .body(|this, args| {
                    let value = args.first().cloned().unwrap_or_default();
                    items(this)?.write().push(value.clone());
                    Ok(value)
                }),
        )
        .method(
            MethodDef::new("pop")
                .returns(object_type())
                .body(|this, _| {
                    items(this)?
                        .write()
                        .pop()
                        .ok_or_else(|| Failure::illegal_state("stack is empty"))
                }),
        )
        .method(
            MethodDef::new("peek")
                .returns(object_type())
                .as_final()
                .body(|this, _| {
                    items(this)?
                        .read()
                        .last()
                        .cloned()
                        .ok_or_else(|| Failure::illegal_state("stack is empty"))
                }),
        )
        .build()
}
