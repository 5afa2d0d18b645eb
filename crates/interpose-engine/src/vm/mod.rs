//! Reflective object model
//!
//! Classes with an ancestor chain, fields, virtual methods, initializers and
//! capability interfaces. Proxy types are ordinary classes of this model.

pub mod builder;
pub mod class;
pub mod class_registry;
pub mod failure;
pub mod object;
pub mod reflect;
pub mod types;
pub mod value;

pub use builder::{ClassBuilder, FieldDef, InitializerDef, InterfaceDef, MethodDef};
pub use class::{
    Ancestors, Class, ClassFlags, ClassId, FieldDecl, Initializer, Interface, Method, MethodBody,
    MethodModifiers, Nesting, OperationSignature, ProxyInfo, SignatureKey, Visibility,
};
pub use class_registry::ClassRegistry;
pub use failure::{Failure, FailureKind};
pub use object::{Object, ObjectRef};
pub use types::{PrimitiveKind, TypeRef, ROOT_CLASS};
pub use value::{ListRef, Value};
