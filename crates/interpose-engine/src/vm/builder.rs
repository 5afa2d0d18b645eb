//! Fluent builders for declaring classes and interfaces
//!
//! ```ignore
//! let point = ClassBuilder::new("geo.Point")
//!     .field(FieldDef::new("x", TypeRef::I32))
//!     .initializer(InitializerDef::new().param(TypeRef::I32).body(|this, args| {
//!         this.set_field("x", args[0].clone())?;
//!         Ok(Value::Null)
//!     }))
//!     .method(MethodDef::new("x").returns(TypeRef::I32).body(|this, _| this.get_field("x")))
//!     .build();
//! ```

use std::sync::Arc;

use crate::vm::class::{
    Class, ClassFlags, ClassId, FieldDecl, Initializer, Interface, Method, MethodBody,
    MethodModifiers, Nesting, OperationSignature, ProxyInfo, Visibility,
};
use crate::vm::failure::{Failure, FailureKind};
use crate::vm::object::ObjectRef;
use crate::vm::types::TypeRef;
use crate::vm::value::Value;

/// Definition for a field
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    ty: TypeRef,
    visibility: Visibility,
    is_static: bool,
}

impl FieldDef {
    /// Create a public instance field
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            visibility: Visibility::Public,
            is_static: false,
        }
    }

    /// Set visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Mark as class-level field
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }
}

/// Definition for a method
#[derive(Clone)]
pub struct MethodDef {
    name: String,
    params: Vec<TypeRef>,
    return_type: TypeRef,
    throws: Vec<FailureKind>,
    visibility: Visibility,
    variadic: bool,
    modifiers: MethodModifiers,
    body: Option<MethodBody>,
}

impl MethodDef {
    /// Create a public, parameterless method returning `void`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: TypeRef::Void,
            throws: Vec::new(),
            visibility: Visibility::Public,
            variadic: false,
            modifiers: MethodModifiers::default(),
            body: None,
        }
    }

    /// Add a parameter
    pub fn param(mut self, ty: TypeRef) -> Self {
        self.params.push(ty);
        self
    }

    /// Set return type
    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.return_type = ty;
        self
    }

    /// Declare a failure kind
    pub fn throws(mut self, kind: FailureKind) -> Self {
        self.throws.push(kind);
        self
    }

    /// Set visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// The last parameter collects remaining arguments
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Mark as final
    pub fn as_final(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    /// Mark as abstract
    pub fn as_abstract(mut self) -> Self {
        self.modifiers.is_abstract = true;
        self
    }

    /// Mark as a bridge (covariant-return shadow)
    pub fn as_bridge(mut self) -> Self {
        self.modifiers.is_bridge = true;
        self
    }

    /// Attach an implementation
    pub fn body<F>(mut self, f: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(f));
        self
    }

    /// Attach a shared implementation
    pub fn body_arc(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    fn signature(&self, declaring_type: &str) -> OperationSignature {
        OperationSignature {
            name: self.name.clone(),
            params: self.params.clone(),
            return_type: self.return_type.clone(),
            throws: self.throws.clone(),
            declaring_type: declaring_type.to_string(),
            visibility: self.visibility,
            variadic: self.variadic,
        }
    }

    fn into_method(self, declaring_type: &str) -> Method {
        let signature = self.signature(declaring_type);
        Method::new(signature, self.modifiers, self.body)
    }
}

/// Definition for an initializer
#[derive(Clone)]
pub struct InitializerDef {
    params: Vec<TypeRef>,
    visibility: Visibility,
    body: Option<MethodBody>,
}

impl InitializerDef {
    /// Create a public, parameterless initializer with no body
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            visibility: Visibility::Public,
            body: None,
        }
    }

    /// Add a parameter
    pub fn param(mut self, ty: TypeRef) -> Self {
        self.params.push(ty);
        self
    }

    /// Set visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Attach an implementation
    pub fn body<F>(mut self, f: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(f));
        self
    }

    /// Attach a shared implementation
    pub fn body_arc(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }
}

impl Default for InitializerDef {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for capability interfaces
pub struct InterfaceDef {
    name: String,
    operations: Vec<MethodDef>,
}

impl InterfaceDef {
    /// Start an interface with the given full name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: Vec::new(),
        }
    }

    /// Declare an operation (bodies are ignored)
    pub fn operation(mut self, op: MethodDef) -> Self {
        self.operations.push(op);
        self
    }

    /// Finish the interface
    pub fn build(self) -> Arc<Interface> {
        let operations = self
            .operations
            .iter()
            .map(|op| op.signature(&self.name))
            .collect();
        Arc::new(Interface {
            name: self.name,
            operations,
        })
    }
}

/// Builder for classes
pub struct ClassBuilder {
    name: String,
    parent: Option<Arc<Class>>,
    interfaces: Vec<Arc<Interface>>,
    visibility: Visibility,
    flags: ClassFlags,
    nesting: Option<Nesting>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
    initializers: Vec<InitializerDef>,
    proxy_info: Option<ProxyInfo>,
}

impl ClassBuilder {
    /// Start a public root class with the given full name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            interfaces: Vec::new(),
            visibility: Visibility::Public,
            flags: ClassFlags::default(),
            nesting: None,
            fields: Vec::new(),
            methods: Vec::new(),
            initializers: Vec::new(),
            proxy_info: None,
        }
    }

    /// Set the parent class
    pub fn extends(mut self, parent: &Arc<Class>) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Implement an interface
    pub fn implements(mut self, interface: &Arc<Interface>) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    /// Set type visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Mark the class final (sealed)
    pub fn as_final(mut self) -> Self {
        self.flags.is_final = true;
        self
    }

    /// Mark the class abstract
    pub fn as_abstract(mut self) -> Self {
        self.flags.is_abstract = true;
        self
    }

    /// Mark the class anonymous
    pub fn anonymous(mut self) -> Self {
        self.flags.is_anonymous = true;
        self
    }

    /// Declare this class inside `outer`; the name given to [`ClassBuilder::new`]
    /// becomes the simple name
    pub fn nested_in(mut self, outer: &Class, exported: bool) -> Self {
        self.nesting = Some(Nesting {
            outer: outer.name().to_string(),
            exported,
        });
        self
    }

    /// Add a field
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a method
    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// Add an initializer
    pub fn initializer(mut self, init: InitializerDef) -> Self {
        self.initializers.push(init);
        self
    }

    pub(crate) fn proxy_of(mut self, origin: &Arc<Class>, handler_slot: &str) -> Self {
        self.proxy_info = Some(ProxyInfo {
            origin: origin.clone(),
            handler_slot: handler_slot.to_string(),
        });
        self
    }

    /// Finish the class
    pub fn build(self) -> Arc<Class> {
        let name = match &self.nesting {
            Some(nesting) => format!("{}${}", nesting.outer, self.name),
            None => self.name,
        };
        let (namespace, simple) = match name.rfind('.') {
            Some(dot) => (name[..dot].to_string(), name[dot + 1..].to_string()),
            None => (String::new(), name.clone()),
        };
        let simple_name = if self.flags.is_anonymous {
            String::new()
        } else {
            simple
        };

        let fields: Vec<FieldDecl> = self
            .fields
            .into_iter()
            .map(|f| FieldDecl {
                name: f.name,
                ty: f.ty,
                visibility: f.visibility,
                is_static: f.is_static,
                declaring_type: name.clone(),
            })
            .collect();

        let mut layout = self
            .parent
            .as_ref()
            .map(|p| p.field_layout().to_vec())
            .unwrap_or_default();
        layout.extend(fields.iter().filter(|f| !f.is_static).cloned());

        let methods = self
            .methods
            .into_iter()
            .map(|m| Arc::new(m.into_method(&name)))
            .collect();

        let initializers = self
            .initializers
            .into_iter()
            .enumerate()
            .map(|(index, init)| {
                Arc::new(Initializer::new(
                    index,
                    init.params,
                    init.visibility,
                    init.body,
                ))
            })
            .collect();

        Arc::new(Class {
            id: ClassId::next(),
            name,
            namespace,
            simple_name,
            parent: self.parent,
            interfaces: self.interfaces,
            visibility: self.visibility,
            flags: self.flags,
            nesting: self.nesting,
            fields,
            layout,
            methods,
            initializers,
            proxy_info: self.proxy_info,
        })
    }
}
