//! Classes, operations and initializers
//!
//! A [`Class`] is immutable once built (see [`ClassBuilder`]) and shared via
//! `Arc`. The parent chain is held by strong references, so a class keeps its
//! ancestors alive.
//!
//! [`ClassBuilder`]: crate::vm::ClassBuilder

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::vm::failure::{Failure, FailureKind};
use crate::vm::object::ObjectRef;
use crate::vm::types::TypeRef;
use crate::vm::value::Value;

/// Global counter for class IDs
static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Unique class identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClassId(u64);

impl ClassId {
    pub(crate) fn next() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identifier
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Member or type visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible everywhere
    Public,
    /// Visible to subclasses
    Protected,
    /// Visible within the declaring namespace
    Package,
    /// Visible only to the declaring type
    Private,
}

impl Visibility {
    /// Keyword form
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Package => "package",
            Visibility::Private => "private",
        }
    }
}

/// Modifier flags for methods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodModifiers {
    /// Cannot be overridden
    pub is_final: bool,
    /// Belongs to the type, not to instances
    pub is_static: bool,
    /// Declared without an implementation
    pub is_abstract: bool,
    /// Compiler-inserted covariant-return shadow
    pub is_bridge: bool,
}

/// Identity of an overridable operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSignature {
    /// Operation name
    pub name: String,
    /// Ordered parameter types
    pub params: Vec<TypeRef>,
    /// Return type
    pub return_type: TypeRef,
    /// Declared failure kinds
    pub throws: Vec<FailureKind>,
    /// Full name of the declaring type
    pub declaring_type: String,
    /// Visibility
    pub visibility: Visibility,
    /// Whether the last parameter collects remaining arguments
    pub variadic: bool,
}

/// Deduplication key: name, parameter types and return type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignatureKey {
    /// Operation name
    pub name: String,
    /// Ordered parameter types
    pub params: Vec<TypeRef>,
    /// Return type
    pub return_type: TypeRef,
}

impl OperationSignature {
    /// The deduplication key
    pub fn key(&self) -> SignatureKey {
        SignatureKey {
            name: self.name.clone(),
            params: self.params.clone(),
            return_type: self.return_type.clone(),
        }
    }

    /// Whether a failure of `kind` is declared by this operation
    pub fn declares(&self, kind: &FailureKind) -> bool {
        self.throws.iter().any(|declared| kind.is_a(declared))
    }

    /// Whether the arguments fit the parameter list
    pub fn accepts_args(&self, args: &[Value]) -> bool {
        if self.variadic {
            let Some((rest, fixed)) = self.params.split_last() else {
                return false;
            };
            args.len() >= fixed.len()
                && fixed.iter().zip(args).all(|(p, a)| p.accepts(a))
                && args[fixed.len()..].iter().all(|a| rest.accepts(a))
        } else {
            args.len() == self.params.len()
                && self.params.iter().zip(args).all(|(p, a)| p.accepts(a))
        }
    }
}

impl fmt::Display for OperationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(TypeRef::to_string).collect();
        write!(f, "{}.{}({}", self.declaring_type, self.name, params.join(", "))?;
        if self.variadic {
            f.write_str("...")?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// Implementation of an operation or initializer
pub type MethodBody = Arc<dyn Fn(&ObjectRef, &[Value]) -> Result<Value, Failure> + Send + Sync>;

/// A declared method
pub struct Method {
    /// Signature
    pub signature: OperationSignature,
    /// Modifier flags
    pub modifiers: MethodModifiers,
    body: Option<MethodBody>,
}

impl Method {
    pub(crate) fn new(
        signature: OperationSignature,
        modifiers: MethodModifiers,
        body: Option<MethodBody>,
    ) -> Self {
        Self {
            signature,
            modifiers,
            body,
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// Whether an implementation is attached
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Run this exact implementation (no virtual dispatch)
    pub fn call(&self, this: &ObjectRef, args: &[Value]) -> Result<Value, Failure> {
        match &self.body {
            Some(body) if !self.modifiers.is_abstract => body(this, args),
            _ => Err(Failure::new(
                FailureKind::abstract_method(),
                format!("{} has no implementation", self.signature),
            )),
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("signature", &self.signature.to_string())
            .field("modifiers", &self.modifiers)
            .finish()
    }
}

/// A declared initializer (constructor)
pub struct Initializer {
    /// Declaration order within the class
    pub index: usize,
    /// Parameter types
    pub params: Vec<TypeRef>,
    /// Visibility
    pub visibility: Visibility,
    body: Option<MethodBody>,
}

impl Initializer {
    pub(crate) fn new(
        index: usize,
        params: Vec<TypeRef>,
        visibility: Visibility,
        body: Option<MethodBody>,
    ) -> Self {
        Self {
            index,
            params,
            visibility,
            body,
        }
    }

    /// Whether subclasses may invoke this initializer
    pub fn is_accessible(&self) -> bool {
        self.visibility != Visibility::Private
    }

    /// Run the initializer against an allocated instance
    pub fn run(&self, this: &ObjectRef, args: &[Value]) -> Result<(), Failure> {
        if args.len() != self.params.len() {
            return Err(Failure::illegal_argument(format!(
                "initializer expects {} arguments, got {}",
                self.params.len(),
                args.len()
            )));
        }
        match &self.body {
            Some(body) => body(this, args).map(|_| ()),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Initializer")
            .field("index", &self.index)
            .field("params", &self.params)
            .field("visibility", &self.visibility)
            .finish()
    }
}

/// A declared field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeRef,
    /// Visibility
    pub visibility: Visibility,
    /// Class-level field (not part of the instance layout)
    pub is_static: bool,
    /// Full name of the declaring type
    pub declaring_type: String,
}

/// A capability interface: a named set of operations
#[derive(Debug, Clone)]
pub struct Interface {
    /// Full name
    pub name: String,
    /// Declared operations
    pub operations: Vec<OperationSignature>,
}

/// Where a nested type is declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nesting {
    /// Full name of the enclosing type
    pub outer: String,
    /// Whether the nested type is visible outside its enclosing type
    pub exported: bool,
}

/// Marker carried by generated proxy types
#[derive(Debug, Clone)]
pub struct ProxyInfo {
    /// The originating class
    pub origin: Arc<Class>,
    /// Field holding the interception handler
    pub handler_slot: String,
}

/// Class-level flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassFlags {
    /// Cannot be extended
    pub is_final: bool,
    /// Cannot be constructed directly
    pub is_abstract: bool,
    /// Has no name of its own
    pub is_anonymous: bool,
}

/// An immutable class description
pub struct Class {
    pub(crate) id: ClassId,
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) simple_name: String,
    pub(crate) parent: Option<Arc<Class>>,
    pub(crate) interfaces: Vec<Arc<Interface>>,
    pub(crate) visibility: Visibility,
    pub(crate) flags: ClassFlags,
    pub(crate) nesting: Option<Nesting>,
    pub(crate) fields: Vec<FieldDecl>,
    pub(crate) layout: Vec<FieldDecl>,
    pub(crate) methods: Vec<Arc<Method>>,
    pub(crate) initializers: Vec<Arc<Initializer>>,
    pub(crate) proxy_info: Option<ProxyInfo>,
}

impl Class {
    /// Unique identity
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Full name (`namespace.Simple`, nested types use `Outer$Inner`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace part of the full name
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name without namespace (empty for anonymous types)
    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    /// Parent class
    pub fn parent(&self) -> Option<&Arc<Class>> {
        self.parent.as_ref()
    }

    /// Directly implemented interfaces
    pub fn interfaces(&self) -> &[Arc<Interface>] {
        &self.interfaces
    }

    /// Type visibility
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Class flags
    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    /// Whether the class cannot be extended
    pub fn is_final(&self) -> bool {
        self.flags.is_final
    }

    /// Whether the class is anonymous
    pub fn is_anonymous(&self) -> bool {
        self.flags.is_anonymous
    }

    /// Nesting information for nested types
    pub fn nesting(&self) -> Option<&Nesting> {
        self.nesting.as_ref()
    }

    /// Fields declared by this class
    pub fn declared_fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    /// Instance field layout, inherited fields first
    pub fn field_layout(&self) -> &[FieldDecl] {
        &self.layout
    }

    /// Methods declared by this class
    pub fn declared_methods(&self) -> &[Arc<Method>] {
        &self.methods
    }

    /// Initializers declared by this class, in declaration order
    pub fn initializers(&self) -> &[Arc<Initializer>] {
        &self.initializers
    }

    /// Proxy marker for generated types
    pub fn proxy_info(&self) -> Option<&ProxyInfo> {
        self.proxy_info.as_ref()
    }

    /// This class followed by every ancestor up to the root
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            current: Some(self),
        }
    }

    /// Whether this class is, extends or implements the named type
    pub fn is_subclass_of(&self, name: &str) -> bool {
        self.ancestors().any(|class| {
            class.name == name || class.interfaces.iter().any(|i| i.name == name)
        })
    }

    /// Whether any class in the chain declares a field called `name`
    pub fn chain_declares_field(&self, name: &str) -> bool {
        self.ancestors()
            .any(|class| class.fields.iter().any(|f| f.name == name))
    }

    /// Slot index of the most-derived instance field called `name`
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.layout.iter().rposition(|f| f.name == name)
    }

    /// Method declared by this class with the given name and parameters
    pub fn declared_method(&self, name: &str, params: &[TypeRef]) -> Option<&Arc<Method>> {
        let mut candidates = self
            .methods
            .iter()
            .filter(|m| m.signature.name == name && m.signature.params == params);
        let first = candidates.next()?;
        if first.modifiers.is_bridge {
            // a covariant implementation declared alongside the bridge wins
            return Some(candidates.next().unwrap_or(first));
        }
        Some(first)
    }

    /// Every operation of every interface in the chain
    pub fn interface_operations(&self) -> Vec<OperationSignature> {
        let mut ops: Vec<OperationSignature> = Vec::new();
        for class in self.ancestors() {
            for iface in &class.interfaces {
                for op in &iface.operations {
                    if !ops.iter().any(|o| o.key() == op.key()) {
                        ops.push(op.clone());
                    }
                }
            }
        }
        ops
    }

    /// Virtual lookup by name and parameter types
    pub fn resolve_method(&self, name: &str, params: &[TypeRef]) -> Result<Arc<Method>, Failure> {
        for class in self.ancestors() {
            if let Some(method) = class.declared_method(name, params) {
                if method.modifiers.is_static || method.signature.visibility == Visibility::Private {
                    continue;
                }
                if method.modifiers.is_abstract {
                    return Err(Failure::new(
                        FailureKind::abstract_method(),
                        format!("{} is abstract in {}", name, class.name),
                    ));
                }
                return Ok(method.clone());
            }
        }
        Err(Failure::unsupported(format!(
            "{} has no operation {}({})",
            self.name,
            name,
            params.iter().map(TypeRef::to_string).collect::<Vec<_>>().join(", ")
        )))
    }

    /// Virtual lookup by name and runtime arguments
    pub fn resolve_by_args(&self, name: &str, args: &[Value]) -> Result<Arc<Method>, Failure> {
        for class in self.ancestors() {
            let found = class.methods.iter().find(|m| {
                m.signature.name == name
                    && !m.modifiers.is_static
                    && !m.modifiers.is_bridge
                    && m.signature.accepts_args(args)
            });
            if let Some(method) = found {
                if method.modifiers.is_abstract {
                    return Err(Failure::new(
                        FailureKind::abstract_method(),
                        format!("{} is abstract in {}", name, class.name),
                    ));
                }
                return Ok(method.clone());
            }
        }
        let arg_types: Vec<&str> = args.iter().map(Value::type_name).collect();
        Err(Failure::unsupported(format!(
            "{} has no operation {}({})",
            self.name,
            name,
            arg_types.join(", ")
        )))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Iterator over a class and its ancestors
pub struct Ancestors<'a> {
    current: Option<&'a Class>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Class;

    fn next(&mut self) -> Option<Self::Item> {
        let class = self.current?;
        self.current = class.parent.as_deref();
        Some(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{ClassBuilder, MethodDef};

    fn base() -> Arc<Class> {
        ClassBuilder::new("demo.Base")
            .method(MethodDef::new("size").returns(TypeRef::I32).body(|_, _| Ok(Value::I32(1))))
            .method(MethodDef::new("shape").returns(TypeRef::Str).as_abstract())
            .build()
    }

    #[test]
    fn test_ancestors_order() {
        let base = base();
        let child = ClassBuilder::new("demo.Child").extends(&base).build();
        let names: Vec<&str> = child.ancestors().map(Class::name).collect();
        assert_eq!(names, vec!["demo.Child", "demo.Base"]);
        assert!(child.is_subclass_of("demo.Base"));
        assert!(!base.is_subclass_of("demo.Child"));
    }

    #[test]
    fn test_resolve_method_reports_abstract() {
        let base = base();
        assert!(base.resolve_method("size", &[]).is_ok());
        let err = base.resolve_method("shape", &[]).unwrap_err();
        assert_eq!(err.kind(), &FailureKind::abstract_method());
        let err = base.resolve_method("missing", &[]).unwrap_err();
        assert_eq!(err.kind(), &FailureKind::unsupported_operation());
    }

    #[test]
    fn test_variadic_accepts_args() {
        let sig = OperationSignature {
            name: "sum".into(),
            params: vec![TypeRef::Str, TypeRef::I32],
            return_type: TypeRef::I32,
            throws: vec![],
            declaring_type: "demo.Math".into(),
            visibility: Visibility::Public,
            variadic: true,
        };
        assert!(sig.accepts_args(&[Value::str("a")]));
        assert!(sig.accepts_args(&[Value::str("a"), Value::I32(1), Value::I32(2)]));
        assert!(!sig.accepts_args(&[Value::I32(1)]));
    }

    #[test]
    fn test_signature_declares_descendant_kinds() {
        let sig = OperationSignature {
            name: "read".into(),
            params: vec![],
            return_type: TypeRef::Void,
            throws: vec![FailureKind::runtime()],
            declaring_type: "demo.Reader".into(),
            visibility: Visibility::Public,
            variadic: false,
        };
        assert!(sig.declares(&FailureKind::illegal_state()));
        assert!(!sig.declares(&FailureKind::exception()));
    }
}
