//! Interpose Engine
//!
//! This crate provides the machinery behind intercepting proxies:
//! - **VM**: Reflective object model, values, failures and introspection (`vm` module)
//! - **Proxy**: Specifications, synthesis, type cache, instantiation and routing (`proxy` module)
//! - **Compiler**: Descriptor lexer, parser and linker (`compiler` module)
//! - **Builtins**: Precompiled library types (`builtins` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use interpose_engine::{builtins, ProxyFactory, Value, Object};
//!
//! let factory = ProxyFactory::with_defaults();
//! let proxy = factory.create_proxy(&builtins::array_list_class(), None)?;
//! Object::invoke(&proxy, "add", &[Value::str("x")])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// VM module: classes, objects, values and reflection
pub mod vm;

/// Proxy module: the interception pipeline
pub mod proxy;

/// Compiler module: turns rendered descriptors into classes
pub mod compiler;

/// Builtins module: library types available to every program
pub mod builtins;

// ============================================================================
// Re-exports
// ============================================================================

pub use compiler::{CompilationService, CompileError, InProcessCompiler};
pub use proxy::{
    BoundHandler, ConfigError, ForwardingHandler, HandlerRef, InstantiationMode,
    InstantiationStrategy, InvocationHandler, OperationId, PassThroughHandler, ProxyError,
    ProxyFactory, ProxyOptions, ProxySpecification, RenderedUnit, TypeCache,
};
pub use vm::{
    Class, ClassBuilder, ClassRegistry, Failure, FailureKind, FieldDef, InitializerDef,
    InterfaceDef, MethodDef, Object, ObjectRef, TypeRef, Value, Visibility,
};
