//! Compilation service
//!
//! Turns rendered proxy descriptors into loaded classes:
//!
//! ```text
//! source ─▶ lexer ─▶ parser ─▶ linker ─▶ Arc<Class>
//! ```
//!
//! [`InProcessCompiler`] keeps every type it produced, together with the
//! source it was compiled from.

pub mod ast;
mod error;
pub mod lexer;
pub mod link;
pub mod parser;

pub use error::CompileError;
pub use link::Linker;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::proxy::RenderedUnit;
use crate::vm::{Class, ClassRegistry};

/// Compiles rendered descriptors into classes
pub trait CompilationService: Send + Sync {
    /// Compile `unit`, which must declare `unique_name`
    fn compile(&self, unique_name: &str, unit: &RenderedUnit) -> Result<Arc<Class>, CompileError>;
}

/// Compiler running inside the current process
pub struct InProcessCompiler {
    loaded: ClassRegistry,
    sources: RwLock<FxHashMap<String, String>>,
    compile_count: AtomicUsize,
}

impl InProcessCompiler {
    /// Compiler with nothing loaded
    pub fn new() -> Self {
        Self {
            loaded: ClassRegistry::new(),
            sources: RwLock::new(FxHashMap::default()),
            compile_count: AtomicUsize::new(0),
        }
    }

    /// Compiler with every built-in class loaded
    pub fn with_builtins() -> Self {
        let compiler = Self::new();
        crate::builtins::register_all(&compiler.loaded);
        compiler
    }

    /// Make `class` resolvable by name from later units
    pub fn load(&self, class: Arc<Class>) {
        self.loaded.register(class);
    }

    /// Every loaded type, generated ones included
    pub fn loaded(&self) -> &ClassRegistry {
        &self.loaded
    }

    /// Source a generated type was compiled from
    pub fn source_of(&self, name: &str) -> Option<String> {
        self.sources.read().get(name).cloned()
    }

    /// Number of compilations attempted
    pub fn compile_count(&self) -> usize {
        self.compile_count.load(Ordering::SeqCst)
    }
}

impl Default for InProcessCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilationService for InProcessCompiler {
    fn compile(&self, unique_name: &str, unit: &RenderedUnit) -> Result<Arc<Class>, CompileError> {
        self.compile_count.fetch_add(1, Ordering::SeqCst);

        let tokens = lexer::tokenize(&unit.source)?;
        let parsed = parser::parse(tokens)?;
        let class = Linker::new(&unit.classpath, &self.loaded).link(unique_name, &parsed)?;

        self.loaded.register(class.clone());
        self.sources
            .write()
            .insert(unique_name.to_string(), unit.source.clone());
        debug!(
            proxy_type = %unique_name,
            operations = class.declared_methods().len(),
            "compiled proxy type"
        );
        Ok(class)
    }
}

impl std::fmt::Debug for InProcessCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessCompiler")
            .field("loaded", &self.loaded.len())
            .field("compile_count", &self.compile_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{ClassBuilder, MethodDef, TypeRef, Value};

    fn unit_for(source: &str, classpath: Vec<Arc<Class>>) -> RenderedUnit {
        RenderedUnit {
            unique_name: "demo.Greeter$$Intercepted".to_string(),
            source: source.to_string(),
            imports: Vec::new(),
            classpath,
        }
    }

    #[test]
    fn test_compile_registers_type_and_source() {
        let greeter = ClassBuilder::new("demo.Greeter")
            .method(MethodDef::new("greet").returns(TypeRef::Str).body(|_, _| Ok(Value::str("hi"))))
            .build();
        let source = "class demo.Greeter$$Intercepted extends demo.Greeter {\n\
                      slot handler: handler;\n\
                      init() = none with passthrough;\n\
                      override greet() -> str from demo.Greeter;\n\
                      }\n";
        let compiler = InProcessCompiler::new();
        let class = compiler
            .compile("demo.Greeter$$Intercepted", &unit_for(source, vec![greeter]))
            .unwrap();

        assert_eq!(class.name(), "demo.Greeter$$Intercepted");
        assert!(compiler.loaded().contains("demo.Greeter$$Intercepted"));
        assert_eq!(compiler.source_of("demo.Greeter$$Intercepted").as_deref(), Some(source));
        assert_eq!(compiler.compile_count(), 1);
    }

    #[test]
    fn test_loaded_types_resolve_without_classpath() {
        let compiler = InProcessCompiler::new();
        compiler.load(ClassBuilder::new("demo.Greeter").build());
        let source = "class demo.Greeter$$Intercepted extends demo.Greeter { slot h: handler; }";
        compiler
            .compile("demo.Greeter$$Intercepted", &unit_for(source, Vec::new()))
            .unwrap();
    }

    #[test]
    fn test_builtins_resolve_by_name() {
        let compiler = InProcessCompiler::with_builtins();
        assert!(compiler.loaded().contains("collections.ArrayList"));
        let source = "use lang.Object;\n\
                      class collections.Stack$$Intercepted extends collections.Stack {\n\
                      slot handler: handler;\n\
                      override pop() -> lang.Object from collections.Stack;\n\
                      }\n";
        let class = compiler
            .compile("collections.Stack$$Intercepted", &unit_for(source, Vec::new()))
            .unwrap();
        assert!(class.is_subclass_of("collections.List"));
    }

    #[test]
    fn test_failed_compile_is_counted_but_not_loaded() {
        let compiler = InProcessCompiler::new();
        let err = compiler
            .compile("demo.Greeter$$Intercepted", &unit_for("class", Vec::new()))
            .unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
        assert_eq!(compiler.compile_count(), 1);
        assert!(compiler.loaded().is_empty());
    }
}
