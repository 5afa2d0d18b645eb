//! Proxy descriptor synthesis
//!
//! Renders a [`ProxySpecification`] into descriptor text for the compilation
//! service:
//!
//! ```text
//! // proxy for shapes.Circle
//! use shapes.Circle;
//! use shapes.Shape;
//!
//! class shapes.Circle$$Intercepted extends shapes.Circle {
//!     slot handler: handler;
//!     init() = super#1(0.0) with passthrough;
//!     init(handler) = super#1(0.0);
//!     override area() -> f64 from shapes.Circle;
//!     override name() -> str from shapes.Shape;
//! }
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use crate::proxy::spec::ProxySpecification;
use crate::vm::{Class, PrimitiveKind, TypeRef};

/// Rendered descriptor plus the classes its `use` lines refer to
#[derive(Debug, Clone)]
pub struct RenderedUnit {
    /// Generated type name
    pub unique_name: String,
    /// Descriptor text
    pub source: String,
    /// Names listed in `use` lines
    pub imports: Vec<String>,
    /// Handles for every import, resolvable by name
    pub classpath: Vec<Arc<Class>>,
}

/// Renders proxy specifications into descriptor text
#[derive(Debug, Clone)]
pub struct Synthesizer {
    indent: String,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
        }
    }
}

impl Synthesizer {
    /// Synthesizer with four-space indentation
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `spec`
    pub fn render(&self, spec: &ProxySpecification) -> RenderedUnit {
        let mut out = String::new();
        let imports: Vec<String> = spec
            .dependencies()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        // fmt::Write into a String cannot fail
        let _ = writeln!(out, "// proxy for {}", spec.origin().name());
        for import in &imports {
            let _ = writeln!(out, "use {};", import);
        }
        out.push('\n');

        let _ = writeln!(
            out,
            "class {} extends {} {{",
            spec.unique_name(),
            spec.origin().name()
        );
        let slot = spec.handler_slot();
        let _ = writeln!(out, "{}slot {}: handler;", self.indent, slot);

        // an origin whose initializers are all private gets no init members
        let target = match spec.initializer() {
            Some(init) => {
                let args: Vec<&str> = init.params.iter().map(default_literal).collect();
                Some(format!("super#{}({})", init.index, args.join(", ")))
            }
            None if spec.origin().initializers().is_empty() => Some("none".to_string()),
            None => None,
        };
        if let Some(target) = target {
            let _ = writeln!(out, "{}init() = {} with passthrough;", self.indent, target);
            let _ = writeln!(out, "{}init({}) = {};", self.indent, slot, target);
        }

        for op in spec.operations() {
            let sig = &op.method.signature;
            let params: Vec<String> = sig.params.iter().map(TypeRef::to_string).collect();
            let _ = write!(
                out,
                "{}override {}({}{}) -> {}",
                self.indent,
                sig.name,
                params.join(", "),
                if sig.variadic { " ..." } else { "" },
                sig.return_type
            );
            if !sig.throws.is_empty() {
                let kinds: Vec<&str> = sig.throws.iter().map(|k| k.name()).collect();
                let _ = write!(out, " throws {}", kinds.join(", "));
            }
            let _ = writeln!(out, " from {};", op.origin.name());
        }
        out.push_str("}\n");

        RenderedUnit {
            unique_name: spec.unique_name().to_string(),
            source: out,
            imports,
            classpath: spec.dependencies().to_vec(),
        }
    }
}

/// Zero-equivalent literal for value-like types, `null` otherwise
pub fn default_literal(ty: &TypeRef) -> &'static str {
    match ty {
        TypeRef::Primitive(PrimitiveKind::Bool) => "false",
        TypeRef::Primitive(PrimitiveKind::F64) => "0.0",
        TypeRef::Primitive(_) => "0",
        _ => "null",
    }
}
