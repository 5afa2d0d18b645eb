//! Syntax tree for proxy descriptors.

use crate::compiler::lexer::Span;
use crate::vm::TypeRef;

/// A dotted name with its location
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Full text
    pub text: String,
    /// Location
    pub span: Span,
}

/// A parsed descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// `use` lines
    pub uses: Vec<Path>,
    /// The class declaration
    pub class: ClassDecl,
}

/// `class Name extends Parent { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    /// Generated type name
    pub name: Path,
    /// Parent type
    pub parent: Path,
    /// Members in declaration order
    pub members: Vec<Member>,
}

/// Class member
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// `slot name: handler;`
    Slot(SlotDecl),
    /// `init(...) = ...;`
    Init(InitDecl),
    /// `override ...;`
    Override(OverrideDecl),
}

/// Handler slot declaration
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDecl {
    /// Field name
    pub name: String,
    /// Location
    pub span: Span,
}

/// Initializer declaration
#[derive(Debug, Clone, PartialEq)]
pub struct InitDecl {
    /// Name of the handler parameter, if any
    pub param: Option<String>,
    /// What the initializer delegates to
    pub target: InitTarget,
    /// Install a pass-through handler
    pub passthrough: bool,
    /// Location
    pub span: Span,
}

/// Delegation target of an initializer
#[derive(Debug, Clone, PartialEq)]
pub enum InitTarget {
    /// No parent initializer runs
    Nothing,
    /// Parent initializer by declaration index, with literal arguments
    Super {
        /// Declaration index in the parent
        index: usize,
        /// Literal arguments
        args: Vec<Literal>,
    },
}

/// Literal default argument
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{:?}", x),
        }
    }
}

/// `override name(params) -> ret [throws ...] from Origin;`
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideDecl {
    /// Operation name
    pub name: String,
    /// Parameter types
    pub params: Vec<TypeRef>,
    /// Last parameter collects remaining arguments
    pub variadic: bool,
    /// Return type
    pub return_type: TypeRef,
    /// Declared failure kind names
    pub throws: Vec<String>,
    /// Class declaring the real implementation
    pub origin: Path,
    /// Location
    pub span: Span,
}

impl OverrideDecl {
    /// `name(params) -> ret` for diagnostics
    pub fn describe(&self) -> String {
        let params: Vec<String> = self.params.iter().map(TypeRef::to_string).collect();
        format!(
            "{}({}{}) -> {}",
            self.name,
            params.join(", "),
            if self.variadic { " ..." } else { "" },
            self.return_type
        )
    }
}
