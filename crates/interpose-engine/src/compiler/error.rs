//! Compilation diagnostics.

/// Errors produced while compiling a proxy descriptor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// Unrecognized input
    #[error("lex error at {line}:{column}: {message}")]
    Lex {
        /// 1-based line
        line: u32,
        /// 1-based column
        column: u32,
        /// Description
        message: String,
    },

    /// Malformed descriptor
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        /// 1-based line
        line: u32,
        /// 1-based column
        column: u32,
        /// Description
        message: String,
    },

    /// Well-formed descriptor that cannot describe a proxy type
    #[error("invalid unit: {detail}")]
    InvalidUnit {
        /// Description
        detail: String,
    },

    /// A referenced type could not be resolved
    #[error("undefined type {name}")]
    UndefinedType {
        /// Referenced name
        name: String,
    },

    /// An override names an operation its origin does not declare
    #[error("{origin} declares no operation {operation}")]
    UnknownOperation {
        /// Rendered operation
        operation: String,
        /// Named origin
        origin: String,
    },

    /// An override does not match the operation it names
    #[error("override {operation} does not match its origin: {detail}")]
    SignatureMismatch {
        /// Rendered operation
        operation: String,
        /// Description
        detail: String,
    },

    /// An initializer delegates to something it cannot call
    #[error("invalid initializer: {detail}")]
    InvalidInitializer {
        /// Description
        detail: String,
    },

    /// A default literal does not fit its parameter type
    #[error("invalid default literal {literal} for parameter of type {expected}")]
    InvalidDefault {
        /// The literal as written
        literal: String,
        /// Declared parameter type
        expected: String,
    },

    /// The compiler cannot run
    #[error("compilation service unavailable: {reason}")]
    Unavailable {
        /// Description
        reason: String,
    },
}
