//! Proxy configuration errors.

use crate::compiler::CompileError;

/// Errors raised while generating or instantiating a proxy type.
///
/// These are configuration errors: they are raised immediately and never
/// retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProxyError {
    /// Target has no name of its own
    #[error("cannot proxy an anonymous type ({name})")]
    AnonymousType {
        /// Full name of the rejected type
        name: String,
    },

    /// Target is nested and not visible outside its enclosing type
    #[error("cannot proxy non-exported nested type {name}")]
    NonExportedNestedType {
        /// Full name of the rejected type
        name: String,
    },

    /// Target cannot be extended
    #[error("cannot proxy sealed type {name}")]
    SealedType {
        /// Full name of the rejected type
        name: String,
    },

    /// Nested target offers no initializer a derived type could call
    #[error("cannot proxy nested type {name}: no accessible initializer")]
    NoAccessibleInitializer {
        /// Full name of the rejected type
        name: String,
    },

    /// The rendered proxy descriptor failed to compile
    #[error("failed to compile proxy type {name}: {source}")]
    Compile {
        /// Unique name of the generated type
        name: String,
        /// Compiler diagnostic
        #[source]
        source: CompileError,
    },

    /// Every instantiation strategy failed
    #[error("cannot instantiate {type_name}: {}", .attempts.join("; "))]
    Instantiation {
        /// Generated type name
        type_name: String,
        /// One entry per attempted strategy, naming it and why it failed
        attempts: Vec<String>,
    },

    /// A generated-type operation was asked of an ordinary class
    #[error("{name} is not a generated proxy type")]
    NotAProxyType {
        /// Full name of the class
        name: String,
    },

    /// Capability proxy requested for a class implementing no interface
    #[error("{name} implements no capability interface")]
    NoCapabilityInterfaces {
        /// Full name of the class
        name: String,
    },

    /// Invalid proxy options
    #[error("invalid proxy configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while loading [`ProxyOptions`](crate::proxy::ProxyOptions).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Malformed TOML or wrong value types
    #[error("{0}")]
    Toml(String),

    /// Handler slot name is not a valid identifier
    #[error("invalid handler slot name {0:?}")]
    InvalidSlotName(String),

    /// Forced bypass strategy with raw allocation disabled
    #[error("instantiation = \"bypass\" requires allow_raw_allocation = true")]
    BypassDisabled,
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err.message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_message() {
        let err = ProxyError::AnonymousType {
            name: "pkg.Outer$1".into(),
        };
        assert!(err.to_string().starts_with("cannot proxy an anonymous type"));
    }

    #[test]
    fn test_instantiation_lists_attempts() {
        let err = ProxyError::Instantiation {
            type_name: "pkg.A$$Intercepted".into(),
            attempts: vec!["bypass: disabled".into(), "initializer: boom".into()],
        };
        assert_eq!(
            err.to_string(),
            "cannot instantiate pkg.A$$Intercepted: bypass: disabled; initializer: boom"
        );
    }
}
