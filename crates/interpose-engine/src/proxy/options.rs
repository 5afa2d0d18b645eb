//! Proxy generation options
//!
//! Options can be built in code or loaded from the `[proxy]` table of a TOML
//! document:
//!
//! ```toml
//! [proxy]
//! handler_slot = "interceptor"
//! allow_raw_allocation = true
//! instantiation = "auto"        # auto | bypass | initializer
//! ```

use serde::{Deserialize, Serialize};

use crate::proxy::error::ConfigError;
use crate::proxy::factory::{InstantiationStrategy, StrategyPreference};

/// How proxy instances are created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstantiationMode {
    /// Allocate without construction, falling back to the generated initializer
    #[default]
    Auto,
    /// Only allocate without construction
    Bypass,
    /// Only run the generated initializer
    Initializer,
}

impl InstantiationMode {
    /// Strategy preference for the instance factory
    pub fn preference(self) -> StrategyPreference {
        match self {
            InstantiationMode::Auto => StrategyPreference::Auto,
            InstantiationMode::Bypass => {
                StrategyPreference::Only(InstantiationStrategy::BypassInitializer)
            }
            InstantiationMode::Initializer => {
                StrategyPreference::Only(InstantiationStrategy::InvokeInitializer)
            }
        }
    }
}

/// Options for proxy generation and instantiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyOptions {
    /// Preferred name of the handler field
    pub handler_slot: String,
    /// Whether instances may be allocated without running an initializer
    pub allow_raw_allocation: bool,
    /// Instantiation strategy selection
    pub instantiation: InstantiationMode,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            handler_slot: "handler".to_string(),
            allow_raw_allocation: true,
            instantiation: InstantiationMode::Auto,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Document {
    #[serde(default)]
    proxy: Option<ProxyOptions>,
}

const RESERVED: &[&str] = &[
    "use", "class", "extends", "slot", "init", "none", "super", "with", "passthrough", "override",
    "throws", "from", "null", "true", "false",
];

impl ProxyOptions {
    /// Load from the `[proxy]` table of a TOML document; a missing table yields defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let doc: Document = toml::from_str(text)?;
        let options = doc.proxy.unwrap_or_default();
        options.validate()?;
        Ok(options)
    }

    /// Check option consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut chars = self.handler_slot.chars();
        let valid_ident = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_ident || RESERVED.contains(&self.handler_slot.as_str()) {
            return Err(ConfigError::InvalidSlotName(self.handler_slot.clone()));
        }
        if self.instantiation == InstantiationMode::Bypass && !self.allow_raw_allocation {
            return Err(ConfigError::BypassDisabled);
        }
        Ok(())
    }

    /// Set the preferred handler field name
    pub fn with_handler_slot(mut self, name: impl Into<String>) -> Self {
        self.handler_slot = name.into();
        self
    }

    /// Enable or disable allocation without construction
    pub fn with_raw_allocation(mut self, allow: bool) -> Self {
        self.allow_raw_allocation = allow;
        self
    }

    /// Set the instantiation mode
    pub fn with_instantiation(mut self, mode: InstantiationMode) -> Self {
        self.instantiation = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_table() {
        let options = ProxyOptions::from_toml_str("").unwrap();
        assert_eq!(options, ProxyOptions::default());
        assert_eq!(options.handler_slot, "handler");
    }

    #[test]
    fn test_partial_table() {
        let options = ProxyOptions::from_toml_str(
            r#"
            [proxy]
            instantiation = "initializer"
            "#,
        )
        .unwrap();
        assert_eq!(options.instantiation, InstantiationMode::Initializer);
        assert!(options.allow_raw_allocation);
    }

    #[test]
    fn test_rejects_bad_slot_names() {
        for name in ["", "9lives", "init", "has space"] {
            let options = ProxyOptions::default().with_handler_slot(name);
            assert!(
                matches!(options.validate(), Err(ConfigError::InvalidSlotName(_))),
                "slot name {:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_bypass_requires_raw_allocation() {
        let text = r#"
            [proxy]
            allow_raw_allocation = false
            instantiation = "bypass"
        "#;
        assert_eq!(ProxyOptions::from_toml_str(text), Err(ConfigError::BypassDisabled));
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let err = ProxyOptions::from_toml_str("[proxy]\nslot = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
