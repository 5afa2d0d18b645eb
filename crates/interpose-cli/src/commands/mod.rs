//! Subcommand implementations.

pub mod inspect;
pub mod render;
pub mod types;

use std::sync::Arc;

use anyhow::anyhow;
use interpose_engine::{builtins, Class};

/// Built-in type by full name
pub fn resolve_type(name: &str) -> anyhow::Result<Arc<Class>> {
    builtins::lookup(name).ok_or_else(|| {
        let known: Vec<String> = builtins::all().iter().map(|c| c.name().to_string()).collect();
        anyhow!("unknown type {} (known types: {})", name, known.join(", "))
    })
}
