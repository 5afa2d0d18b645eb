//! Loading proxy options for the CLI.

use std::path::Path;

use anyhow::Context;
use interpose_engine::ProxyOptions;
use tracing::debug;

/// Options file looked up in the working directory
pub const DEFAULT_CONFIG: &str = "interpose.toml";

/// Options from `path`, or from `./interpose.toml` when present, or defaults
pub fn load_options(path: Option<&Path>) -> anyhow::Result<ProxyOptions> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG).exists() => Path::new(DEFAULT_CONFIG),
        None => return Ok(ProxyOptions::default()),
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let options = ProxyOptions::from_toml_str(&text)
        .with_context(|| format!("invalid options in {}", path.display()))?;
    debug!(config = %path.display(), ?options, "loaded options");
    Ok(options)
}
