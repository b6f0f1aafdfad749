use std::path::Path;

use tracing::debug;

use crate::schema::Config;

/// Load and validate a configuration file.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let config = load_str(&raw)
        .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", path.display()))?;
    debug!(path = %path.display(), servers = config.servers.len(), "loaded config");
    Ok(config)
}

/// Parse and validate a configuration document from a string.
pub fn load_str(raw: &str) -> anyhow::Result<Config> {
    let config: Config = serde_json::from_str(raw)?;
    config.validate()?;
    Ok(config)
}
