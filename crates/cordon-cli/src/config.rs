use std::path::Path;

use serde::{Deserialize, Serialize};

/// Tunables for the locally assembled blocking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CordonConfig {
    /// Maximum retained audit actions.
    pub audit_capacity: usize,
    /// Bound on one content resolution, in seconds.
    pub resolve_timeout_secs: u64,
    /// TTL for routing block-check verdicts, in seconds.
    pub cache_ttl_secs: u64,
    /// Maximum cached block-check verdicts.
    pub cache_max_entries: usize,
}

impl Default for CordonConfig {
    fn default() -> Self {
        Self {
            audit_capacity: 10_000,
            resolve_timeout_secs: 30,
            cache_ttl_secs: 30,
            cache_max_entries: 65_536,
        }
    }
}

impl CordonConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: CordonConfig = toml::from_str(&contents)?;
        Ok(config)
    }
}
