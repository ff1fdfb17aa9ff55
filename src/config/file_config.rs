use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::stats::FieldCapabilities;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub catalog_base_url: Option<String>,
    pub dev_role_header: Option<String>,

    /// Optional `[capabilities]` table, partial tables fill in with the
    /// defaults (everything enabled).
    pub capabilities: Option<FieldCapabilities>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
