use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::MapError;

/// Options that control how call sites are rewritten
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteOptions {
    /// Wrap inlined object mappings in a null guard (default: true)
    #[serde(default = "default_true")]
    pub null_propagation: bool,

    /// Name prefix for generated projection parameters (default: "map_")
    #[serde(default = "default_parameter_prefix")]
    pub projection_parameter_prefix: String,
}

fn default_true() -> bool {
    true
}

fn default_parameter_prefix() -> String {
    "map_".to_string()
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            null_propagation: true,
            projection_parameter_prefix: default_parameter_prefix(),
        }
    }
}

/// Main mapper configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapperConfig {
    #[serde(default)]
    pub rewrite_options: RewriteOptions,
}

impl MapperConfig {
    /// Load configuration from a JSON file, or YAML when the extension is
    /// `.yaml` or `.yml`
    pub fn from_file(path: &Path) -> Result<Self, MapError> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| MapError::Config(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| MapError::Config(e.to_string()))?
        };
        Ok(config)
    }

    /// Create a default configuration and write it to a file
    pub fn init_file(path: &Path) -> Result<(), MapError> {
        let json = MapperConfig::default().to_json_string()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String, MapError> {
        serde_json::to_string_pretty(self).map_err(|e| MapError::Config(e.to_string()))
    }
}
