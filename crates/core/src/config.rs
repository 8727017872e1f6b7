//! TOML-based configuration for the Slate binary.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlateError};

/// Top-level Slate configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlateConfig {
    pub slate: SlateSection,
}

/// Core instance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlateSection {
    pub instance_name: String,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Database backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "/var/lib/slate/slate.db".into()
}

impl SlateConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| SlateError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// A minimal default configuration for `slate init`.
    pub fn default_toml(instance_name: &str, db_path: &str) -> String {
        format!(
            "[slate]\ninstance_name = \"{instance_name}\"\n\n[slate.database]\npath = \"{db_path}\"\n"
        )
    }
}
