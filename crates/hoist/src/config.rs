//! `hoist.toml` loading

use anyhow::{Context, Result};
use clap::ValueEnum;
use hoist_types::SourceType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "hoist.toml";

/// How input files are parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceTypeSetting {
    #[default]
    Module,
    Script,
    /// Module when the file has `import`/`export`, script otherwise
    Auto,
}

impl SourceTypeSetting {
    pub fn to_source_type(self) -> Option<SourceType> {
        match self {
            SourceTypeSetting::Module => Some(SourceType::Module),
            SourceTypeSetting::Script => Some(SourceType::Script),
            SourceTypeSetting::Auto => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HoistConfig {
    #[serde(default)]
    pub transform: TransformConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformConfig {
    pub source_type: SourceTypeSetting,
    /// File extensions picked up when walking a directory
    pub extensions: Vec<String>,
    /// Path components that exclude a file when walking a directory
    pub exclude: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            source_type: SourceTypeSetting::Module,
            extensions: vec!["js".to_string(), "mjs".to_string(), "cjs".to_string()],
            exclude: vec!["node_modules".to_string()],
        }
    }
}

impl HoistConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid hoist configuration")
    }

    /// Load `explicit`, or the `hoist.toml` next to `input` if there is one,
    /// or the defaults.
    pub fn load(explicit: Option<&Path>, input: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config(input),
        };
        let Some(path) = path else {
            log::debug!("no {} found, using defaults", CONFIG_FILE);
            return Ok(Self::default());
        };

        log::debug!("loading configuration from {}", path.display());
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize configuration")
    }
}

fn find_config(input: &Path) -> Option<PathBuf> {
    let dir = if input.is_dir() { input } else { input.parent()? };
    let candidate = dir.join(CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}
