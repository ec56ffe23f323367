//! On-disk persistence for the command line front end
//!
//! The core only deals in `ConfigNode` trees. This module stores those trees
//! (and the body catalog) as JSON files under the platform config directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::node::ConfigNode;
use crate::body::{Body, BodyRegistry, FlatTerrain};
use crate::constants::config::{APP_DIR, BODIES_FILENAME, OVERRIDES_FILENAME};

/// Locations of the files the front end reads and writes
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    dir: PathBuf,
}

impl ConfigPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<config dir>/poi-overlay`, or `./poi-overlay` when the platform has none
    pub fn default_dir() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn overrides(&self) -> PathBuf {
        self.dir.join(OVERRIDES_FILENAME)
    }

    pub fn bodies(&self) -> PathBuf {
        self.dir.join(BODIES_FILENAME)
    }
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

/// Body catalog file: physical attributes plus optional terrain peak heights
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyCatalog {
    #[serde(default)]
    pub bodies: Vec<Body>,
    /// Highest terrain point above sea level, by body name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub terrain: HashMap<String, f64>,
}

impl BodyCatalog {
    /// Load the catalog; a missing file is an empty catalog
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Body catalog not found at {:?}, starting with no bodies", path);
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read body catalog from {:?}", path))?;
        let catalog: BodyCatalog = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse body catalog JSON from {:?}", path))?;
        info!("Loaded {} bodies from {:?}", catalog.bodies.len(), path);
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn into_registry(self) -> BodyRegistry {
        BodyRegistry::new(self.bodies, FlatTerrain::new(self.terrain))
    }
}

/// Load a config tree; `None` when the file does not exist yet
pub fn load_tree(path: &Path) -> Result<Option<ConfigNode>> {
    if !path.exists() {
        info!("Config file not found at {:?}, using defaults", path);
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {:?}", path))?;
    let node: ConfigNode = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config JSON from {:?}", path))?;
    Ok(Some(node))
}

pub fn save_tree(path: &Path, node: &ConfigNode) -> Result<()> {
    write_json(path, node)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize config to JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write config to {:?}", path))?;
    info!("Saved config to {:?}", path);
    Ok(())
}
