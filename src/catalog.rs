//! Survey catalog: the sector and headwind registries a survey runs against.
//!
//! Category data is host configuration. It is read from a TOML file with
//! `[[sectors]]` and `[[headwinds]]` tables, or taken from the bundled
//! `categories.toml` when no path is configured.

use crate::error::{ConferenceBotError, Result};
use crate::registry::{CategoryDefinition, CategoryRegistry};
use serde::Deserialize;
use std::path::Path;

const BUNDLED_CATEGORIES: &str = include_str!("../categories.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    sectors: Vec<CategoryDefinition>,
    headwinds: Vec<CategoryDefinition>,
}

/// Both registries a conference survey needs.
#[derive(Debug, Clone)]
pub struct SurveyCatalog {
    pub sectors: CategoryRegistry,
    pub headwinds: CategoryRegistry,
}

impl SurveyCatalog {
    pub fn new(sectors: CategoryRegistry, headwinds: CategoryRegistry) -> Self {
        Self { sectors, headwinds }
    }

    /// Parse catalog TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        Ok(Self {
            sectors: CategoryRegistry::new("sector", file.sectors)?,
            headwinds: CategoryRegistry::new("challenge", file.headwinds)?,
        })
    }

    /// Load a catalog file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConferenceBotError::Io {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let catalog = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            sectors = catalog.sectors.len(),
            headwinds = catalog.headwinds.len(),
            "loaded category catalog"
        );
        Ok(catalog)
    }

    /// The catalog shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_toml_str(BUNDLED_CATEGORIES)
    }
}
