//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the config file looked up in the site base directory
pub const CONFIG_FILE: &str = "_config.yml";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,

    // Content
    #[serde(default)]
    pub collections: CollectionsConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Cache
    pub cache: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Blog".to_string(),
            description: String::new(),
            author: String::new(),
            collections: CollectionsConfig::default(),
            highlight: HighlightConfig::default(),
            cache: true,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        tracing::debug!("Loaded config from {:?}", path.as_ref());
        Ok(config)
    }

    /// Load `_config.yml` from a base directory, falling back to defaults
    pub fn load_from_dir<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Registry of content collections known to the site
///
/// Only the `blog` collection exists; it is passed explicitly to the loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionsConfig {
    pub blog: CollectionConfig,
}

/// Where a collection's files live and which of them belong to it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Base directory, relative to the site base directory
    pub base: String,
    /// Glob pattern matched against paths relative to `base`
    pub pattern: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            base: "src/blog".to_string(),
            pattern: "**/*.md".to_string(),
        }
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enable: bool,
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: true,
            theme: "base16-ocean.dark".to_string(),
            line_number: false,
        }
    }
}
