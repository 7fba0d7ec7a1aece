//! blog-catalog: the content catalog of a markdown blog
//!
//! Markdown files with a YAML front-matter header are loaded from the `blog`
//! collection directory, validated against the collection schema, rendered
//! to HTML with a heading outline and image references, and exposed through
//! a [`catalog::Catalog`] that answers filter, sort and limit queries.

pub mod cache;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use catalog::{BlogQueryOptions, Catalog, SortBy, SortOrder};
pub use error::{CatalogError, LoadError, ValidationError};

/// A blog site rooted at a base directory
#[derive(Debug, Clone)]
pub struct BlogSite {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Directory of the `blog` collection
    pub collection_dir: PathBuf,
}

impl BlogSite {
    /// Open a site directory, reading `_config.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config = config::SiteConfig::load_from_dir(base_dir.as_ref())?;
        Ok(Self::with_config(base_dir, config))
    }

    /// Open a site directory with an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let collection_dir = base_dir.join(&config.collections.blog.base);

        Self {
            config,
            base_dir,
            collection_dir,
        }
    }

    /// Load the catalog, using the on-disk render cache when enabled
    pub fn load_catalog(&self) -> Result<Catalog> {
        let loader = content::ContentLoader::new(self)?;

        if !self.config.cache {
            return Ok(Catalog::from_report(loader.load(None)));
        }

        let mut cache = cache::RenderCache::load(&self.base_dir, &self.config.highlight);
        let report = loader.load(Some(&mut cache));
        if let Err(e) = cache.save(&self.base_dir) {
            tracing::warn!("Failed to save render cache: {}", e);
        }
        Ok(Catalog::from_report(report))
    }
}
