//! Render cache keyed by post digest
//!
//! Rendering (and code highlighting in particular) is the expensive part of a
//! load cycle. The cache keeps the rendered output of every post together
//! with the digest of the source it came from, so a reload only re-renders
//! files whose digest changed.

use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::config::HighlightConfig;
use crate::content::{BlogPost, RenderedContent};

/// Cache directory, relative to the site base directory
pub const CACHE_DIR: &str = ".blog-cache";

/// Cache file name inside the cache directory
const CACHE_FILE: &str = "db.json";

/// Rendered output of one post and the digest it was rendered from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub digest: String,
    pub rendered: RenderedContent,
}

/// Cache of rendered posts, keyed by post id
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenderCache {
    /// Version of the cache format
    pub version: u32,
    /// Hash of the render settings (changes invalidate every entry)
    pub config_hash: u64,
    pub entries: HashMap<String, CacheEntry>,
}

impl RenderCache {
    /// Current cache format version
    const VERSION: u32 = 1;

    /// Create an empty cache for the given render settings
    pub fn new(highlight: &HighlightConfig) -> Self {
        Self {
            version: Self::VERSION,
            config_hash: hash_highlight_config(highlight),
            entries: HashMap::new(),
        }
    }

    /// Load cache from disk, or create a new empty cache
    pub fn load(base_dir: &Path, highlight: &HighlightConfig) -> Self {
        let cache_path = base_dir.join(CACHE_DIR).join(CACHE_FILE);
        let expected_hash = hash_highlight_config(highlight);

        if let Ok(content) = fs::read_to_string(&cache_path) {
            match serde_json::from_str::<RenderCache>(&content) {
                Ok(cache) if cache.version != Self::VERSION => {
                    tracing::info!("Cache version mismatch, rebuilding cache");
                }
                Ok(cache) if cache.config_hash != expected_hash => {
                    tracing::info!("Render settings changed, rebuilding cache");
                }
                Ok(cache) => {
                    tracing::debug!("Loaded {} cached renders", cache.entries.len());
                    return cache;
                }
                Err(e) => {
                    tracing::warn!("Ignoring unreadable cache {:?}: {}", cache_path, e);
                }
            }
        }

        Self::new(highlight)
    }

    /// Save cache to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let cache_dir = base_dir.join(CACHE_DIR);
        fs::create_dir_all(&cache_dir)?;

        let content = serde_json::to_string(self)?;
        fs::write(cache_dir.join(CACHE_FILE), content)?;
        Ok(())
    }

    /// Rendered output for `id`, only if it was produced from `digest`
    pub fn get(&self, id: &str, digest: &str) -> Option<&RenderedContent> {
        self.entries
            .get(id)
            .filter(|entry| entry.digest == digest)
            .map(|entry| &entry.rendered)
    }

    /// Store the rendered output of a post
    pub fn insert(&mut self, id: &str, digest: &str, rendered: RenderedContent) {
        self.entries.insert(
            id.to_string(),
            CacheEntry {
                digest: digest.to_string(),
                rendered,
            },
        );
    }

    /// Drop entries of posts that no longer exist
    pub fn retain_ids<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        let keep: HashSet<&str> = ids.into_iter().collect();
        self.entries.retain(|id, _| keep.contains(id.as_str()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Calculate the digest of a source file's content
pub fn digest(content: &str) -> String {
    format!("{:016x}", hash_content(content))
}

/// Calculate a hash for file content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

fn hash_highlight_config(highlight: &HighlightConfig) -> u64 {
    let serialized = serde_json::to_string(highlight).unwrap_or_default();
    hash_content(&serialized)
}

/// Differences between two load cycles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: usize,
}

impl ReloadSummary {
    /// Compare the posts of two load cycles by id and digest
    pub fn between(
        previous: &IndexMap<String, BlogPost>,
        current: &IndexMap<String, BlogPost>,
    ) -> Self {
        let mut summary = Self::default();

        for (id, post) in current {
            match previous.get(id) {
                None => summary.added.push(id.clone()),
                Some(old) if old.digest != post.digest => summary.changed.push(id.clone()),
                Some(_) => summary.unchanged += 1,
            }
        }

        summary.removed = previous
            .keys()
            .filter(|id| !current.contains_key(*id))
            .cloned()
            .collect();

        summary
    }

    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.changed.is_empty() || !self.removed.is_empty()
    }

    /// Get a summary string of the changes
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();

        if !self.added.is_empty() {
            parts.push(format!("{} added", self.added.len()));
        }
        if !self.changed.is_empty() {
            parts.push(format!("{} changed", self.changed.len()));
        }
        if !self.removed.is_empty() {
            parts.push(format!("{} removed", self.removed.len()));
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BlogFrontmatter, RenderMetadata};
    use chrono::{TimeZone, Utc};

    fn rendered(html: &str) -> RenderedContent {
        RenderedContent {
            html: html.to_string(),
            metadata: RenderMetadata {
                headings: vec![],
                local_image_paths: vec![],
                remote_image_paths: vec![],
                frontmatter: BlogFrontmatter {
                    title: "T".to_string(),
                    pub_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                    description: String::new(),
                    author: "A".to_string(),
                    tags: vec![],
                    image: None,
                },
                image_paths: vec![],
            },
        }
    }

    #[test]
    fn test_digest_changes_with_content() {
        assert_eq!(digest("hello"), digest("hello"));
        assert_ne!(digest("hello"), digest("hello!"));
        assert_eq!(digest("hello").len(), 16);
    }

    #[test]
    fn test_get_requires_matching_digest() {
        let mut cache = RenderCache::new(&HighlightConfig::default());
        cache.insert("post", "aaaa", rendered("<p>a</p>"));

        assert_eq!(cache.get("post", "aaaa").map(|r| r.html.as_str()), Some("<p>a</p>"));
        assert!(cache.get("post", "bbbb").is_none());
        assert!(cache.get("other", "aaaa").is_none());
    }

    #[test]
    fn test_retain_ids() {
        let mut cache = RenderCache::new(&HighlightConfig::default());
        cache.insert("a", "1", rendered("a"));
        cache.insert("b", "2", rendered("b"));
        cache.retain_ids(["a"]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("a", "1").is_some());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let highlight = HighlightConfig::default();
        let mut cache = RenderCache::new(&highlight);
        cache.insert("post", "abcd", rendered("<p>cached</p>"));
        cache.save(dir.path()).unwrap();

        let loaded = RenderCache::load(dir.path(), &highlight);
        assert_eq!(loaded.get("post", "abcd").map(|r| r.html.as_str()), Some("<p>cached</p>"));

        // Different render settings invalidate the cache
        let other = HighlightConfig {
            line_number: true,
            ..Default::default()
        };
        assert!(RenderCache::load(dir.path(), &other).is_empty());
    }

    #[test]
    fn test_load_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CACHE_DIR)).unwrap();
        fs::write(dir.path().join(CACHE_DIR).join(CACHE_FILE), "not json").unwrap();

        let cache = RenderCache::load(dir.path(), &HighlightConfig::default());
        assert!(cache.is_empty());
        assert_eq!(cache.version, 1);
    }
}
