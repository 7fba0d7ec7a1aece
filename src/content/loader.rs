//! Content loader - loads blog posts from the collection directory

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use indexmap::IndexMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use super::frontmatter::{self, BlogFrontmatter};
use super::{BlogPost, Collection, MarkdownRenderer};
use crate::cache::{self, RenderCache};
use crate::error::LoadError;
use crate::BlogSite;

/// Outcome of one load cycle
///
/// Failures are isolated per file: every file that could be loaded is in
/// `posts`, every file that could not is in `errors`.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Loaded posts by id, in discovery order
    pub posts: IndexMap<String, BlogPost>,
    pub errors: Vec<LoadError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A validated source file that has not been rendered yet
#[derive(Debug)]
struct SourceFile {
    id: String,
    file_path: PathBuf,
    body: String,
    data: BlogFrontmatter,
    digest: String,
}

/// Loads the `blog` collection from disk
#[derive(Clone)]
pub struct ContentLoader {
    base_dir: PathBuf,
    collection_dir: PathBuf,
    pattern: Pattern,
    renderer: Arc<MarkdownRenderer>,
}

impl ContentLoader {
    /// Create a loader for the site's blog collection
    pub fn new(site: &BlogSite) -> Result<Self> {
        let collection = &site.config.collections.blog;
        let pattern = Pattern::new(&collection.pattern)
            .with_context(|| format!("Invalid collection pattern {:?}", collection.pattern))?;

        Ok(Self {
            base_dir: site.base_dir.clone(),
            collection_dir: site.collection_dir.clone(),
            pattern,
            renderer: Arc::new(MarkdownRenderer::with_config(&site.config.highlight)),
        })
    }

    /// Load every matching file, reusing cached renders where digests match
    pub fn load(&self, mut cache: Option<&mut RenderCache>) -> LoadReport {
        let mut report = LoadReport::default();
        let (paths, walk_errors) = self.discover();
        report.errors.extend(walk_errors);

        for path in paths {
            match self.read_source(&path) {
                Ok(source) => {
                    if let Some(err) = duplicate_of(&report.posts, &source) {
                        report.errors.push(err);
                        continue;
                    }
                    let post = self.finish(source, cache.as_deref_mut());
                    report.posts.insert(post.id.clone(), post);
                }
                Err(e) => report.errors.push(e),
            }
        }

        self.complete(&mut report, cache);
        report
    }

    /// Load like [`ContentLoader::load`], reading and rendering files on
    /// blocking tasks of the tokio runtime
    pub async fn load_concurrent(&self, mut cache: Option<&mut RenderCache>) -> LoadReport {
        let mut report = LoadReport::default();
        let (paths, walk_errors) = self.discover();
        report.errors.extend(walk_errors);

        // Read and validate every file
        let mut reads = JoinSet::new();
        for (index, path) in paths.iter().cloned().enumerate() {
            let loader = self.clone();
            reads.spawn_blocking(move || (index, loader.read_source(&path)));
        }
        let sources = collect_indexed(reads, &paths).await;

        // Keep the first file per id, then render what the cache can't serve
        let mut accepted: Vec<Option<BlogPost>> = Vec::new();
        let mut pending = JoinSet::new();
        let mut seen: IndexMap<String, PathBuf> = IndexMap::new();

        for source in sources {
            let source = match source {
                Ok(source) => source,
                Err(e) => {
                    report.errors.push(e);
                    continue;
                }
            };
            if let Some(existing) = seen.get(&source.id) {
                report.errors.push(LoadError::DuplicateId {
                    id: source.id,
                    path: source.file_path,
                    existing: existing.clone(),
                });
                continue;
            }
            seen.insert(source.id.clone(), source.file_path.clone());

            let cached = cache
                .as_deref()
                .and_then(|c| c.get(&source.id, &source.digest))
                .cloned();
            match cached {
                Some(rendered) => accepted.push(Some(assemble(source, rendered))),
                None => {
                    let slot = accepted.len();
                    accepted.push(None);
                    let renderer = Arc::clone(&self.renderer);
                    pending.spawn_blocking(move || {
                        let rendered = renderer.render(&source.body, &source.data);
                        (slot, assemble(source, rendered))
                    });
                }
            }
        }

        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((slot, post)) => {
                    if let Some(cache) = cache.as_deref_mut() {
                        cache.insert(&post.id, &post.digest, post.rendered.clone());
                    }
                    accepted[slot] = Some(post);
                }
                Err(e) => {
                    tracing::error!("Render task failed: {}", e);
                    report.errors.push(LoadError::Io {
                        path: self.collection_dir.clone(),
                        source: std::io::Error::other(format!("render task failed: {}", e)),
                    });
                }
            }
        }

        for post in accepted.into_iter().flatten() {
            report.posts.insert(post.id.clone(), post);
        }

        self.complete(&mut report, cache);
        report
    }

    /// Find all files of the collection, in a stable discovery order
    fn discover(&self) -> (Vec<PathBuf>, Vec<LoadError>) {
        let mut paths = Vec::new();
        let mut errors = Vec::new();

        if !self.collection_dir.exists() {
            tracing::warn!(
                "Collection directory {:?} does not exist",
                self.collection_dir
            );
            return (paths, errors);
        }

        let options = MatchOptions::new();
        for entry in WalkDir::new(&self.collection_dir)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.collection_dir.clone());
                    tracing::warn!("Failed to walk {:?}: {}", path, e);
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                    errors.push(LoadError::Io { path, source });
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = path.strip_prefix(&self.collection_dir).unwrap_or(path);
            if self.pattern.matches_path_with(relative, options) {
                paths.push(path.to_path_buf());
            }
        }

        tracing::debug!("Discovered {} files in {:?}", paths.len(), self.collection_dir);
        (paths, errors)
    }

    /// Read a file, split and validate its front-matter
    fn read_source(&self, path: &Path) -> Result<SourceFile, LoadError> {
        let file_path = path
            .strip_prefix(&self.base_dir)
            .unwrap_or(path)
            .to_path_buf();

        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: file_path.clone(),
            source,
        })?;

        let (yaml, body) = frontmatter::split(&content);
        let data = BlogFrontmatter::validate(&file_path, yaml)?;

        let relative = path.strip_prefix(&self.collection_dir).unwrap_or(path);
        Ok(SourceFile {
            id: post_id(relative),
            file_path,
            body: body.to_string(),
            digest: cache::digest(&content),
            data,
        })
    }

    /// Render a source file, or take its render from the cache
    fn finish(&self, source: SourceFile, cache: Option<&mut RenderCache>) -> BlogPost {
        match cache {
            Some(cache) => {
                let rendered = match cache.get(&source.id, &source.digest) {
                    Some(rendered) => {
                        tracing::trace!("Cache hit for {}", source.id);
                        rendered.clone()
                    }
                    None => {
                        let rendered = self.renderer.render(&source.body, &source.data);
                        cache.insert(&source.id, &source.digest, rendered.clone());
                        rendered
                    }
                };
                assemble(source, rendered)
            }
            None => {
                let rendered = self.renderer.render(&source.body, &source.data);
                assemble(source, rendered)
            }
        }
    }

    fn complete(&self, report: &mut LoadReport, cache: Option<&mut RenderCache>) {
        if let Some(cache) = cache {
            cache.retain_ids(report.posts.keys().map(String::as_str));
        }

        for error in &report.errors {
            tracing::warn!("Skipped {:?}: {}", error.path(), error);
        }
        tracing::info!(
            "Loaded {} posts ({} skipped) from {:?}",
            report.posts.len(),
            report.errors.len(),
            self.collection_dir
        );
    }
}

fn assemble(source: SourceFile, rendered: super::RenderedContent) -> BlogPost {
    BlogPost {
        id: source.id,
        data: source.data,
        body: source.body,
        file_path: source.file_path,
        digest: source.digest,
        rendered,
        collection: Collection::Blog,
    }
}

fn duplicate_of(posts: &IndexMap<String, BlogPost>, source: &SourceFile) -> Option<LoadError> {
    posts.get(&source.id).map(|existing| LoadError::DuplicateId {
        id: source.id.clone(),
        path: source.file_path.clone(),
        existing: existing.file_path.clone(),
    })
}

/// Wait for indexed tasks and return their results in index order
async fn collect_indexed(
    mut tasks: JoinSet<(usize, Result<SourceFile, LoadError>)>,
    paths: &[PathBuf],
) -> Vec<Result<SourceFile, LoadError>> {
    let mut slots: Vec<Option<Result<SourceFile, LoadError>>> =
        paths.iter().map(|_| None).collect();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => tracing::error!("Read task failed: {}", e),
        }
    }

    slots
        .into_iter()
        .zip(paths)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| {
                Err(LoadError::Io {
                    path: path.clone(),
                    source: std::io::Error::other("read task did not complete"),
                })
            })
        })
        .collect()
}

/// Derive a post id from its path relative to the collection directory
///
/// The extension is dropped, every segment is slugified and a trailing
/// `index` segment collapses into its directory.
pub fn post_id(relative: &Path) -> String {
    let without_ext = relative.with_extension("");
    let mut segments: Vec<String> = without_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .map(|part| {
            let slug = slug::slugify(&part);
            if slug.is_empty() {
                part
            } else {
                slug
            }
        })
        .collect();

    if segments.len() > 1 && segments.last().map(String::as_str) == Some("index") {
        segments.pop();
    }

    segments.join("/")
}
