//! The loaded blog collection and the queries it answers

mod query;

pub use query::{BlogQueryOptions, SortBy, SortOrder};

use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

use crate::cache::{RenderCache, ReloadSummary};
use crate::content::{
    BlogPost, BlogPostParams, BlogPostPath, BlogPostProps, BlogPostSummary, ContentLoader,
    LoadReport,
};
use crate::error::{CatalogError, CatalogResult, LoadError};
use crate::BlogSite;

/// A tag and the number of posts carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: usize,
}

/// Immutable view over one load cycle of the `blog` collection
#[derive(Debug, Default)]
pub struct Catalog {
    posts: IndexMap<String, BlogPost>,
    errors: Vec<LoadError>,
}

impl Catalog {
    /// Load the collection of a site without a render cache
    pub fn load(site: &BlogSite) -> Result<Self> {
        let loader = ContentLoader::new(site)?;
        Ok(Self::from_report(loader.load(None)))
    }

    pub fn from_report(report: LoadReport) -> Self {
        Self {
            posts: report.posts,
            errors: report.errors,
        }
    }

    /// Run a fresh load cycle and report what changed since this one
    pub fn reload(
        &self,
        loader: &ContentLoader,
        cache: Option<&mut RenderCache>,
    ) -> (Self, ReloadSummary) {
        let next = Self::from_report(loader.load(cache));
        let summary = next.changes_since(self);
        (next, summary)
    }

    /// Posts added, changed or removed relative to an earlier catalog
    pub fn changes_since(&self, previous: &Catalog) -> ReloadSummary {
        ReloadSummary::between(&previous.posts, &self.posts)
    }

    /// All posts in discovery order
    pub fn posts(&self) -> impl Iterator<Item = &BlogPost> {
        self.posts.values()
    }

    /// Per-file errors of the load cycle that produced this catalog
    pub fn errors(&self) -> &[LoadError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Fetch a full post by id (its slug)
    pub fn get(&self, id: &str) -> CatalogResult<&BlogPost> {
        let key = id.trim_matches('/');
        self.posts
            .get(key)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Filter, sort and limit the posts, returning summaries
    pub fn query(&self, options: &BlogQueryOptions) -> CatalogResult<Vec<BlogPostSummary>> {
        let posts = options.apply(self.posts.values())?;
        tracing::debug!("Query {:?} matched {} posts", options, posts.len());
        Ok(posts.into_iter().map(BlogPost::summary).collect())
    }

    /// Every tag with its post count, most used first
    pub fn tags(&self) -> Vec<TagCount> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for post in self.posts.values() {
            let mut seen = Vec::new();
            for tag in &post.data.tags {
                // A tag listed twice on one post counts once
                if !seen.contains(&tag) {
                    seen.push(tag);
                    *counts.entry(tag.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(name, count)| TagCount {
                name: name.to_string(),
                count,
            })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        tags
    }

    /// One page path per post
    pub fn static_paths(&self) -> Vec<BlogPostPath<'_>> {
        self.posts
            .values()
            .map(|post| BlogPostPath {
                params: BlogPostParams {
                    slug: post.slug().to_string(),
                },
                props: BlogPostProps { post },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::is_blog_post;
    use std::fs;
    use std::path::Path;

    struct Fixture<'a> {
        name: &'a str,
        title: &'a str,
        date: &'a str,
        author: &'a str,
        tags: &'a [&'a str],
    }

    const FIXTURES: &[Fixture] = &[
        Fixture { name: "ownership.md", title: "Ownership", date: "2024-03-10", author: "ana", tags: &["rust", "memory"] },
        Fixture { name: "async.md", title: "Async Rust", date: "2024-05-02", author: "ben", tags: &["rust", "async"] },
        Fixture { name: "css-grid.md", title: "CSS Grid", date: "2023-11-20", author: "ana", tags: &["web", "css"] },
        Fixture { name: "wasm.md", title: "Bringing Rust to the Web", date: "2024-01-15", author: "ben", tags: &["rust", "web"] },
        Fixture { name: "zig.md", title: "A Look at Zig", date: "2024-05-02", author: "cy", tags: &[] },
    ];

    fn write(blog: &Path, fixture: &Fixture) {
        let tags = if fixture.tags.is_empty() {
            "[]".to_string()
        } else {
            format!("[{}]", fixture.tags.join(", "))
        };
        let content = format!(
            "---\ntitle: {}\npubDate: {}\ndescription: d\nauthor: {}\ntags: {}\n---\n\nText.\n",
            fixture.title, fixture.date, fixture.author, tags
        );
        fs::write(blog.join(fixture.name), content).unwrap();
    }

    fn catalog() -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let blog = dir.path().join("src/blog");
        fs::create_dir_all(&blog).unwrap();
        for fixture in FIXTURES {
            write(&blog, fixture);
        }
        let site = BlogSite::with_config(dir.path(), SiteConfig::default());
        let catalog = Catalog::load(&site).unwrap();
        (dir, catalog)
    }

    fn ids(summaries: &[BlogPostSummary]) -> Vec<&str> {
        summaries.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_load_all_posts() {
        let (_dir, catalog) = catalog();
        assert_eq!(catalog.len(), 5);
        assert!(catalog.errors().is_empty());
        for post in catalog.posts() {
            let value = serde_json::to_value(post).unwrap();
            assert!(is_blog_post(&value));
            assert_eq!(value["collection"], "blog");
            assert!(value["rendered"]["metadata"]["headings"].is_array());
        }
    }

    #[test]
    fn test_query_without_options_keeps_discovery_order() {
        let (_dir, catalog) = catalog();
        let all = catalog.query(&BlogQueryOptions::new()).unwrap();
        assert_eq!(
            ids(&all),
            vec!["async", "css-grid", "ownership", "wasm", "zig"]
        );
        assert_eq!(all[0].slug, "async");
    }

    #[test]
    fn test_query_by_tag() {
        let (_dir, catalog) = catalog();
        let results = catalog.query(&BlogQueryOptions::new().tag("rust")).unwrap();
        assert_eq!(ids(&results), vec!["async", "ownership", "wasm"]);
        assert!(results.iter().all(|s| s.data.tags.contains(&"rust".to_string())));
    }

    #[test]
    fn test_query_by_all_tags() {
        let (_dir, catalog) = catalog();
        let results = catalog
            .query(&BlogQueryOptions::new().tags(["rust", "web"]))
            .unwrap();
        assert_eq!(ids(&results), vec!["wasm"]);

        let empty = catalog
            .query(&BlogQueryOptions::new().tags(Vec::<String>::new()))
            .unwrap();
        assert_eq!(empty.len(), 5);
    }

    #[test]
    fn test_query_by_author() {
        let (_dir, catalog) = catalog();
        let results = catalog.query(&BlogQueryOptions::new().author("ana")).unwrap();
        assert_eq!(ids(&results), vec!["css-grid", "ownership"]);

        let combined = catalog
            .query(&BlogQueryOptions::new().author("ben").tag("web"))
            .unwrap();
        assert_eq!(ids(&combined), vec!["wasm"]);
    }

    #[test]
    fn test_sort_by_date_desc() {
        let (_dir, catalog) = catalog();
        let results = catalog
            .query(&BlogQueryOptions::new().sort(SortBy::PubDate, SortOrder::Desc))
            .unwrap();
        assert_eq!(results.len(), 5);
        for pair in results.windows(2) {
            assert!(pair[0].data.pub_date >= pair[1].data.pub_date);
        }
        // Equal dates keep discovery order
        assert_eq!(ids(&results), vec!["async", "zig", "ownership", "wasm", "css-grid"]);
    }

    #[test]
    fn test_sort_by_title() {
        let (_dir, catalog) = catalog();
        let results = catalog
            .query(&BlogQueryOptions::new().sort(SortBy::Title, SortOrder::Asc))
            .unwrap();
        let titles: Vec<_> = results.iter().map(|s| s.data.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["A Look at Zig", "Async Rust", "Bringing Rust to the Web", "CSS Grid", "Ownership"]
        );
    }

    #[test]
    fn test_limit_after_sort() {
        let (_dir, catalog) = catalog();
        let results = catalog
            .query(
                &BlogQueryOptions::new()
                    .sort(SortBy::PubDate, SortOrder::Asc)
                    .limit(2),
            )
            .unwrap();
        assert_eq!(ids(&results), vec!["css-grid", "wasm"]);

        let unsorted = catalog.query(&BlogQueryOptions::new().limit(2)).unwrap();
        assert_eq!(ids(&unsorted), vec!["async", "css-grid"]);

        let none = catalog.query(&BlogQueryOptions::new().limit(0)).unwrap();
        assert!(none.is_empty());

        let more = catalog.query(&BlogQueryOptions::new().limit(50)).unwrap();
        assert_eq!(more.len(), 5);
    }

    #[test]
    fn test_negative_limit_is_invalid_argument() {
        let (_dir, catalog) = catalog();
        let err = catalog.query(&BlogQueryOptions::new().limit(-3)).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidArgument(_)));
    }

    #[test]
    fn test_get_post() {
        let (_dir, catalog) = catalog();
        let post = catalog.get("wasm").unwrap();
        assert_eq!(post.data.title, "Bringing Rust to the Web");
        assert!(post.rendered.html.contains("<p>Text.</p>"));
        assert_eq!(catalog.get("/wasm/").unwrap().id, "wasm");

        assert_eq!(
            catalog.get("missing").unwrap_err(),
            CatalogError::NotFound("missing".to_string())
        );
    }

    #[test]
    fn test_tags() {
        let (_dir, catalog) = catalog();
        let tags = catalog.tags();
        assert_eq!(tags[0], TagCount { name: "rust".to_string(), count: 3 });
        assert_eq!(tags[1], TagCount { name: "web".to_string(), count: 2 });
        let rest: Vec<_> = tags[2..].iter().map(|t| t.name.as_str()).collect();
        assert_eq!(rest, vec!["async", "css", "memory"]);
    }

    #[test]
    fn test_static_paths() {
        let (_dir, catalog) = catalog();
        let paths = catalog.static_paths();
        assert_eq!(paths.len(), 5);
        assert_eq!(paths[0].params.slug, "async");
        assert_eq!(paths[0].props.post.id, "async");
    }

    #[test]
    fn test_reload_summary() {
        let (dir, catalog) = catalog();
        let blog = dir.path().join("src/blog");
        let site = BlogSite::with_config(dir.path(), SiteConfig::default());
        let loader = ContentLoader::new(&site).unwrap();

        fs::remove_file(blog.join("zig.md")).unwrap();
        write(
            &blog,
            &Fixture { name: "css-grid.md", title: "CSS Grid, revised", date: "2023-11-20", author: "ana", tags: &["web"] },
        );
        write(
            &blog,
            &Fixture { name: "traits.md", title: "Traits", date: "2024-06-01", author: "ana", tags: &["rust"] },
        );

        let (next, summary) = catalog.reload(&loader, None);
        assert_eq!(next.len(), 5);
        assert_eq!(summary.added, vec!["traits"]);
        assert_eq!(summary.changed, vec!["css-grid"]);
        assert_eq!(summary.removed, vec!["zig"]);
        assert_eq!(summary.unchanged, 3);
        assert!(summary.has_changes());
        assert_eq!(summary.describe(), "1 added, 1 changed, 1 removed");
        assert_eq!(next.get("css-grid").unwrap().data.title, "CSS Grid, revised");
    }
}
