//! Create a new post

use anyhow::{bail, Result};
use std::fs;
use std::path::PathBuf;

use crate::BlogSite;

/// Write a new post with a valid front-matter skeleton and return its path
pub fn create_post(site: &BlogSite, title: &str, tags: &[String]) -> Result<PathBuf> {
    let slug = slug::slugify(title);
    if slug.is_empty() {
        bail!("Cannot derive a file name from title {:?}", title);
    }

    fs::create_dir_all(&site.collection_dir)?;
    let file_path = site.collection_dir.join(format!("{}.md", slug));
    if file_path.exists() {
        bail!("Post already exists: {:?}", file_path);
    }

    let front_matter = serde_yaml::to_string(&serde_yaml::Mapping::from_iter([
        ("title".into(), title.into()),
        (
            "pubDate".into(),
            chrono::Utc::now().format("%Y-%m-%d").to_string().into(),
        ),
        ("description".into(), "".into()),
        ("author".into(), site.config.author.as_str().into()),
        (
            "tags".into(),
            serde_yaml::Value::Sequence(tags.iter().map(|t| t.as_str().into()).collect()),
        ),
    ]))?;

    let content = format!("---\n{}---\n\n", front_matter);
    fs::write(&file_path, content)?;

    tracing::info!("Created: {:?}", file_path);
    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::{split_frontmatter, BlogFrontmatter};

    #[test]
    fn test_create_post_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SiteConfig::default();
        config.author = "Jane: Doe".to_string();
        let site = BlogSite::with_config(dir.path(), config);

        let path = create_post(&site, "Hello, World!", &["rust".to_string()]).unwrap();
        assert_eq!(path, site.collection_dir.join("hello-world.md"));

        let content = fs::read_to_string(&path).unwrap();
        let (yaml, body) = split_frontmatter(&content);
        let fm = BlogFrontmatter::validate(&path, yaml).unwrap();
        assert_eq!(fm.title, "Hello, World!");
        assert_eq!(fm.author, "Jane: Doe");
        assert_eq!(fm.tags, vec!["rust"]);
        assert!(body.is_empty());

        assert!(create_post(&site, "Hello World", &[]).is_err());
    }
}
