//! Blog post models

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::frontmatter::BlogFrontmatter;

/// The content collection every post belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    #[default]
    #[serde(rename = "blog")]
    Blog,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Blog => "blog",
        }
    }
}

/// One entry of the document outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub depth: u8,
    pub slug: String,
    pub text: String,
}

/// Metadata derived while rendering a post body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetadata {
    pub headings: Vec<Heading>,
    pub local_image_paths: Vec<String>,
    pub remote_image_paths: Vec<String>,
    pub frontmatter: BlogFrontmatter,
    /// Local paths followed by remote ones
    pub image_paths: Vec<String>,
}

/// Rendered HTML and its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedContent {
    pub html: String,
    pub metadata: RenderMetadata,
}

/// A blog post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    /// Unique id derived from the path relative to the collection base
    pub id: String,

    /// Validated front-matter
    pub data: BlogFrontmatter,

    /// Raw markdown after the front-matter block
    pub body: String,

    /// Source path relative to the site base directory
    pub file_path: PathBuf,

    /// Hash of the full source text
    pub digest: String,

    pub rendered: RenderedContent,

    pub collection: Collection,
}

impl BlogPost {
    /// URL slug of the post
    pub fn slug(&self) -> &str {
        &self.id
    }

    /// Reduced projection used for listings
    pub fn summary(&self) -> BlogPostSummary {
        BlogPostSummary {
            id: self.id.clone(),
            slug: self.slug().to_string(),
            data: self.data.clone(),
        }
    }

    /// Check whether the post carries a tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.data.tags.iter().any(|t| t == tag)
    }
}

/// A post without its body or rendered content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPostSummary {
    pub id: String,
    pub slug: String,
    pub data: BlogFrontmatter,
}

/// Route parameters of a post page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPostParams {
    pub slug: String,
}

/// Props handed to a post page
#[derive(Debug, Clone, Serialize)]
pub struct BlogPostProps<'a> {
    pub post: &'a BlogPost,
}

/// A post page to generate
#[derive(Debug, Clone, Serialize)]
pub struct BlogPostPath<'a> {
    pub params: BlogPostParams,
    pub props: BlogPostProps<'a>,
}

/// Structural check that an untyped value has the shape of a blog post
///
/// Requires an object with a string `id`, an object `data`, a string `body`
/// and `collection` equal to `"blog"`.
pub fn is_blog_post(value: &serde_json::Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    object.get("id").is_some_and(|v| v.is_string())
        && object.get("data").is_some_and(|v| v.is_object())
        && object.get("body").is_some_and(|v| v.is_string())
        && object.get("collection").and_then(|v| v.as_str()) == Some(Collection::Blog.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_blog_post() {
        assert!(is_blog_post(&json!({
            "id": "x",
            "data": {},
            "body": "",
            "collection": "blog"
        })));
        assert!(!is_blog_post(&json!({})));
    }

    #[test]
    fn test_is_blog_post_rejects_wrong_shapes() {
        assert!(!is_blog_post(&json!(null)));
        assert!(!is_blog_post(&json!("blog")));
        assert!(!is_blog_post(&json!({
            "id": "x", "data": {}, "body": "", "collection": "docs"
        })));
        assert!(!is_blog_post(&json!({
            "id": 1, "data": {}, "body": "", "collection": "blog"
        })));
        assert!(!is_blog_post(&json!({
            "id": "x", "data": [], "body": "", "collection": "blog"
        })));
        assert!(!is_blog_post(&json!({
            "id": "x", "data": {}, "collection": "blog"
        })));
    }

    #[test]
    fn test_collection_serializes_as_literal() {
        assert_eq!(serde_json::to_value(Collection::Blog).unwrap(), json!("blog"));
        let parsed: Collection = serde_json::from_value(json!("blog")).unwrap();
        assert_eq!(parsed, Collection::Blog);
        assert!(serde_json::from_value::<Collection>(json!("docs")).is_err());
    }
}
