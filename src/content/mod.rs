//! Content module - front-matter schema, markdown rendering and post loading

mod frontmatter;
pub mod loader;
mod markdown;
mod post;

pub use frontmatter::{parse_date_string, split as split_frontmatter, BlogFrontmatter};
pub use loader::{ContentLoader, LoadReport};
pub use markdown::MarkdownRenderer;
pub use post::{
    is_blog_post, BlogPost, BlogPostParams, BlogPostPath, BlogPostProps, BlogPostSummary,
    Collection, Heading, RenderMetadata, RenderedContent,
};
