//! Show a single post

use anyhow::Result;

use crate::BlogSite;

/// Print a full post as JSON, or only its rendered HTML
pub fn run(site: &BlogSite, id: &str, html_only: bool) -> Result<()> {
    let catalog = site.load_catalog()?;
    let post = catalog.get(id)?;

    if html_only {
        print!("{}", post.rendered.html);
    } else {
        println!("{}", serde_json::to_string_pretty(post)?);
    }

    Ok(())
}
