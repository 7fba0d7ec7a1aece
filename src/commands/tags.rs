//! List tags with their post counts

use anyhow::Result;

use crate::BlogSite;

pub fn run(site: &BlogSite) -> Result<()> {
    let catalog = site.load_catalog()?;
    let tags = catalog.tags();

    println!("Tags ({}):", tags.len());
    for tag in tags {
        println!("  {} ({})", tag.name, tag.count);
    }

    Ok(())
}
