//! List posts matching a query

use anyhow::Result;

use crate::catalog::BlogQueryOptions;
use crate::BlogSite;

/// List post summaries, as text lines or as JSON
pub fn run(site: &BlogSite, options: &BlogQueryOptions, json: bool) -> Result<()> {
    let catalog = site.load_catalog()?;
    let summaries = catalog.query(options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("Posts ({}):", summaries.len());
    for summary in &summaries {
        println!(
            "  {} - {} [{}]",
            summary.data.pub_date.format("%Y-%m-%d"),
            summary.data.title,
            summary.id
        );
    }

    Ok(())
}
