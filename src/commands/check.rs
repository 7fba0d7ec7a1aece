//! Validate every file of the collection

use anyhow::{bail, Result};

use crate::content::ContentLoader;
use crate::BlogSite;

/// Load the collection and report every file that fails to load
///
/// Fails when at least one file was skipped.
pub fn run(site: &BlogSite) -> Result<()> {
    let loader = ContentLoader::new(site)?;
    let report = loader.load(None);

    for error in &report.errors {
        println!("✗ {}", error);
    }

    if report.is_clean() {
        println!("✓ {} posts valid", report.posts.len());
        Ok(())
    } else {
        bail!(
            "{} of {} files failed to load",
            report.errors.len(),
            report.errors.len() + report.posts.len()
        )
    }
}
