//! Reload the catalog whenever collection files change

use anyhow::Result;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cache::RenderCache;
use crate::catalog::Catalog;
use crate::content::ContentLoader;
use crate::BlogSite;

/// Watch the collection directory and reload on every change
pub async fn run(site: &BlogSite) -> Result<()> {
    let loader = ContentLoader::new(site)?;
    let mut cache = if site.config.cache {
        RenderCache::load(&site.base_dir, &site.config.highlight)
    } else {
        RenderCache::new(&site.config.highlight)
    };

    let mut catalog = Catalog::from_report(loader.load_concurrent(Some(&mut cache)).await);
    persist(site, &cache);

    let (tx, mut rx) = mpsc::unbounded_channel();

    // Create debouncer to avoid multiple rapid reloads
    let mut debouncer = new_debouncer(Duration::from_millis(300), move |res: DebounceEventResult| {
        let _ = tx.send(res);
    })?;
    debouncer
        .watcher()
        .watch(&site.collection_dir, RecursiveMode::Recursive)?;

    println!(
        "Watching {} posts in {}. Press Ctrl+C to stop.",
        catalog.len(),
        site.collection_dir.display()
    );

    while let Some(res) = rx.recv().await {
        match res {
            Ok(events) => {
                let relevant = events.iter().any(|e| {
                    let path_str = e.path.to_string_lossy();
                    !path_str.contains(".git")
                        && !path_str.contains(".DS_Store")
                        && !path_str.ends_with('~')
                });
                if !relevant {
                    continue;
                }

                let next = Catalog::from_report(loader.load_concurrent(Some(&mut cache)).await);
                let summary = next.changes_since(&catalog);
                persist(site, &cache);

                if summary.has_changes() {
                    tracing::info!("Reloaded: {}", summary.describe());
                    for id in summary.added.iter().chain(&summary.changed) {
                        println!("📝 {}", id);
                    }
                    for id in &summary.removed {
                        println!("🗑  {}", id);
                    }
                }
                for error in next.errors() {
                    println!("❌ {}", error);
                }

                catalog = next;
            }
            Err(e) => {
                tracing::error!("Watch error: {:?}", e);
            }
        }
    }

    Ok(())
}

fn persist(site: &BlogSite, cache: &RenderCache) {
    if !site.config.cache {
        return;
    }
    if let Err(e) = cache.save(&site.base_dir) {
        tracing::warn!("Failed to save render cache: {}", e);
    }
}
