use anyhow::Result;

use mindcache::annotations::AnnotationStore;
use mindcache::config::MindCacheConfig;

/// Export annotations for `domain` (or all) as JSON to stdout.
pub async fn export(config: &MindCacheConfig, domain: Option<&str>) -> Result<()> {
    let store = AnnotationStore::new(super::open(config)?);
    let bundle = store.export(domain).await?;

    println!("{}", serde_json::to_string_pretty(&bundle)?);
    eprintln!(
        "Exported {} highlights, {} notes, {} quotes ({} items).",
        bundle.highlights.len(),
        bundle.notes.len(),
        bundle.quotes.len(),
        bundle.total_items
    );
    Ok(())
}
