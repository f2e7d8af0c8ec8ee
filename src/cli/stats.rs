use anyhow::Result;

use mindcache::config::MindCacheConfig;
use mindcache::tracking::stats::activity_stats;

/// Display activity statistics in the terminal.
pub async fn stats(config: &MindCacheConfig, domain: Option<&str>) -> Result<()> {
    let storage = super::open(config)?;
    let stats = activity_stats(&storage, domain).await?;

    println!("Activity Statistics{}", domain.map(|d| format!(" ({d})")).unwrap_or_default());
    println!("{}", "=".repeat(40));
    println!("  Interactions:        {} ({} today)", stats.total_interactions, stats.today.interactions);
    println!("  Summaries:           {}", stats.total_summaries);
    println!("  Highlights:          {} ({} today)", stats.total_highlights, stats.today.highlights);
    println!("  Notes:               {} ({} today)", stats.total_notes, stats.today.notes);
    println!("  Quotes:              {} ({} today)", stats.total_quotes, stats.today.quotes);
    println!();

    println!("Top Domains:");
    if stats.top_domains.is_empty() {
        println!("  (none)");
    }
    for site in &stats.top_domains {
        println!("  {:<32} {}", site.domain, site.count);
    }
    println!();

    println!("By Type:");
    for (kind, count) in &stats.activity_types {
        println!("  {:<20} {}", kind, count);
    }

    if let Some(ts) = stats.last_updated.and_then(chrono::DateTime::from_timestamp_millis) {
        println!();
        println!("Last interaction:      {}", ts.to_rfc3339());
    }

    Ok(())
}
