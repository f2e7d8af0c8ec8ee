use anyhow::Result;

use mindcache::annotations::AnnotationStore;
use mindcache::badge::BadgeState;
use mindcache::config::MindCacheConfig;

/// Print annotation counts for `domain`, or for everything.
pub async fn counts(config: &MindCacheConfig, domain: Option<&str>) -> Result<()> {
    let store = AnnotationStore::new(super::open(config)?);
    let counts = store.counts(domain).await?;

    println!("{:<12} {}", "highlights", counts.highlights);
    println!("{:<12} {}", "notes", counts.notes);
    println!("{:<12} {}", "quotes", counts.quotes);
    println!("{:<12} {}", "total", counts.total);

    if let Some(domain) = domain {
        let badge = BadgeState::for_counts(domain, &counts);
        println!();
        println!("Badge: {:?}", badge.text);
    }
    Ok(())
}
