use anyhow::Result;

use mindcache::backup::Backup;
use mindcache::config::MindCacheConfig;

/// Print a full backup as JSON to stdout.
pub async fn backup(config: &MindCacheConfig) -> Result<()> {
    let storage = super::open(config)?;
    let backup = Backup::collect(&storage, config).await?;

    println!("{}", serde_json::to_string_pretty(&backup)?);
    eprintln!(
        "Backed up {} interactions and {} summaries.",
        backup.interactions.len(),
        backup.summaries.len()
    );
    Ok(())
}
