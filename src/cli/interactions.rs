use anyhow::Result;

use mindcache::config::MindCacheConfig;
use mindcache::tracking::log::{InteractionFilter, InteractionLog};

/// Query the interaction log and print matches as JSON lines.
pub async fn interactions(config: &MindCacheConfig, filter: &InteractionFilter) -> Result<()> {
    let log = InteractionLog::from_config(super::open(config)?, config);
    let records = log.query(filter).await?;

    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    eprintln!("{} interactions matched.", records.len());
    Ok(())
}
