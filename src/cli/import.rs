use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use mindcache::backup::import_value;
use mindcache::config::MindCacheConfig;

/// Restore a backup file, or merge an annotation export file.
pub async fn import(config: &MindCacheConfig, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
    let value: Value = serde_json::from_str(&json).context("failed to parse import JSON")?;

    let storage = super::open(config)?;
    let outcome = import_value(&storage, config, value).await?;

    if outcome.settings {
        println!(
            "Restored {} interactions, {} summaries and settings.",
            outcome.interactions, outcome.summaries
        );
    } else {
        println!("Imported {} annotations.", outcome.annotations);
    }
    Ok(())
}
