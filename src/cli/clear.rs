//! CLI `clear` command: bulk-delete one annotation collection after confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use mindcache::annotations::{AnnotationKind, AnnotationStore};
use mindcache::config::MindCacheConfig;

/// Delete all `kind` items for `domain` (or everywhere). Prompts unless `yes`.
pub async fn clear(
    config: &MindCacheConfig,
    kind: AnnotationKind,
    domain: Option<&str>,
    yes: bool,
) -> Result<()> {
    let scope = domain.map_or_else(|| "ALL domains".to_string(), |d| d.to_string());

    if !yes {
        println!("WARNING: This will permanently delete {kind} for {scope}.");
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("clear cancelled");
        }
    }

    let store = AnnotationStore::new(super::open(config)?);
    let removed = store.clear(kind, domain).await?;

    println!("Removed {removed} {kind} for {scope}.");
    Ok(())
}
