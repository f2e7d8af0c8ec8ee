//! Full backups of tracking data, and restoring them.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::annotations::{AnnotationStore, ExportBundle};
use crate::config::MindCacheConfig;
use crate::storage::Storage;
use crate::tracking::log::InteractionLog;
use crate::tracking::settings::Settings;
use crate::tracking::summary::SummaryLog;
use crate::tracking::types::{InteractionRecord, SummaryRecord};

/// Backup file: `{interactions, summaries, settings, exportedAt, version}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub interactions: Vec<InteractionRecord>,
    pub summaries: Vec<SummaryRecord>,
    pub settings: Settings,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

impl Backup {
    pub async fn collect(storage: &Storage, config: &MindCacheConfig) -> Result<Self> {
        let log = InteractionLog::from_config(storage.clone(), config);
        let summaries = SummaryLog::new(storage.clone(), config.tracking.summary_cap);
        Ok(Self {
            interactions: log.load().await?,
            summaries: summaries.load().await?,
            settings: Settings::load(storage).await?,
            exported_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

/// What an import changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub interactions: usize,
    pub summaries: usize,
    pub settings: bool,
    pub annotations: usize,
}

/// Restore a [`Backup`], or merge an [`ExportBundle`].
///
/// Backups replace the interaction log, summaries, and settings. Annotation
/// exports add items whose id is not already stored.
pub async fn import_value(
    storage: &Storage,
    config: &MindCacheConfig,
    value: Value,
) -> Result<ImportOutcome> {
    if value.get("interactions").is_some() {
        let backup: Backup = serde_json::from_value(value).context("malformed backup file")?;
        backup
            .settings
            .validate()
            .context("backup contains invalid settings")?;

        let log = InteractionLog::from_config(storage.clone(), config);
        let summaries = SummaryLog::new(storage.clone(), config.tracking.summary_cap);
        let interactions = log.replace(backup.interactions).await?;
        let summary_count = summaries.replace(backup.summaries).await?;
        backup.settings.save(storage).await?;
        return Ok(ImportOutcome {
            interactions,
            summaries: summary_count,
            settings: true,
            annotations: 0,
        });
    }

    if value.get("highlights").is_some() {
        let bundle: ExportBundle =
            serde_json::from_value(value).context("malformed annotation export")?;
        let added = AnnotationStore::new(storage.clone()).merge(&bundle).await?;
        return Ok(ImportOutcome {
            annotations: added,
            ..ImportOutcome::default()
        });
    }

    bail!("unrecognized import file: expected a backup or an annotation export")
}
