//! User-editable tracking settings, persisted as one object under `user_settings`.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::storage::{Storage, SETTINGS_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub tracking_enabled: bool,
    /// Days of interaction history to keep, in `[1, 365]`.
    pub data_retention_days: u32,
    /// Batch size for the Summarizer.
    pub summarize_frequency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tracking_enabled: true,
            data_retention_days: 30,
            summarize_frequency: 10,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=365).contains(&self.data_retention_days),
            "dataRetentionDays must be between 1 and 365, got {}",
            self.data_retention_days
        );
        ensure!(
            self.summarize_frequency >= 1,
            "summarizeFrequency must be at least 1"
        );
        Ok(())
    }

    /// Retention window in milliseconds.
    pub fn retention_ms(&self) -> i64 {
        i64::from(self.data_retention_days) * 24 * 60 * 60 * 1000
    }

    /// Stored settings, or defaults when none have been saved.
    pub async fn load(storage: &Storage) -> Result<Self> {
        storage.get_or_default(SETTINGS_KEY).await
    }

    /// Validate then persist.
    pub async fn save(&self, storage: &Storage) -> Result<()> {
        self.validate()?;
        storage.set(SETTINGS_KEY, self).await
    }
}
