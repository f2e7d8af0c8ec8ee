//! Interaction Log: the bounded, append-only store of [`InteractionRecord`]s.
//!
//! Owned by the background service, which is its only writer. Each storage call
//! races a timeout; a timed-out or failed append drops that one record.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use super::keep_most_recent;
use super::types::{InteractionKind, InteractionRecord};
use crate::config::MindCacheConfig;
use crate::error::LogError;
use crate::storage::{Storage, INTERACTIONS_KEY};

/// Optional filters for [`InteractionLog::query`]. All given filters must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionFilter {
    /// Inclusive lower bound, epoch ms.
    pub start_date: Option<i64>,
    /// Inclusive upper bound, epoch ms.
    pub end_date: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<InteractionKind>,
    /// Substring of the record URL's hostname.
    pub domain: Option<String>,
    /// Keep only the most recent `limit` matches.
    pub limit: Option<usize>,
}

impl InteractionFilter {
    pub fn matches(&self, record: &InteractionRecord) -> bool {
        if self.start_date.is_some_and(|start| record.timestamp < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| record.timestamp > end) {
            return false;
        }
        if self.kind.is_some_and(|kind| record.kind() != kind) {
            return false;
        }
        if let Some(domain) = &self.domain {
            return record
                .hostname()
                .is_some_and(|host| host.contains(domain.as_str()));
        }
        true
    }
}

#[derive(Clone)]
pub struct InteractionLog {
    storage: Storage,
    cap: usize,
    timeout: Duration,
}

impl InteractionLog {
    pub fn new(storage: Storage, cap: usize, timeout: Duration) -> Self {
        Self {
            storage,
            cap,
            timeout,
        }
    }

    pub fn from_config(storage: Storage, config: &MindCacheConfig) -> Self {
        Self::new(
            storage,
            config.tracking.interaction_cap,
            config.storage.operation_timeout(),
        )
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T, LogError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(LogError::from),
            Err(_) => Err(LogError::Timeout {
                op,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// The stored log, oldest first.
    pub async fn load(&self) -> Result<Vec<InteractionRecord>, LogError> {
        self.bounded("read", self.storage.get_or_default(INTERACTIONS_KEY))
            .await
    }

    /// Append `record`, keep the most recent `cap` entries, and write back.
    ///
    /// Returns the log as written so the caller can decide whether to summarize.
    pub async fn append(&self, record: InteractionRecord) -> Result<Vec<InteractionRecord>, LogError> {
        let mut records = self.load().await?;
        records.push(record);
        keep_most_recent(&mut records, self.cap);

        self.bounded("write", self.storage.set(INTERACTIONS_KEY, &records))
            .await?;
        Ok(records)
    }

    /// Records matching `filter`, oldest first.
    pub async fn query(&self, filter: &InteractionFilter) -> Result<Vec<InteractionRecord>, LogError> {
        let mut matched: Vec<InteractionRecord> = self
            .load()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        if let Some(limit) = filter.limit {
            keep_most_recent(&mut matched, limit);
        }
        Ok(matched)
    }

    /// Drop records captured before `cutoff_ms`. Returns how many were removed.
    pub async fn prune_older_than(&self, cutoff_ms: i64) -> Result<usize, LogError> {
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| r.timestamp >= cutoff_ms);
        let removed = before - records.len();
        if removed > 0 {
            self.bounded("write", self.storage.set(INTERACTIONS_KEY, &records))
                .await?;
        }
        Ok(removed)
    }

    /// Overwrite the whole log (used by backup import). Still honors the cap.
    pub async fn replace(&self, mut records: Vec<InteractionRecord>) -> Result<usize, LogError> {
        keep_most_recent(&mut records, self.cap);
        self.bounded("write", self.storage.set(INTERACTIONS_KEY, &records))
            .await?;
        Ok(records.len())
    }
}
