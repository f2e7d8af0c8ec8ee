//! Summarizer: folds the most recent batch of interactions into a [`SummaryRecord`].

use anyhow::Result;
use std::collections::BTreeMap;

use super::keep_most_recent;
use super::types::{ActivityPattern, InteractionKind, InteractionRecord, SiteCount, SummaryRecord, TimeRange};
use crate::storage::{Storage, SUMMARIES_KEY};

/// Number of sites kept in `topSites`.
pub const TOP_SITES: usize = 5;

/// Whether appending made the log length a positive multiple of `frequency`.
pub fn is_due(log_len: usize, frequency: usize) -> bool {
    frequency > 0 && log_len > 0 && log_len % frequency == 0
}

/// The last `frequency` records of `log`.
pub fn latest_batch(log: &[InteractionRecord], frequency: usize) -> &[InteractionRecord] {
    &log[log.len().saturating_sub(frequency)..]
}

/// Summarize one batch. `None` for an empty batch.
pub fn summarize(batch: &[InteractionRecord], now_ms: i64) -> Option<SummaryRecord> {
    let first = batch.first()?;
    let last = batch.last()?;
    Some(SummaryRecord {
        id: uuid::Uuid::now_v7().to_string(),
        timestamp: now_ms,
        time_range: TimeRange {
            start: Some(first.timestamp),
            end: Some(last.timestamp),
        },
        interactions: batch.len(),
        top_sites: top_sites(batch, TOP_SITES),
        activity_pattern: activity_pattern(batch),
    })
}

/// Hostname frequencies, highest first; ties keep first-encountered order.
/// Records without a parseable URL are skipped.
pub fn top_sites(batch: &[InteractionRecord], n: usize) -> Vec<SiteCount> {
    let mut counts: Vec<SiteCount> = Vec::new();
    for host in batch.iter().filter_map(|r| r.hostname()) {
        match counts.iter_mut().find(|s| s.domain == host) {
            Some(site) => site.count += 1,
            None => counts.push(SiteCount {
                domain: host,
                count: 1,
            }),
        }
    }
    // Stable sort preserves first-encountered order among equal counts.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(n);
    counts
}

/// Full type histogram plus the single most common type
/// (ties go to the type encountered first).
pub fn activity_pattern(batch: &[InteractionRecord]) -> ActivityPattern {
    let mut order: Vec<(InteractionKind, usize)> = Vec::new();
    for kind in batch.iter().map(InteractionRecord::kind) {
        match order.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, count)) => *count += 1,
            None => order.push((kind, 1)),
        }
    }

    let mut most_common: Option<(InteractionKind, usize)> = None;
    for &(kind, count) in &order {
        if most_common.map_or(true, |(_, best)| count > best) {
            most_common = Some((kind, count));
        }
    }

    ActivityPattern {
        most_common_activity: most_common.map(|(kind, _)| kind),
        activity_types: order.into_iter().collect::<BTreeMap<_, _>>(),
    }
}

/// Bounded log of [`SummaryRecord`]s.
#[derive(Clone)]
pub struct SummaryLog {
    storage: Storage,
    cap: usize,
}

impl SummaryLog {
    pub fn new(storage: Storage, cap: usize) -> Self {
        Self { storage, cap }
    }

    pub async fn load(&self) -> Result<Vec<SummaryRecord>> {
        self.storage.get_or_default(SUMMARIES_KEY).await
    }

    /// Append and evict the oldest beyond the cap. Returns the new length.
    pub async fn append(&self, summary: SummaryRecord) -> Result<usize> {
        let mut summaries = self.load().await?;
        summaries.push(summary);
        keep_most_recent(&mut summaries, self.cap);
        self.storage.set(SUMMARIES_KEY, &summaries).await?;
        Ok(summaries.len())
    }

    /// The most recent `limit` summaries, oldest first.
    pub async fn recent(&self, limit: Option<usize>) -> Result<Vec<SummaryRecord>> {
        let mut summaries = self.load().await?;
        if let Some(limit) = limit {
            keep_most_recent(&mut summaries, limit);
        }
        Ok(summaries)
    }

    pub async fn replace(&self, mut summaries: Vec<SummaryRecord>) -> Result<usize> {
        keep_most_recent(&mut summaries, self.cap);
        self.storage.set(SUMMARIES_KEY, &summaries).await?;
        Ok(summaries.len())
    }
}
