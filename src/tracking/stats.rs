use anyhow::Result;
use chrono::{Local, TimeZone};
use serde::Serialize;
use std::collections::BTreeMap;

use super::types::{InteractionRecord, SiteCount};
use crate::annotations::{AnnotationKind, AnnotationSet, AnnotationStore};
use crate::storage::{Storage, INTERACTIONS_KEY, SUMMARIES_KEY};

/// Number of domains kept in `topDomains`.
pub const TOP_DOMAINS: usize = 10;

/// Response from `getStats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub total_interactions: usize,
    pub total_summaries: usize,
    pub total_highlights: usize,
    pub total_notes: usize,
    pub total_quotes: usize,
    pub today: TodayCounts,
    pub top_domains: Vec<SiteCount>,
    /// Interaction types plus `highlights`, `notes`, `quotes`.
    pub activity_types: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodayCounts {
    pub interactions: usize,
    pub highlights: usize,
    pub notes: usize,
    pub quotes: usize,
}

/// Epoch ms of the most recent local midnight.
pub fn local_midnight_ms() -> i64 {
    let today = Local::now().date_naive();
    today
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

/// Compute statistics over everything in `storage`.
///
/// If `domain` is provided, interactions are filtered by hostname substring and
/// annotations by exact domain.
pub async fn activity_stats(storage: &Storage, domain: Option<&str>) -> Result<ActivityStats> {
    let mut interactions: Vec<InteractionRecord> = storage.get_or_default(INTERACTIONS_KEY).await?;
    let summaries: Vec<serde_json::Value> = storage.get_or_default(SUMMARIES_KEY).await?;
    let mut annotations = AnnotationStore::new(storage.clone()).load_all().await?;

    if let Some(d) = domain {
        interactions.retain(|r| r.hostname().is_some_and(|h| h.contains(d)));
        annotations = annotations.filtered(Some(d));
    }

    Ok(compute_stats(
        &interactions,
        summaries.len(),
        &annotations,
        local_midnight_ms(),
    ))
}

/// Pure aggregation behind [`activity_stats`].
pub fn compute_stats(
    interactions: &[InteractionRecord],
    total_summaries: usize,
    annotations: &AnnotationSet,
    today_start_ms: i64,
) -> ActivityStats {
    let since_midnight = |kind: AnnotationKind| {
        annotations
            .get(kind)
            .iter()
            .filter(|a| a.timestamp.timestamp_millis() >= today_start_ms)
            .count()
    };
    let today = TodayCounts {
        interactions: interactions
            .iter()
            .filter(|r| r.timestamp >= today_start_ms)
            .count(),
        highlights: since_midnight(AnnotationKind::Highlight),
        notes: since_midnight(AnnotationKind::Note),
        quotes: since_midnight(AnnotationKind::Quote),
    };

    let mut activity_types: BTreeMap<String, usize> = BTreeMap::new();
    for record in interactions {
        *activity_types.entry(record.kind().to_string()).or_insert(0) += 1;
    }
    for kind in AnnotationKind::ALL {
        activity_types.insert(kind.as_str().to_string(), annotations.get(kind).len());
    }

    ActivityStats {
        total_interactions: interactions.len(),
        total_summaries,
        total_highlights: annotations.highlights.len(),
        total_notes: annotations.notes.len(),
        total_quotes: annotations.quotes.len(),
        today,
        top_domains: top_domains(interactions, annotations, TOP_DOMAINS),
        activity_types,
        last_updated: interactions.iter().map(|r| r.timestamp).max(),
    }
}

/// Interaction hostnames and annotation domains counted together, highest
/// first; ties keep first-encountered order.
fn top_domains(interactions: &[InteractionRecord], annotations: &AnnotationSet, n: usize) -> Vec<SiteCount> {
    let hosts = interactions.iter().filter_map(|r| r.hostname());
    let annotation_domains = AnnotationKind::ALL
        .into_iter()
        .flat_map(|kind| annotations.get(kind).iter().map(|a| a.domain.clone()));

    let mut counts: Vec<SiteCount> = Vec::new();
    for domain in hosts.chain(annotation_domains).filter(|d| !d.is_empty()) {
        match counts.iter_mut().find(|s| s.domain == domain) {
            Some(site) => site.count += 1,
            None => counts.push(SiteCount { domain, count: 1 }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(n);
    counts
}
