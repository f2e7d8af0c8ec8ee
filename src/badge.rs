//! Badge/count aggregator: per-domain annotation totals on the toolbar icon.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::annotations::counts::count_in;
use crate::annotations::{AnnotationSet, DomainCounts};
use crate::tracking::types::hostname_of;

pub const DEFAULT_TITLE: &str = "MindCache";
const MAX_BADGE_COUNT: usize = 99;
const INTERNAL_SCHEMES: &[&str] = &["chrome://", "chrome-extension://", "about:"];

/// What the toolbar icon shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeState {
    pub text: String,
    pub title: String,
}

impl Default for BadgeState {
    fn default() -> Self {
        Self::cleared()
    }
}

impl BadgeState {
    pub fn cleared() -> Self {
        Self {
            text: String::new(),
            title: DEFAULT_TITLE.to_string(),
        }
    }

    pub fn for_counts(domain: &str, counts: &DomainCounts) -> Self {
        Self {
            text: badge_text(counts.total),
            title: format!(
                "{DEFAULT_TITLE} - {domain}\n{} highlights, {} notes, {} quotes",
                counts.highlights, counts.notes, counts.quotes
            ),
        }
    }
}

/// `""` for zero, `"99+"` above 99, the number otherwise.
pub fn badge_text(total: usize) -> String {
    match total {
        0 => String::new(),
        n if n > MAX_BADGE_COUNT => format!("{MAX_BADGE_COUNT}+"),
        n => n.to_string(),
    }
}

/// Browser-internal pages never show a badge.
pub fn is_internal_page(url: &str) -> bool {
    INTERNAL_SCHEMES.iter().any(|s| url.starts_with(s))
}

/// Where badge updates are sent.
pub trait BadgeSink: Send + Sync {
    fn show(&self, state: &BadgeState);
}

/// Logs every badge change and keeps the last state shown.
#[derive(Default)]
pub struct MemoryBadgeSink {
    last: Mutex<Option<BadgeState>>,
}

impl MemoryBadgeSink {
    pub fn last(&self) -> Option<BadgeState> {
        self.last.lock().ok().and_then(|s| s.clone())
    }
}

impl BadgeSink for MemoryBadgeSink {
    fn show(&self, state: &BadgeState) {
        info!(text = %state.text, title = %state.title, "badge updated");
        if let Ok(mut last) = self.last.lock() {
            *last = Some(state.clone());
        }
    }
}

/// Counts pushed by a content context: `{domain, highlightCount, noteCount,
/// quoteCount, totalActivity}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BadgeUpdate {
    pub domain: String,
    pub highlight_count: usize,
    pub note_count: usize,
    pub quote_count: usize,
    pub total_activity: usize,
}

impl BadgeUpdate {
    pub fn from_counts(domain: &str, counts: &DomainCounts) -> Self {
        Self {
            domain: domain.to_string(),
            highlight_count: counts.highlights,
            note_count: counts.notes,
            quote_count: counts.quotes,
            total_activity: counts.total,
        }
    }
}

/// Tracks the active tab and keeps the badge in step with the annotation store.
pub struct BadgeAggregator {
    sink: Arc<dyn BadgeSink>,
    active_url: Option<String>,
    current: BadgeState,
}

impl BadgeAggregator {
    pub fn new(sink: Arc<dyn BadgeSink>) -> Self {
        Self {
            sink,
            active_url: None,
            current: BadgeState::cleared(),
        }
    }

    pub fn current(&self) -> &BadgeState {
        &self.current
    }

    /// Hostname of the active tab, if it is a regular page.
    pub fn active_domain(&self) -> Option<String> {
        self.active_url
            .as_deref()
            .filter(|url| !is_internal_page(url))
            .and_then(hostname_of)
    }

    pub fn set_active_url(&mut self, url: Option<String>) {
        self.active_url = url;
    }

    /// Recompute from the full annotation set for the active tab's domain.
    pub fn refresh(&mut self, annotations: &AnnotationSet) {
        let state = match self.active_domain() {
            Some(domain) => {
                let counts = count_in(annotations, Some(&domain));
                if counts.total > 0 {
                    BadgeState::for_counts(&domain, &counts)
                } else {
                    BadgeState::cleared()
                }
            }
            None => BadgeState::cleared(),
        };
        self.show(state);
    }

    /// Apply counts pushed by a content context.
    pub fn apply_update(&mut self, update: &BadgeUpdate) {
        let counts = DomainCounts {
            highlights: update.highlight_count,
            notes: update.note_count,
            quotes: update.quote_count,
            total: update.total_activity,
        };
        self.show(BadgeState::for_counts(&update.domain, &counts));
    }

    fn show(&mut self, state: BadgeState) {
        if state == self.current {
            debug!("badge unchanged");
            return;
        }
        self.sink.show(&state);
        self.current = state;
    }
}
