//! Per-domain annotation counts, as shown on the toolbar badge.

use serde::{Deserialize, Serialize};

use super::types::{AnnotationKind, AnnotationSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCounts {
    pub highlights: usize,
    pub notes: usize,
    pub quotes: usize,
    pub total: usize,
}

impl DomainCounts {
    pub fn new(highlights: usize, notes: usize, quotes: usize) -> Self {
        Self {
            highlights,
            notes,
            quotes,
            total: highlights + notes + quotes,
        }
    }
}

/// Count items whose `domain` field equals `domain` exactly, or every item when
/// `domain` is `None`.
pub fn count_in(set: &AnnotationSet, domain: Option<&str>) -> DomainCounts {
    let count = |kind| {
        set.get(kind)
            .iter()
            .filter(|a| domain.map_or(true, |d| a.domain == d))
            .count()
    };
    DomainCounts::new(
        count(AnnotationKind::Highlight),
        count(AnnotationKind::Note),
        count(AnnotationKind::Quote),
    )
}
