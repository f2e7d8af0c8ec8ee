//! Highlight anchoring: re-create highlight markers on a reloaded page.
//!
//! Matching is first-text-node-containing-substring. A highlight whose text no
//! longer appears verbatim in a single text node is not restored, and duplicate
//! occurrences anchor to the earliest node. Both are accepted limitations.
//! The page is reached only through [`PageText`], so a sturdier anchor can be
//! swapped in without touching the annotation store.

pub mod document;

use std::ops::Range;

use serde::Serialize;
use tracing::debug;

use crate::annotations::Annotation;
use crate::error::WrapError;

pub use document::Document;

pub type NodeId = usize;

/// Read access to a page's text nodes plus the one mutation anchoring needs.
pub trait PageText {
    /// Text node ids in document order.
    fn text_nodes(&self) -> Vec<NodeId>;

    fn text_of(&self, node: NodeId) -> Option<&str>;

    /// Wrap the byte range `range` of text node `node` in `marker`. Returns the
    /// marker's node id.
    fn wrap(&mut self, node: NodeId, range: Range<usize>, marker: &Marker) -> Result<NodeId, WrapError>;
}

/// The styled element inserted around restored highlight text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub highlight_id: String,
}

impl Marker {
    pub const CLASS: &'static str = "mindcache-highlighted-text";
    pub const ID_ATTRIBUTE: &'static str = "data-highlight-id";
    pub const STYLE: &'static str =
        "background-color: #ffeb3b; color: #000; padding: 2px 4px; border-radius: 3px";

    pub fn new(highlight_id: impl Into<String>) -> Self {
        Self {
            highlight_id: highlight_id.into(),
        }
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        vec![
            ("class".into(), Self::CLASS.into()),
            ("style".into(), Self::STYLE.into()),
            (Self::ID_ATTRIBUTE.into(), self.highlight_id.clone()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub restored: usize,
    /// Ids of highlights that could not be placed this load.
    pub missed: Vec<String>,
}

/// Restore every highlight in `highlights` whose `url` equals `url`.
///
/// Never fails: highlights that cannot be placed are listed in `missed`.
pub fn restore_highlights<P: PageText + ?Sized>(
    page: &mut P,
    url: &str,
    highlights: &[Annotation],
) -> RestoreReport {
    let mut report = RestoreReport::default();
    for highlight in highlights.iter().filter(|h| h.url == url) {
        if anchor(page, highlight) {
            report.restored += 1;
        } else {
            debug!(id = %highlight.id, "highlight text not found on page");
            report.missed.push(highlight.id.clone());
        }
    }
    report
}

fn anchor<P: PageText + ?Sized>(page: &mut P, highlight: &Annotation) -> bool {
    let needle = highlight.anchor_text();
    if needle.is_empty() {
        return false;
    }
    let marker = Marker::new(&highlight.id);

    let candidates: Vec<(NodeId, usize)> = page
        .text_nodes()
        .into_iter()
        .filter_map(|node| Some((node, page.text_of(node)?.find(needle)?)))
        .collect();

    for (node, start) in candidates {
        match page.wrap(node, start..start + needle.len(), &marker) {
            Ok(_) => return true,
            Err(e) => debug!(id = %highlight.id, node, error = %e, "wrap rejected, trying next node"),
        }
    }
    false
}
