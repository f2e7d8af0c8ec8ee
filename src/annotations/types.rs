//! Annotation data model: highlights, notes, and quotes.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{HIGHLIGHTS_KEY, NOTES_KEY, QUOTES_KEY};
use crate::tracking::types::hostname_of;

/// The three annotation collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    #[serde(rename = "highlights")]
    Highlight,
    #[serde(rename = "notes")]
    Note,
    #[serde(rename = "quotes")]
    Quote,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 3] = [Self::Highlight, Self::Note, Self::Quote];

    /// Collection name as used on the wire (`dataType`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Highlight => "highlights",
            Self::Note => "notes",
            Self::Quote => "quotes",
        }
    }

    pub fn storage_key(&self) -> &'static str {
        match self {
            Self::Highlight => HIGHLIGHTS_KEY,
            Self::Note => NOTES_KEY,
            Self::Quote => QUOTES_KEY,
        }
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnnotationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "highlights" | "highlight" => Ok(Self::Highlight),
            "notes" | "note" => Ok(Self::Note),
            "quotes" | "quote" => Ok(Self::Quote),
            _ => Err(format!("unknown annotation kind: {s}")),
        }
    }
}

/// Where on the page a selection was made.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surrounding_text: Option<SurroundingText>,
}

/// Viewport coordinates of the selection's top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Up to [`SurroundingText::MAX_CHARS`] characters on each side of a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurroundingText {
    pub before: String,
    pub after: String,
}

impl SurroundingText {
    pub const MAX_CHARS: usize = 50;
}

/// Variant-specific payload. Notes carry an anchor plus the user's text;
/// highlights and quotes carry only the selected text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationBody {
    Note {
        #[serde(rename = "selectedText")]
        selected_text: String,
        #[serde(rename = "noteText", alias = "content")]
        note_text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<SelectionContext>,
    },
    Excerpt {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<SelectionContext>,
    },
}

/// Page identity captured when an annotation is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIdentity {
    pub url: String,
    pub domain: String,
    pub title: String,
}

impl PageIdentity {
    pub fn new(url: &str, title: &str) -> Result<Self> {
        let domain = hostname_of(url).with_context(|| format!("no hostname in url: {url}"))?;
        Ok(Self {
            url: url.to_string(),
            domain,
            title: title.to_string(),
        })
    }
}

/// A highlight, note, or quote. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub url: String,
    pub domain: String,
    #[serde(default)]
    pub title: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: AnnotationBody,
}

impl Annotation {
    fn on_page(page: &PageIdentity, body: AnnotationBody) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            url: page.url.clone(),
            domain: page.domain.clone(),
            title: page.title.clone(),
            timestamp: Utc::now(),
            body,
        }
    }

    pub fn highlight(page: &PageIdentity, text: &str) -> Self {
        Self::on_page(
            page,
            AnnotationBody::Excerpt {
                text: text.to_string(),
                context: None,
            },
        )
    }

    pub fn quote(page: &PageIdentity, text: &str) -> Self {
        Self::highlight(page, text)
    }

    pub fn note(page: &PageIdentity, selected_text: &str, note_text: &str) -> Self {
        Self::on_page(
            page,
            AnnotationBody::Note {
                selected_text: selected_text.to_string(),
                note_text: note_text.to_string(),
                context: None,
            },
        )
    }

    pub fn with_context(mut self, ctx: SelectionContext) -> Self {
        match &mut self.body {
            AnnotationBody::Note { context, .. } | AnnotationBody::Excerpt { context, .. } => {
                *context = Some(ctx);
            }
        }
        self
    }

    /// The page text this annotation is anchored to.
    pub fn anchor_text(&self) -> &str {
        match &self.body {
            AnnotationBody::Note { selected_text, .. } => selected_text,
            AnnotationBody::Excerpt { text, .. } => text,
        }
    }

    /// Whether this item's shape belongs in the `kind` collection.
    pub fn fits(&self, kind: AnnotationKind) -> bool {
        matches!(
            (kind, &self.body),
            (AnnotationKind::Note, AnnotationBody::Note { .. })
                | (AnnotationKind::Highlight | AnnotationKind::Quote, AnnotationBody::Excerpt { .. })
        )
    }
}

/// All three collections, as read together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    pub highlights: Vec<Annotation>,
    pub notes: Vec<Annotation>,
    pub quotes: Vec<Annotation>,
}

impl AnnotationSet {
    pub fn get(&self, kind: AnnotationKind) -> &[Annotation] {
        match kind {
            AnnotationKind::Highlight => &self.highlights,
            AnnotationKind::Note => &self.notes,
            AnnotationKind::Quote => &self.quotes,
        }
    }

    pub fn len(&self) -> usize {
        self.highlights.len() + self.notes.len() + self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Only the items whose `domain` equals `domain`; everything when `None`.
    pub fn filtered(&self, domain: Option<&str>) -> AnnotationSet {
        let keep = |items: &[Annotation]| -> Vec<Annotation> {
            items
                .iter()
                .filter(|a| domain.map_or(true, |d| a.domain == d))
                .cloned()
                .collect()
        };
        AnnotationSet {
            highlights: keep(&self.highlights),
            notes: keep(&self.notes),
            quotes: keep(&self.quotes),
        }
    }
}

/// Downloadable export: `{domain, timestamp, highlights, notes, quotes, totalItems}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    /// The requested domain, or `"all"`.
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    pub highlights: Vec<Annotation>,
    pub notes: Vec<Annotation>,
    pub quotes: Vec<Annotation>,
    pub total_items: usize,
}

impl ExportBundle {
    pub fn new(domain: Option<&str>, set: AnnotationSet, timestamp: DateTime<Utc>) -> Self {
        let total_items = set.len();
        Self {
            domain: domain.unwrap_or("all").to_string(),
            timestamp,
            highlights: set.highlights,
            notes: set.notes,
            quotes: set.quotes,
            total_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> PageIdentity {
        PageIdentity::new("https://example.com/post", "A Post").unwrap()
    }

    #[test]
    fn identity_requires_hostname() {
        assert_eq!(page().domain, "example.com");
        assert!(PageIdentity::new("not a url", "x").is_err());
    }

    #[test]
    fn note_wire_shape_and_content_alias() {
        let note = Annotation::note(&page(), "anchor text", "my thought");
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["selectedText"], "anchor text");
        assert_eq!(value["noteText"], "my thought");
        assert_eq!(value["domain"], "example.com");

        let from_dashboard: Annotation = serde_json::from_value(json!({
            "id": "n1",
            "url": "https://example.com/post",
            "domain": "example.com",
            "title": "A Post",
            "timestamp": "2025-01-02T03:04:05.000Z",
            "selectedText": "anchor",
            "content": "written elsewhere",
            "context": {}
        }))
        .unwrap();
        assert!(from_dashboard.fits(AnnotationKind::Note));
        assert_eq!(from_dashboard.anchor_text(), "anchor");
    }

    #[test]
    fn excerpt_parses_and_fits_highlight_and_quote() {
        let item: Annotation = serde_json::from_value(json!({
            "id": "h1",
            "url": "https://example.com/post",
            "domain": "example.com",
            "title": "A Post",
            "timestamp": "2025-01-02T03:04:05Z",
            "text": "quick brown"
        }))
        .unwrap();
        assert!(item.fits(AnnotationKind::Highlight));
        assert!(item.fits(AnnotationKind::Quote));
        assert!(!item.fits(AnnotationKind::Note));
        assert_eq!(item.anchor_text(), "quick brown");
    }

    #[test]
    fn context_attaches_to_either_body() {
        let ctx = SelectionContext {
            tag_name: Some("P".into()),
            surrounding_text: Some(SurroundingText {
                before: "The".into(),
                after: "fox".into(),
            }),
            ..Default::default()
        };
        let h = Annotation::highlight(&page(), "quick").with_context(ctx.clone());
        match h.body {
            AnnotationBody::Excerpt { context, .. } => assert_eq!(context, Some(ctx)),
            _ => panic!("expected excerpt"),
        }
    }

    #[test]
    fn kind_names() {
        assert_eq!(AnnotationKind::Highlight.storage_key(), "mindcache-highlights");
        assert_eq!("notes".parse::<AnnotationKind>().unwrap(), AnnotationKind::Note);
        assert_eq!(serde_json::to_value(AnnotationKind::Quote).unwrap(), "quotes");
        assert!("bookmarks".parse::<AnnotationKind>().is_err());
    }

    #[test]
    fn export_bundle_defaults_domain_to_all() {
        let bundle = ExportBundle::new(None, AnnotationSet::default(), Utc::now());
        assert_eq!(bundle.domain, "all");
        assert_eq!(bundle.total_items, 0);
        let value = serde_json::to_value(&bundle).unwrap();
        assert!(value.get("totalItems").is_some());
    }
}
