//! Interaction data model.
//!
//! [`InteractionEvent`] is a sum type keyed by the interaction `type`; each variant
//! carries its own payload shape under `data`. [`InteractionRecord`] adds the
//! identity and capture time, and serializes as `{id, type, data, timestamp}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The fixed vocabulary of interaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    PageVisit,
    TabSwitch,
    MeaningfulClick,
    MeaningfulScroll,
    ContentSelection,
    FormSubmit,
    ReadingSession,
    PageSession,
    PageFocus,
    PageBlur,
    PageLeave,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 11] = [
        Self::PageVisit,
        Self::TabSwitch,
        Self::MeaningfulClick,
        Self::MeaningfulScroll,
        Self::ContentSelection,
        Self::FormSubmit,
        Self::ReadingSession,
        Self::PageSession,
        Self::PageFocus,
        Self::PageBlur,
        Self::PageLeave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageVisit => "page_visit",
            Self::TabSwitch => "tab_switch",
            Self::MeaningfulClick => "meaningful_click",
            Self::MeaningfulScroll => "meaningful_scroll",
            Self::ContentSelection => "content_selection",
            Self::FormSubmit => "form_submit",
            Self::ReadingSession => "reading_session",
            Self::PageSession => "page_session",
            Self::PageFocus => "page_focus",
            Self::PageBlur => "page_blur",
            Self::PageLeave => "page_leave",
        }
    }

    /// Kinds forwarded to the analytics endpoint.
    pub fn is_analyzed(&self) -> bool {
        matches!(
            self,
            Self::ReadingSession | Self::PageSession | Self::MeaningfulClick | Self::ContentSelection
        )
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown interaction type: {s}"))
    }
}

/// Page identity merged into every payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<i64>,
}

impl PageRef {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            title: Some(title.into()),
            tab_id: None,
        }
    }

    /// Hostname of `url`, or `None` when missing or unparseable.
    pub fn hostname(&self) -> Option<String> {
        self.url.as_deref().and_then(hostname_of)
    }
}

/// Hostname of an absolute URL.
pub fn hostname_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Compact description of a DOM element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub tag_name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default, rename = "type")]
    pub input_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Link,
    Button,
    Input,
    Heading,
    Paragraph,
    Image,
    Content,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitData {
    #[serde(flatten)]
    pub page: PageRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickData {
    #[serde(flatten)]
    pub page: PageRef,
    pub element: ElementInfo,
    pub element_type: ElementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollData {
    #[serde(flatten)]
    pub page: PageRef,
    pub scroll_y: f64,
    pub delta: f64,
    pub direction: ScrollDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_percentage: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionData {
    #[serde(flatten)]
    pub page: PageRef,
    /// Leading excerpt of the selection.
    pub text: String,
    /// Length of the full trimmed selection, in characters.
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    #[serde(flatten)]
    pub page: PageRef,
    pub form: ElementInfo,
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusData {
    #[serde(flatten)]
    pub page: PageRef,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(flatten)]
    pub page: PageRef,
    pub duration_ms: u64,
    pub focused_ms: u64,
    pub clicks: u32,
    pub scrolls: u32,
    pub selections: u32,
    /// Deepest scroll position reached, as a percentage of the scrollable height.
    pub max_scroll_depth: u8,
}

/// A classified interaction, tagged by `type` with its payload under `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InteractionEvent {
    PageVisit(VisitData),
    TabSwitch(VisitData),
    MeaningfulClick(ClickData),
    MeaningfulScroll(ScrollData),
    ContentSelection(SelectionData),
    FormSubmit(FormData),
    ReadingSession(SessionData),
    PageSession(SessionData),
    PageFocus(FocusData),
    PageBlur(FocusData),
    PageLeave(FocusData),
}

impl InteractionEvent {
    /// Build an event from a wire `action` and its loosely-typed `data`.
    pub fn from_parts(kind: InteractionKind, data: Value) -> Result<Self, serde_json::Error> {
        let data = match data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        serde_json::from_value(serde_json::json!({ "type": kind, "data": data }))
    }

    pub fn kind(&self) -> InteractionKind {
        match self {
            Self::PageVisit(_) => InteractionKind::PageVisit,
            Self::TabSwitch(_) => InteractionKind::TabSwitch,
            Self::MeaningfulClick(_) => InteractionKind::MeaningfulClick,
            Self::MeaningfulScroll(_) => InteractionKind::MeaningfulScroll,
            Self::ContentSelection(_) => InteractionKind::ContentSelection,
            Self::FormSubmit(_) => InteractionKind::FormSubmit,
            Self::ReadingSession(_) => InteractionKind::ReadingSession,
            Self::PageSession(_) => InteractionKind::PageSession,
            Self::PageFocus(_) => InteractionKind::PageFocus,
            Self::PageBlur(_) => InteractionKind::PageBlur,
            Self::PageLeave(_) => InteractionKind::PageLeave,
        }
    }

    pub fn page(&self) -> &PageRef {
        match self {
            Self::PageVisit(d) | Self::TabSwitch(d) => &d.page,
            Self::MeaningfulClick(d) => &d.page,
            Self::MeaningfulScroll(d) => &d.page,
            Self::ContentSelection(d) => &d.page,
            Self::FormSubmit(d) => &d.page,
            Self::ReadingSession(d) | Self::PageSession(d) => &d.page,
            Self::PageFocus(d) | Self::PageBlur(d) | Self::PageLeave(d) => &d.page,
        }
    }

    pub fn page_mut(&mut self) -> &mut PageRef {
        match self {
            Self::PageVisit(d) | Self::TabSwitch(d) => &mut d.page,
            Self::MeaningfulClick(d) => &mut d.page,
            Self::MeaningfulScroll(d) => &mut d.page,
            Self::ContentSelection(d) => &mut d.page,
            Self::FormSubmit(d) => &mut d.page,
            Self::ReadingSession(d) | Self::PageSession(d) => &mut d.page,
            Self::PageFocus(d) | Self::PageBlur(d) | Self::PageLeave(d) => &mut d.page,
        }
    }

    /// The `data` payload as JSON.
    pub fn data(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove("data").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

/// One entry of the Interaction Log. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: String,
    #[serde(flatten)]
    pub event: InteractionEvent,
    /// Capture time, epoch milliseconds.
    pub timestamp: i64,
}

impl InteractionRecord {
    pub fn new(event: InteractionEvent, timestamp: i64) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            event,
            timestamp,
        }
    }

    pub fn kind(&self) -> InteractionKind {
        self.event.kind()
    }

    pub fn hostname(&self) -> Option<String> {
        self.event.page().hostname()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCount {
    pub domain: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPattern {
    pub most_common_activity: Option<InteractionKind>,
    pub activity_types: BTreeMap<InteractionKind, usize>,
}

/// Rollup of one batch of interactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub id: String,
    pub timestamp: i64,
    pub time_range: TimeRange,
    /// Number of records summarized.
    pub interactions: usize,
    pub top_sites: Vec<SiteCount>,
    pub activity_pattern: ActivityPattern,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_serializes_with_type_and_data() {
        let event = InteractionEvent::ContentSelection(SelectionData {
            page: PageRef::new("https://docs.rs/tokio", "tokio"),
            text: "a selected sentence".into(),
            length: 19,
        });
        let record = InteractionRecord::new(event, 1_700_000_000_000);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["type"], "content_selection");
        assert_eq!(value["data"]["url"], "https://docs.rs/tokio");
        assert_eq!(value["data"]["length"], 19);
        assert_eq!(value["timestamp"], 1_700_000_000_000i64);

        let back: InteractionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn from_parts_accepts_missing_data_for_visits() {
        let event = InteractionEvent::from_parts(InteractionKind::PageVisit, Value::Null).unwrap();
        assert_eq!(event.kind(), InteractionKind::PageVisit);
        assert!(event.page().url.is_none());
    }

    #[test]
    fn from_parts_rejects_mismatched_payload() {
        let err = InteractionEvent::from_parts(
            InteractionKind::MeaningfulScroll,
            json!({"url": "https://example.com"}),
        );
        assert!(err.is_err());
    }

    #[test]
    fn kind_parses_from_wire_names() {
        for kind in InteractionKind::ALL {
            assert_eq!(kind.as_str().parse::<InteractionKind>().unwrap(), kind);
        }
        assert!("click".parse::<InteractionKind>().is_err());
    }

    #[test]
    fn hostname_skips_invalid_urls() {
        assert_eq!(hostname_of("https://news.ycombinator.com/item?id=1").as_deref(), Some("news.ycombinator.com"));
        assert_eq!(hostname_of("not a url"), None);
        assert_eq!(PageRef::default().hostname(), None);
    }
}
