//! Event Classifier: decides which raw page events are worth recording.
//!
//! Every function here is pure over the snapshot it is given and the event time
//! the page reported; no timers are involved. Throttling state lives in the small
//! per-page trackers ([`ScrollTracker`], [`FocusTracker`], [`SessionTracker`]).

use super::types::{
    ClickData, ElementInfo, ElementType, FocusData, PageRef, ScrollData, ScrollDirection,
    SelectionData, SessionData,
};

/// Minimum trimmed length for a selection to be recorded as `content_selection`.
pub const CONTENT_SELECTION_MIN_CHARS: usize = 10;
/// Minimum trimmed length for a selection to open the annotation toolbar.
pub const TOOLBAR_SELECTION_MIN_CHARS: usize = 3;
/// Characters of a selection kept in the record.
pub const SELECTION_EXCERPT_CHARS: usize = 200;

const ELEMENT_TEXT_CHARS: usize = 50;
const OWN_TEXT_MIN_CHARS: usize = 2;
const CONTENT_TEXT_MIN_CHARS: usize = 20;

/// Clicks inside these regions are never recorded.
const EXCLUDED_REGIONS: [&str; 3] = ["nav", "header", "footer"];
const CONTENT_AREAS: [&str; 12] = [
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "article", "main", "section", "blockquote", "li",
];

/// What the page reports about a click target.
#[derive(Debug, Clone, Default)]
pub struct ElementSnapshot {
    pub tag_name: String,
    pub id: Option<String>,
    pub class_name: Option<String>,
    /// Text of the element's own child text nodes.
    pub own_text: String,
    /// Full `textContent`, descendants included.
    pub text_content: String,
    pub href: Option<String>,
    pub input_type: Option<String>,
    /// Ancestor tag names, nearest first.
    pub ancestors: Vec<String>,
}

impl ElementSnapshot {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Set both the element's own text and its text content.
    pub fn with_text(mut self, text: &str) -> Self {
        self.own_text = text.to_string();
        self.text_content = text.to_string();
        self
    }

    /// Set only the descendant text content.
    pub fn with_text_content(mut self, text: &str) -> Self {
        self.text_content = text.to_string();
        self
    }

    pub fn with_href(mut self, href: &str) -> Self {
        self.href = Some(href.to_string());
        self
    }

    pub fn with_input_type(mut self, input_type: &str) -> Self {
        self.input_type = Some(input_type.to_string());
        self
    }

    pub fn within(mut self, ancestors: &[&str]) -> Self {
        self.ancestors = ancestors.iter().map(|t| t.to_ascii_lowercase()).collect();
        self
    }

    fn self_or_ancestor_in(&self, tags: &[&str]) -> bool {
        std::iter::once(&self.tag_name)
            .chain(self.ancestors.iter())
            .any(|t| tags.contains(&t.as_str()))
    }

    fn has_href(&self) -> bool {
        self.href.as_deref().is_some_and(|h| !h.trim().is_empty())
    }

    pub fn info(&self) -> ElementInfo {
        let text = self.text_content.trim();
        ElementInfo {
            tag_name: self.tag_name.clone(),
            id: self.id.clone(),
            class_name: self.class_name.clone(),
            text: (!text.is_empty()).then(|| truncate_chars(text, ELEMENT_TEXT_CHARS)),
            href: self.href.clone(),
            input_type: self.input_type.clone(),
        }
    }
}

/// Whether a click on `el` is significant enough to record.
///
/// Navigation chrome (`nav`, `header`, `footer`) is excluded even when the
/// target would otherwise qualify.
pub fn is_significant_click(el: &ElementSnapshot) -> bool {
    if el.self_or_ancestor_in(&EXCLUDED_REGIONS) {
        return false;
    }
    if el.own_text.trim().chars().count() > OWN_TEXT_MIN_CHARS {
        return true;
    }
    if el.has_href() {
        return true;
    }
    if matches!(el.tag_name.as_str(), "button" | "input") {
        return true;
    }
    el.self_or_ancestor_in(&CONTENT_AREAS)
        && el.text_content.trim().chars().count() > CONTENT_TEXT_MIN_CHARS
}

pub fn element_type(el: &ElementSnapshot) -> ElementType {
    let tag = el.tag_name.as_str();
    let input_type = el.input_type.as_deref().unwrap_or("");
    match tag {
        "a" => ElementType::Link,
        _ if el.has_href() => ElementType::Link,
        "button" => ElementType::Button,
        "input" if matches!(input_type, "submit" | "button" | "reset") => ElementType::Button,
        "input" | "textarea" | "select" => ElementType::Input,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => ElementType::Heading,
        "p" => ElementType::Paragraph,
        "img" => ElementType::Image,
        _ if el.self_or_ancestor_in(&CONTENT_AREAS) => ElementType::Content,
        _ => ElementType::Other,
    }
}

/// Classify a click; `None` if it is not meaningful.
pub fn classify_click(
    el: &ElementSnapshot,
    page: &PageRef,
    position: Option<(f64, f64)>,
) -> Option<ClickData> {
    if !is_significant_click(el) {
        return None;
    }
    Some(ClickData {
        page: page.clone(),
        element: el.info(),
        element_type: element_type(el),
        x: position.map(|(x, _)| x),
        y: position.map(|(_, y)| y),
    })
}

/// Classify a text selection against `min_chars` (see the `*_MIN_CHARS` constants).
pub fn classify_selection(text: &str, min_chars: usize, page: &PageRef) -> Option<SelectionData> {
    let trimmed = text.trim();
    let length = trimmed.chars().count();
    if length <= min_chars {
        return None;
    }
    Some(SelectionData {
        page: page.clone(),
        text: truncate_chars(trimmed, SELECTION_EXCERPT_CHARS),
        length,
    })
}

/// Scroll geometry reported by the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollPosition {
    pub scroll_y: f64,
    pub document_height: f64,
    pub viewport_height: f64,
}

impl ScrollPosition {
    pub fn at(scroll_y: f64) -> Self {
        Self {
            scroll_y,
            ..Self::default()
        }
    }

    /// Percentage of the scrollable height, when the page is scrollable.
    pub fn percentage(&self) -> Option<u8> {
        let scrollable = self.document_height - self.viewport_height;
        if scrollable <= 0.0 {
            return None;
        }
        Some((self.scroll_y / scrollable * 100.0).round().clamp(0.0, 100.0) as u8)
    }
}

/// Throttled scroll classifier for one page.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    throttle_ms: i64,
    min_delta: f64,
    last_evaluated_at: Option<i64>,
    last_recorded_y: f64,
}

impl ScrollTracker {
    pub fn new(throttle_ms: i64, min_delta: f64) -> Self {
        Self {
            throttle_ms,
            min_delta,
            last_evaluated_at: None,
            last_recorded_y: 0.0,
        }
    }

    /// Feed one scroll event. At most one event per throttle window is evaluated;
    /// of those, only moves larger than the minimum delta from the last recorded
    /// position are meaningful.
    pub fn observe(&mut self, at_ms: i64, pos: ScrollPosition, page: &PageRef) -> Option<ScrollData> {
        if let Some(last) = self.last_evaluated_at {
            if at_ms - last <= self.throttle_ms {
                return None;
            }
        }
        self.last_evaluated_at = Some(at_ms);

        let delta = pos.scroll_y - self.last_recorded_y;
        if delta.abs() <= self.min_delta {
            return None;
        }

        let direction = if pos.scroll_y > self.last_recorded_y {
            ScrollDirection::Down
        } else {
            ScrollDirection::Up
        };
        self.last_recorded_y = pos.scroll_y;

        Some(ScrollData {
            page: page.clone(),
            scroll_y: pos.scroll_y,
            delta: delta.abs(),
            direction,
            scroll_percentage: pos.percentage(),
        })
    }
}

/// A hidden/visible transition.
#[derive(Debug, Clone, PartialEq)]
pub enum FocusTransition {
    /// Page became hidden; carries how long it had been visible.
    Blur(FocusData),
    /// Page became visible again; carries how long it had been hidden.
    Focus(FocusData),
}

/// Tracks visibility and accumulated focus time for one page.
#[derive(Debug, Clone)]
pub struct FocusTracker {
    visible: bool,
    changed_at: i64,
    focused_total_ms: i64,
}

impl FocusTracker {
    pub fn new(now_ms: i64) -> Self {
        Self {
            visible: true,
            changed_at: now_ms,
            focused_total_ms: 0,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Feed a `visibilitychange`; repeated reports of the same state are ignored.
    pub fn on_visibility_change(&mut self, hidden: bool, now_ms: i64, page: &PageRef) -> Option<FocusTransition> {
        let elapsed = (now_ms - self.changed_at).max(0);
        match (hidden, self.visible) {
            (true, true) => {
                self.visible = false;
                self.changed_at = now_ms;
                self.focused_total_ms += elapsed;
                Some(FocusTransition::Blur(focus_data(page, elapsed)))
            }
            (false, false) => {
                self.visible = true;
                self.changed_at = now_ms;
                Some(FocusTransition::Focus(focus_data(page, elapsed)))
            }
            _ => None,
        }
    }

    /// Navigation away. Returns the final visible stretch if the page was visible.
    pub fn on_leave(&mut self, now_ms: i64, page: &PageRef) -> Option<FocusData> {
        if !self.visible {
            return None;
        }
        let elapsed = (now_ms - self.changed_at).max(0);
        self.focused_total_ms += elapsed;
        self.visible = false;
        self.changed_at = now_ms;
        Some(focus_data(page, elapsed))
    }

    /// Total visible time, including the current stretch.
    pub fn focused_ms(&self, now_ms: i64) -> i64 {
        if self.visible {
            self.focused_total_ms + (now_ms - self.changed_at).max(0)
        } else {
            self.focused_total_ms
        }
    }
}

fn focus_data(page: &PageRef, elapsed_ms: i64) -> FocusData {
    FocusData {
        page: page.clone(),
        duration_ms: elapsed_ms as u64,
    }
}

/// Aggregate engagement for one page visit, emitted once at teardown.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    started_at: i64,
    min_duration_ms: i64,
    clicks: u32,
    scrolls: u32,
    selections: u32,
    max_scroll_depth: u8,
}

impl SessionTracker {
    pub fn new(started_at: i64, min_duration_ms: i64) -> Self {
        Self {
            started_at,
            min_duration_ms,
            clicks: 0,
            scrolls: 0,
            selections: 0,
            max_scroll_depth: 0,
        }
    }

    pub fn record_click(&mut self) {
        self.clicks += 1;
    }

    pub fn record_scroll(&mut self, depth: Option<u8>) {
        self.scrolls += 1;
        if let Some(d) = depth {
            self.max_scroll_depth = self.max_scroll_depth.max(d);
        }
    }

    pub fn record_selection(&mut self) {
        self.selections += 1;
    }

    pub fn has_activity(&self) -> bool {
        self.clicks + self.scrolls + self.selections > 0
    }

    /// The `page_session` payload, if the visit lasted long enough or saw activity.
    pub fn finish(&self, now_ms: i64, focused_ms: i64, page: &PageRef) -> Option<SessionData> {
        let duration = (now_ms - self.started_at).max(0);
        if duration <= self.min_duration_ms && !self.has_activity() {
            return None;
        }
        Some(SessionData {
            page: page.clone(),
            duration_ms: duration as u64,
            focused_ms: focused_ms.max(0) as u64,
            clicks: self.clicks,
            scrolls: self.scrolls,
            selections: self.selections,
            max_scroll_depth: self.max_scroll_depth,
        })
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
