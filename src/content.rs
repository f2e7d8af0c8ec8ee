//! Per-page tracking context.
//!
//! Owns the page's classifier state and an optional handle to the background.
//! Interaction messages are sent without waiting; nothing here panics or returns
//! transport errors for them. A missing handle means tracking silently no-ops.

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::anchoring::{self, PageText, RestoreReport};
use crate::annotations::{Annotation, AnnotationKind, PageIdentity, SelectionContext};
use crate::background::{BackgroundHandle, Message, Response, TabInfo};
use crate::config::TrackingConfig;
use crate::error::MessageError;
use crate::tracking::classifier::{
    classify_click, classify_selection, ElementSnapshot, FocusTracker, FocusTransition,
    ScrollPosition, ScrollTracker, SessionTracker, CONTENT_SELECTION_MIN_CHARS,
    TOOLBAR_SELECTION_MIN_CHARS,
};
use crate::tracking::types::{FormData, InteractionEvent, PageRef};

/// Outcome of a request that reached (or tried to reach) the background.
#[derive(Debug, Clone)]
pub enum Delivery {
    Delivered(Response),
    /// The background is gone or was never reachable. Not an error.
    Disconnected,
}

/// Send `message` and fold a closed channel into [`Delivery::Disconnected`].
pub async fn deliver(
    handle: &BackgroundHandle,
    message: Message,
    sender: Option<TabInfo>,
) -> Result<Delivery, MessageError> {
    match handle.request_from(message, sender).await {
        Ok(response) => Ok(Delivery::Delivered(response)),
        Err(MessageError::Disconnected) => Ok(Delivery::Disconnected),
        Err(e) => Err(e),
    }
}

pub struct ContentContext {
    page: PageRef,
    handle: Option<BackgroundHandle>,
    scroll: ScrollTracker,
    focus: FocusTracker,
    session: SessionTracker,
    in_flight: Vec<JoinHandle<()>>,
}

impl ContentContext {
    /// Start tracking `page` at `now_ms`.
    pub fn init(
        page: PageRef,
        handle: Option<BackgroundHandle>,
        config: &TrackingConfig,
        now_ms: i64,
    ) -> Self {
        if handle.is_none() {
            warn!("extension transport not available, tracking disabled for this page");
        }
        info!(url = ?page.url, "content context initialized");
        Self {
            page,
            handle,
            scroll: ScrollTracker::new(config.scroll_throttle_ms, config.scroll_min_delta_px),
            focus: FocusTracker::new(now_ms),
            session: SessionTracker::new(now_ms, config.session_min_duration_ms),
            in_flight: Vec::new(),
        }
    }

    pub fn page(&self) -> &PageRef {
        &self.page
    }

    pub fn on_click(&mut self, target: &ElementSnapshot, position: Option<(f64, f64)>) -> bool {
        let Some(data) = classify_click(target, &self.page, position) else {
            return false;
        };
        self.session.record_click();
        self.send(InteractionEvent::MeaningfulClick(data));
        true
    }

    pub fn on_scroll(&mut self, at_ms: i64, position: ScrollPosition) -> bool {
        let Some(data) = self.scroll.observe(at_ms, position, &self.page) else {
            return false;
        };
        self.session.record_scroll(data.scroll_percentage);
        self.send(InteractionEvent::MeaningfulScroll(data));
        true
    }

    pub fn on_selection(&mut self, text: &str) -> bool {
        let Some(data) = classify_selection(text, CONTENT_SELECTION_MIN_CHARS, &self.page) else {
            return false;
        };
        self.session.record_selection();
        self.send(InteractionEvent::ContentSelection(data));
        true
    }

    pub fn on_visibility_change(&mut self, hidden: bool, now_ms: i64) {
        let event = match self.focus.on_visibility_change(hidden, now_ms, &self.page) {
            Some(FocusTransition::Blur(data)) => InteractionEvent::PageBlur(data),
            Some(FocusTransition::Focus(data)) => InteractionEvent::PageFocus(data),
            None => return,
        };
        self.send(event);
    }

    pub fn on_form_submit(&mut self, form: &ElementSnapshot, action: Option<&str>) {
        self.send(InteractionEvent::FormSubmit(FormData {
            page: self.page.clone(),
            form: form.info(),
            action: action.unwrap_or("unknown").to_string(),
        }));
    }

    /// Save a highlight, quote, or note for the current selection, with
    /// `context` describing where on the page it was made.
    ///
    /// `Ok(None)` when the selection is too short or the background is
    /// unreachable.
    pub async fn annotate(
        &self,
        kind: AnnotationKind,
        selection: &str,
        note: Option<&str>,
        context: Option<SelectionContext>,
    ) -> Result<Option<Annotation>, MessageError> {
        let selection = selection.trim();
        if selection.chars().count() <= TOOLBAR_SELECTION_MIN_CHARS {
            return Ok(None);
        }
        let page = PageIdentity::new(
            self.page.url.as_deref().unwrap_or_default(),
            self.page.title.as_deref().unwrap_or_default(),
        )
        .map_err(|e| MessageError::InvalidPayload(format!("{e:#}")))?;

        let item = match kind {
            AnnotationKind::Highlight => Annotation::highlight(&page, selection),
            AnnotationKind::Quote => Annotation::quote(&page, selection),
            AnnotationKind::Note => Annotation::note(&page, selection, note.unwrap_or_default()),
        };
        let item = match context {
            Some(ctx) => item.with_context(ctx),
            None => item,
        };
        let message = Message::AddAnnotation {
            kind,
            item: item.clone(),
        };
        match self.request(message).await? {
            Delivery::Delivered(_) => Ok(Some(item)),
            Delivery::Disconnected => Ok(None),
        }
    }

    /// Re-create markers for this page's saved highlights. Never fails.
    pub async fn restore_highlights<P: PageText + ?Sized>(&self, document: &mut P) -> RestoreReport {
        let Some(url) = self.page.url.clone() else {
            return RestoreReport::default();
        };
        match self.request(Message::GetHighlights { url: url.clone() }).await {
            Ok(Delivery::Delivered(Response::Highlights(items))) => {
                let report = anchoring::restore_highlights(document, &url, &items);
                debug!(restored = report.restored, missed = report.missed.len(), "highlights restored");
                report
            }
            Ok(_) => RestoreReport::default(),
            Err(e) => {
                debug!(error = %e, "could not load highlights");
                RestoreReport::default()
            }
        }
    }

    /// Navigation away: emit `page_leave` and, when warranted, `page_session`,
    /// then wait for outstanding sends.
    pub async fn teardown(mut self, now_ms: i64) {
        if let Some(data) = self.focus.on_leave(now_ms, &self.page) {
            self.send(InteractionEvent::PageLeave(data));
        }
        let focused = self.focus.focused_ms(now_ms);
        if let Some(data) = self.session.finish(now_ms, focused, &self.page) {
            self.send(InteractionEvent::PageSession(data));
        }
        self.flush().await;
        debug!(url = ?self.page.url, "content context torn down");
    }

    /// Wait for every interaction sent so far to be answered.
    pub async fn flush(&mut self) {
        for task in self.in_flight.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "interaction send task failed");
            }
        }
    }

    fn sender_tab(&self) -> TabInfo {
        TabInfo {
            id: self.page.tab_id,
            url: self.page.url.clone(),
            title: self.page.title.clone(),
        }
    }

    async fn request(&self, message: Message) -> Result<Delivery, MessageError> {
        match &self.handle {
            Some(handle) => deliver(handle, message, Some(self.sender_tab())).await,
            None => Ok(Delivery::Disconnected),
        }
    }

    /// Fire-and-forget `user_interaction`.
    fn send(&mut self, event: InteractionEvent) {
        let Some(handle) = self.handle.clone() else {
            debug!(kind = %event.kind(), "no transport, interaction not sent");
            return;
        };
        self.in_flight.retain(|task| !task.is_finished());

        let kind = event.kind();
        let message = Message::UserInteraction {
            action: kind,
            data: event.data(),
        };
        let sender = Some(self.sender_tab());
        self.in_flight.push(tokio::spawn(async move {
            match deliver(&handle, message, sender).await {
                Ok(Delivery::Delivered(_)) => {}
                Ok(Delivery::Disconnected) => debug!(kind = %kind, "background disconnected"),
                Err(e) => warn!(kind = %kind, error = %e, "interaction not delivered"),
            }
        }));
    }
}
