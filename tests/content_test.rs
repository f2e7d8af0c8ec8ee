mod helpers;

use mindcache::anchoring::{Document, Marker};
use mindcache::annotations::{Annotation, AnnotationBody, AnnotationKind, AnnotationStore, Position};
use mindcache::background::{Background, Message};
use mindcache::badge::MemoryBadgeSink;
use mindcache::config::{MindCacheConfig, TrackingConfig};
use mindcache::content::{deliver, ContentContext, Delivery};
use mindcache::storage::Storage;
use mindcache::tracking::classifier::{ElementSnapshot, ScrollPosition};
use mindcache::tracking::log::{InteractionFilter, InteractionLog};
use mindcache::tracking::types::{InteractionKind, PageRef};
use std::collections::BTreeSet;
use std::sync::Arc;

const URL: &str = "https://example.com/article";

fn page() -> PageRef {
    PageRef::new(URL, "An Article")
}

#[tokio::test]
async fn page_activity_reaches_the_log() {
    let bg = helpers::start_background();
    let mut ctx = ContentContext::init(page(), Some(bg.handle.clone()), &TrackingConfig::default(), 0);

    assert!(ctx.on_click(&ElementSnapshot::new("button"), Some((10.0, 20.0))));
    assert!(!ctx.on_click(&ElementSnapshot::new("div"), None));
    assert!(ctx.on_scroll(2_000, ScrollPosition::at(400.0)));
    assert!(!ctx.on_scroll(2_100, ScrollPosition::at(900.0)));
    assert!(ctx.on_selection("a sentence worth remembering"));
    ctx.teardown(10_000).await;

    let log = InteractionLog::from_config(bg.storage.clone(), &MindCacheConfig::default());
    let records = log.query(&InteractionFilter::default()).await.unwrap();
    let kinds: BTreeSet<InteractionKind> = records.iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        BTreeSet::from([
            InteractionKind::MeaningfulClick,
            InteractionKind::MeaningfulScroll,
            InteractionKind::ContentSelection,
            InteractionKind::PageLeave,
            InteractionKind::PageSession,
        ])
    );
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.event.page().url.as_deref() == Some(URL)));
}

#[tokio::test]
async fn visibility_changes_are_recorded() {
    let bg = helpers::start_background();
    let mut ctx = ContentContext::init(page(), Some(bg.handle.clone()), &TrackingConfig::default(), 0);

    ctx.on_visibility_change(true, 3_000);
    ctx.on_visibility_change(true, 3_500);
    ctx.on_visibility_change(false, 8_000);
    ctx.flush().await;

    let log = InteractionLog::from_config(bg.storage.clone(), &MindCacheConfig::default());
    let kinds: Vec<InteractionKind> = log.load().await.unwrap().iter().map(|r| r.kind()).collect();
    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&InteractionKind::PageBlur));
    assert!(kinds.contains(&InteractionKind::PageFocus));
}

#[tokio::test]
async fn annotate_saves_through_the_background() {
    let bg = helpers::start_background();
    let ctx = ContentContext::init(page(), Some(bg.handle.clone()), &TrackingConfig::default(), 0);

    assert!(ctx
        .annotate(AnnotationKind::Highlight, "abc", None, None)
        .await
        .unwrap()
        .is_none());

    let saved = ctx
        .annotate(AnnotationKind::Note, "  quick brown fox  ", Some("remember this"), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.domain, "example.com");
    assert_eq!(saved.anchor_text(), "quick brown fox");

    let store = AnnotationStore::new(bg.storage.clone());
    assert_eq!(store.load(AnnotationKind::Note).await.unwrap(), vec![saved]);
    assert_eq!(store.counts(Some("example.com")).await.unwrap().total, 1);
}

#[tokio::test]
async fn annotate_records_where_the_selection_was_made() {
    let bg = helpers::start_background();
    let ctx = ContentContext::init(page(), Some(bg.handle.clone()), &TrackingConfig::default(), 0);

    let mut doc = Document::new();
    let body = doc.body();
    doc.append_text(body, "The ");
    let em = doc.append_element(body, "em");
    doc.set_attribute(em, "class", "emphasis");
    let selected = doc.append_text(em, "quick brown");
    doc.append_text(body, " fox jumps");
    let context = doc.selection_context(selected, Some(Position { x: 48.0, y: 120.0 }));

    let saved = ctx
        .annotate(AnnotationKind::Highlight, "quick brown", None, context.clone())
        .await
        .unwrap()
        .unwrap();

    let store = AnnotationStore::new(bg.storage.clone());
    let stored = store.load(AnnotationKind::Highlight).await.unwrap();
    assert_eq!(stored, vec![saved]);
    let AnnotationBody::Excerpt { context: Some(stored_ctx), .. } = &stored[0].body else {
        panic!("expected a highlight with context");
    };
    assert_eq!(Some(stored_ctx.clone()), context);
    assert_eq!(stored_ctx.tag_name.as_deref(), Some("EM"));
    assert_eq!(stored_ctx.class_name.as_deref(), Some("emphasis"));
    let around = stored_ctx.surrounding_text.as_ref().unwrap();
    assert_eq!((around.before.as_str(), around.after.as_str()), ("The", "fox jumps"));
}

#[tokio::test]
async fn saved_highlights_are_restored_on_load() {
    let bg = helpers::start_background();
    let identity = helpers::page(URL);
    let found = Annotation::highlight(&identity, "quick brown fox");
    let missing = Annotation::highlight(&identity, "zebra");
    let elsewhere = Annotation::highlight(&helpers::page("https://example.com/other"), "lazy dog");
    for item in [found.clone(), missing.clone(), elsewhere] {
        bg.handle
            .request(Message::AddAnnotation {
                kind: AnnotationKind::Highlight,
                item,
            })
            .await
            .unwrap();
    }

    let mut doc = Document::new();
    let body = doc.body();
    let p = doc.append_element(body, "p");
    doc.append_text(p, "The quick brown fox jumps over the lazy dog");

    let ctx = ContentContext::init(page(), Some(bg.handle.clone()), &TrackingConfig::default(), 0);
    let report = ctx.restore_highlights(&mut doc).await;

    assert_eq!(report.restored, 1);
    assert_eq!(report.missed, vec![missing.id.clone()]);
    assert_eq!(doc.markers(), vec![(found.id.clone(), "quick brown fox".to_string())]);
    assert_eq!(doc.text_content(body), "The quick brown fox jumps over the lazy dog");

    let marker = doc
        .children(p)
        .iter()
        .copied()
        .find(|&n| doc.tag(n) == Some("span"))
        .unwrap();
    assert_eq!(doc.attribute(marker, "class"), Some(Marker::CLASS));
}

#[tokio::test]
async fn a_stopped_background_is_not_an_error() {
    let sink = Arc::new(MemoryBadgeSink::default());
    let (background, handle) =
        Background::new(Storage::in_memory(), &MindCacheConfig::default(), sink).unwrap();
    drop(background);
    assert!(handle.is_closed());

    let reply = deliver(&handle, Message::GetSettings, None).await.unwrap();
    assert!(matches!(reply, Delivery::Disconnected));

    let mut ctx = ContentContext::init(page(), Some(handle), &TrackingConfig::default(), 0);
    assert!(ctx.on_click(&ElementSnapshot::new("a").with_href("https://x.com"), None));
    assert!(ctx.on_selection("long enough to be tracked"));
    assert!(ctx
        .annotate(AnnotationKind::Quote, "a quotable line", None, None)
        .await
        .unwrap()
        .is_none());

    let mut doc = Document::new();
    let body = doc.body();
    doc.append_text(body, "nothing to restore");
    assert_eq!(ctx.restore_highlights(&mut doc).await.restored, 0);

    ctx.teardown(60_000).await;
}
