mod helpers;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use mindcache::background::Message;
use mindcache::config::MindCacheConfig;
use mindcache::storage::{Storage, INSIGHTS_KEY};
use mindcache::tracking::analytics::AnalyticsClient;
use mindcache::tracking::types::{InteractionEvent, InteractionKind, InteractionRecord, PageRef, SelectionData};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
struct Stub {
    received: Arc<Mutex<Vec<Value>>>,
    reply: Value,
}

async fn analyze(State(stub): State<Stub>, Json(body): Json<Value>) -> Json<Value> {
    stub.received.lock().unwrap().push(body);
    Json(stub.reply.clone())
}

/// Start a stub analytics endpoint; returns its URL and the payloads it saw.
async fn stub_endpoint(reply: Value) -> (String, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().route("/api/analyze", post(analyze)).with_state(Stub {
        received: received.clone(),
        reply,
    });
    let addr = helpers::spawn_http(app).await;
    (format!("http://{addr}/api/analyze"), received)
}

fn client(endpoint: &str, storage: &Storage, cap: usize) -> AnalyticsClient {
    AnalyticsClient::new(endpoint, Duration::from_secs(2), "9.9.9", storage.clone(), cap).unwrap()
}

fn selection(text: &str) -> InteractionRecord {
    InteractionRecord::new(
        InteractionEvent::ContentSelection(SelectionData {
            page: PageRef::new("https://blog.example/post", "Post"),
            text: text.into(),
            length: text.chars().count(),
        }),
        1_000,
    )
}

#[tokio::test]
async fn analysis_response_is_stored_as_insight() {
    let (endpoint, received) = stub_endpoint(json!({"content_analysis": {"topic": "rust"}})).await;
    let storage = Storage::in_memory();
    let client = client(&endpoint, &storage, 100);

    let insight = client.submit(&selection("ownership and borrowing")).await.unwrap();
    let insight = insight.expect("analysis should be stored");
    assert_eq!(insight["content_analysis"]["topic"], "rust");
    assert!(insight["id"].is_string());
    assert!(insight["timestamp"].is_i64());

    let sent = received.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["action"], "content_selection");
    assert_eq!(sent[0]["extensionVersion"], "9.9.9");
    assert_eq!(sent[0]["url"], "https://blog.example/post");
    assert_eq!(sent[0]["text"], "ownership and borrowing");

    let stored: Vec<Value> = storage.get_or_default(INSIGHTS_KEY).await.unwrap();
    assert_eq!(stored, vec![insight]);
}

#[tokio::test]
async fn response_without_analysis_stores_nothing() {
    let (endpoint, _received) = stub_endpoint(json!({})).await;
    let storage = Storage::in_memory();
    let client = client(&endpoint, &storage, 100);

    assert!(client.submit(&selection("nothing to see here")).await.unwrap().is_none());
    assert!(storage.get_value(INSIGHTS_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn insights_are_capped() {
    let (endpoint, _received) = stub_endpoint(json!({"behavior_analysis": {"focus": "high"}})).await;
    let storage = Storage::in_memory();
    let client = client(&endpoint, &storage, 2);

    let mut ids = Vec::new();
    for text in ["first selection", "second selection", "third selection"] {
        let insight = client.submit(&selection(text)).await.unwrap().unwrap();
        ids.push(insight["id"].clone());
    }

    let stored: Vec<Value> = storage.get_or_default(INSIGHTS_KEY).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0]["id"], ids[1]);
    assert_eq!(stored[1]["id"], ids[2]);
}

#[tokio::test]
async fn unreachable_endpoint_is_an_error_but_spawned_submit_is_silent() {
    let storage = Storage::in_memory();
    let client = client("http://127.0.0.1:9/api/analyze", &storage, 100);

    assert!(client.submit(&selection("goes nowhere")).await.is_err());

    client.spawn_submit(selection("also goes nowhere"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(storage.get_value(INSIGHTS_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn background_forwards_only_analyzed_kinds() {
    let (endpoint, received) = stub_endpoint(json!({"content_analysis": {}})).await;
    let mut config = MindCacheConfig::default();
    config.analytics.enabled = true;
    config.analytics.endpoint = endpoint;
    let bg = helpers::start_background_with(Storage::in_memory(), &config);

    bg.handle
        .request(Message::UserInteraction {
            action: InteractionKind::PageVisit,
            data: json!({"url": "https://news.example/"}),
        })
        .await
        .unwrap();
    bg.handle
        .request(Message::UserInteraction {
            action: InteractionKind::MeaningfulClick,
            data: json!({
                "url": "https://news.example/",
                "element": {"tagName": "a", "href": "https://news.example/story"},
                "elementType": "link"
            }),
        })
        .await
        .unwrap();

    let forwarded = helpers::eventually(Duration::from_secs(3), || {
        let received = received.clone();
        async move { !received.lock().unwrap().is_empty() }
    })
    .await;
    assert!(forwarded);

    // Give a stray page_visit submission time to show up.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let sent = received.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["action"], "meaningful_click");

    let stored = helpers::eventually(Duration::from_secs(3), || {
        let storage = bg.storage.clone();
        async move { storage.get_value(INSIGHTS_KEY).await.unwrap().is_some() }
    })
    .await;
    assert!(stored);
}
