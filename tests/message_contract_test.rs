//! The JSON message contract, exercised over the HTTP surface.

mod helpers;

use mindcache::server::{router, AppState};
use serde_json::{json, Value};
use std::net::SocketAddr;

async fn start() -> (SocketAddr, helpers::TestBackground) {
    let bg = helpers::start_background();
    let addr = helpers::spawn_http(router(AppState {
        handle: bg.handle.clone(),
        badge: bg.badge.clone(),
    }))
    .await;
    (addr, bg)
}

async fn post(addr: SocketAddr, body: Value) -> Value {
    reqwest::Client::new()
        .post(format!("http://{addr}/message"))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn unknown_type_is_rejected() {
    let (addr, _bg) = start().await;
    let reply = post(addr, json!({"type": "selfDestruct"})).await;
    assert_eq!(reply, json!({"success": false, "error": "Unknown message type"}));

    let reply = post(addr, json!({"hello": "world"})).await;
    assert_eq!(reply["success"], false);
}

#[tokio::test]
async fn user_interaction_reports_timestamp() {
    let (addr, _bg) = start().await;
    let reply = post(
        addr,
        json!({
            "type": "user_interaction",
            "action": "content_selection",
            "data": {"url": "https://docs.rs/serde", "text": "derive macros", "length": 13}
        }),
    )
    .await;
    assert_eq!(reply["success"], true);
    assert!(reply["timestamp"].as_i64().unwrap() > 0);

    let reply = post(
        addr,
        json!({"type": "queryInteractions", "filters": {"type": "content_selection"}}),
    )
    .await;
    let records = reply["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["data"]["text"], "derive macros");
    assert_eq!(records[0]["type"], "content_selection");
}

#[tokio::test]
async fn bad_payload_reports_error() {
    let (addr, _bg) = start().await;
    let reply = post(
        addr,
        json!({"type": "user_interaction", "action": "meaningful_click", "data": {"x": 1}}),
    )
    .await;
    assert_eq!(reply["success"], false);
    assert!(reply["error"].as_str().unwrap().starts_with("invalid message payload"));
}

#[tokio::test]
async fn sender_tab_is_merged_into_the_record() {
    let (addr, _bg) = start().await;
    post(
        addr,
        json!({
            "type": "user_interaction",
            "action": "page_visit",
            "data": {},
            "sender": {"id": 12, "url": "https://tab.example/", "title": "Tab"}
        }),
    )
    .await;

    let reply = post(addr, json!({"type": "queryInteractions"})).await;
    let record = &reply["data"][0];
    assert_eq!(record["data"]["url"], "https://tab.example/");
    assert_eq!(record["data"]["tabId"], 12);
    assert_eq!(record["data"]["title"], "Tab");
}

fn highlight(url: &str, domain: &str, id: &str, text: &str) -> Value {
    json!({
        "type": "addAnnotation",
        "kind": "highlights",
        "item": {
            "id": id,
            "url": url,
            "domain": domain,
            "title": "Page",
            "timestamp": "2026-01-01T00:00:00Z",
            "text": text
        }
    })
}

#[tokio::test]
async fn annotation_counts_export_and_clear() {
    let (addr, _bg) = start().await;
    for reply in [
        post(addr, highlight("https://a.com/1", "a.com", "h1", "alpha")).await,
        post(addr, highlight("https://a.com/2", "a.com", "h2", "beta")).await,
        post(addr, highlight("https://b.com/1", "b.com", "h3", "gamma")).await,
    ] {
        assert_eq!(reply, json!({"success": true}));
    }

    let reply = post(addr, json!({"type": "getCounts", "domain": "a.com"})).await;
    assert_eq!(
        reply["data"],
        json!({"highlights": 2, "notes": 0, "quotes": 0, "total": 2})
    );

    let reply = post(addr, json!({"type": "exportData"})).await;
    assert_eq!(reply["data"]["domain"], "all");
    assert_eq!(reply["data"]["totalItems"], 3);
    assert_eq!(reply["data"]["highlights"].as_array().unwrap().len(), 3);

    let reply = post(addr, json!({"type": "exportData", "domain": "b.com"})).await;
    assert_eq!(reply["data"]["totalItems"], 1);
    assert_eq!(reply["data"]["highlights"][0]["id"], "h3");

    let reply = post(addr, json!({"type": "getHighlights", "url": "https://a.com/2"})).await;
    assert_eq!(reply["data"][0]["text"], "beta");

    let reply = post(
        addr,
        json!({"type": "clearData", "dataType": "highlights", "domain": "a.com"}),
    )
    .await;
    assert_eq!(reply, json!({"success": true}));

    let reply = post(addr, json!({"type": "getCounts"})).await;
    assert_eq!(reply["data"]["total"], 1);

    let reply = post(addr, json!({"type": "removeAnnotation", "kind": "highlights", "id": "h3"})).await;
    assert_eq!(reply["data"]["removed"], true);
    let reply = post(addr, json!({"type": "removeAnnotation", "kind": "highlights", "id": "h3"})).await;
    assert_eq!(reply["data"]["removed"], false);
}

#[tokio::test]
async fn settings_round_trip_and_validation() {
    let (addr, _bg) = start().await;
    let reply = post(addr, json!({"type": "getSettings"})).await;
    assert_eq!(
        reply["data"],
        json!({"trackingEnabled": true, "dataRetentionDays": 30, "summarizeFrequency": 10})
    );

    let reply = post(
        addr,
        json!({"type": "saveSettings", "settings": {"trackingEnabled": false, "dataRetentionDays": 7}}),
    )
    .await;
    assert_eq!(reply["success"], true);

    let reply = post(
        addr,
        json!({"type": "saveSettings", "settings": {"dataRetentionDays": 0}}),
    )
    .await;
    assert_eq!(reply["success"], false);

    let reply = post(addr, json!({"type": "getSettings"})).await;
    assert_eq!(reply["data"]["trackingEnabled"], false);
    assert_eq!(reply["data"]["dataRetentionDays"], 7);

    // Disabled tracking still answers success but stores nothing.
    let reply = post(
        addr,
        json!({"type": "user_interaction", "action": "page_visit", "data": {"url": "https://x.com"}}),
    )
    .await;
    assert_eq!(reply["success"], true);
    let reply = post(addr, json!({"type": "queryInteractions"})).await;
    assert_eq!(reply["data"], json!([]));
}

#[tokio::test]
async fn stats_and_badge() {
    let (addr, _bg) = start().await;
    post(addr, highlight("https://a.com/1", "a.com", "h1", "alpha")).await;
    post(
        addr,
        json!({"type": "tabActivated", "tab": {"id": 1, "url": "https://a.com/1", "title": "A"}}),
    )
    .await;

    let reply = post(addr, json!({"type": "getStats"})).await;
    assert_eq!(reply["data"]["totalHighlights"], 1);
    assert_eq!(reply["data"]["totalInteractions"], 1);
    assert_eq!(reply["data"]["activityTypes"]["tab_switch"], 1);

    let badge: Value = reqwest::get(format!("http://{addr}/badge"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(badge["text"], "1");
    assert!(badge["title"].as_str().unwrap().contains("a.com"));
}

#[tokio::test]
async fn health_reports_ok() {
    let (addr, _bg) = start().await;
    let health: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}
