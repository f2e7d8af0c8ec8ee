//! HTTP surface for the background service.
//!
//! A thin browser shim forwards extension messages to `POST /message`; the body
//! is the message itself plus an optional `sender` tab. `GET /health` reports
//! liveness and `GET /badge` the current toolbar state.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::background::{decode, result_wire, Background, BackgroundHandle, TabInfo};
use crate::badge::{BadgeState, MemoryBadgeSink};
use crate::config::MindCacheConfig;
use crate::storage::{SqliteStore, Storage};

#[derive(Clone)]
pub struct AppState {
    pub handle: BackgroundHandle,
    pub badge: Arc<MemoryBadgeSink>,
}

/// Open the on-disk store named by `config`.
pub fn open_storage(config: &MindCacheConfig) -> Result<Storage> {
    let db_path = config.resolved_db_path();
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("failed to open storage at {}", db_path.display()))?;
    tracing::info!(db = %db_path.display(), "storage ready");
    Ok(Storage::new(Arc::new(store)))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/message", post(post_message))
        .route("/health", get(health))
        .route("/badge", get(badge))
        .with_state(state)
}

async fn post_message(State(state): State<AppState>, Json(mut body): Json<Value>) -> Json<Value> {
    let sender = body
        .as_object_mut()
        .and_then(|fields| fields.remove("sender"))
        .and_then(|tab| serde_json::from_value::<TabInfo>(tab).ok());

    let result = match decode(body) {
        Ok(message) => state.handle.request_from(message, sender).await,
        Err(e) => Err(e),
    };
    Json(result_wire(&result))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": if state.handle.is_closed() { "degraded" } else { "ok" },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn badge(State(state): State<AppState>) -> Json<BadgeState> {
    Json(state.badge.last().unwrap_or_default())
}

/// Run the background service and its HTTP surface until ctrl-c.
pub async fn serve(config: MindCacheConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let storage = open_storage(&config)?;

    let badge = Arc::new(MemoryBadgeSink::default());
    let (handle, background) = Background::spawn(storage, &config, badge.clone())?;
    if config.analytics.enabled {
        tracing::info!(endpoint = %config.analytics.endpoint, "analytics forwarding enabled");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "MindCache listening at http://{bind_addr}/message");

    axum::serve(listener, router(AppState { handle, badge }))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down");
        })
        .await?;

    // The router held the last handle; the background drains and exits.
    background.await.context("background task panicked")?;
    Ok(())
}
