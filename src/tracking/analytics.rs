//! Best-effort forwarding of meaningful interactions to an analytics endpoint.
//!
//! Failures (including timeouts) are logged and otherwise ignored; nothing is
//! retried. Responses that carry an analysis are kept under `ai_insights`.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::keep_most_recent;
use super::types::InteractionRecord;
use crate::config::MindCacheConfig;
use crate::storage::{Storage, INSIGHTS_KEY};

#[derive(Clone)]
pub struct AnalyticsClient {
    http: reqwest::Client,
    endpoint: String,
    extension_version: String,
    storage: Storage,
    insight_cap: usize,
    // Serializes read-modify-write of the insights array.
    insights_lock: Arc<Mutex<()>>,
}

impl AnalyticsClient {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        extension_version: impl Into<String>,
        storage: Storage,
        insight_cap: usize,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build analytics HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            extension_version: extension_version.into(),
            storage,
            insight_cap,
            insights_lock: Arc::new(Mutex::new(())),
        })
    }

    /// `None` when analytics is disabled in config.
    pub fn from_config(config: &MindCacheConfig, storage: Storage) -> Result<Option<Self>> {
        if !config.analytics.enabled {
            return Ok(None);
        }
        let client = Self::new(
            config.analytics.endpoint.clone(),
            Duration::from_millis(config.analytics.timeout_ms),
            config.analytics.extension_version.clone(),
            storage,
            config.tracking.insight_cap,
        )?;
        Ok(Some(client))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `{action, ...data, extensionVersion, timestamp}`.
    pub fn payload(&self, record: &InteractionRecord, now_ms: i64) -> Value {
        let mut body = Map::new();
        body.insert("action".into(), Value::String(record.kind().as_str().into()));
        if let Value::Object(data) = record.event.data() {
            body.extend(data);
        }
        body.insert(
            "extensionVersion".into(),
            Value::String(self.extension_version.clone()),
        );
        body.insert("timestamp".into(), Value::from(now_ms));
        Value::Object(body)
    }

    /// POST one record. Returns the stored insight, if the response carried one.
    pub async fn submit(&self, record: &InteractionRecord) -> Result<Option<Value>> {
        let now = chrono::Utc::now().timestamp_millis();
        let response = self
            .http
            .post(&self.endpoint)
            .json(&self.payload(record, now))
            .send()
            .await
            .context("analytics request failed")?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "analytics endpoint rejected interaction");
            return Ok(None);
        }

        let result: Value = response
            .json()
            .await
            .context("analytics response was not JSON")?;
        tracing::debug!(action = %record.kind(), "analytics response received");

        if result.get("content_analysis").is_some() || result.get("behavior_analysis").is_some() {
            let insight = self.store_insight(result, now).await?;
            return Ok(Some(insight));
        }
        Ok(None)
    }

    /// Fire-and-forget [`submit`](Self::submit); errors are only logged.
    pub fn spawn_submit(&self, record: InteractionRecord) {
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(err) = client.submit(&record).await {
                let timed_out = err
                    .downcast_ref::<reqwest::Error>()
                    .is_some_and(reqwest::Error::is_timeout);
                if timed_out {
                    tracing::warn!(action = %record.kind(), "analytics request timed out");
                } else {
                    tracing::warn!(action = %record.kind(), error = %format!("{err:#}"), "analytics submission failed");
                }
            }
        });
    }

    async fn store_insight(&self, result: Value, now_ms: i64) -> Result<Value> {
        let mut insight = match result {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("result".into(), other);
                map
            }
        };
        insight.insert("timestamp".into(), Value::from(now_ms));
        insight.insert("id".into(), Value::String(uuid::Uuid::now_v7().to_string()));
        let insight = Value::Object(insight);

        let _guard = self.insights_lock.lock().await;
        let mut insights: Vec<Value> = self.storage.get_or_default(INSIGHTS_KEY).await?;
        insights.push(insight.clone());
        keep_most_recent(&mut insights, self.insight_cap);
        self.storage.set(INSIGHTS_KEY, &insights).await?;
        Ok(insight)
    }
}
