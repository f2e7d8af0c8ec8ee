//! The background service: sole writer of the interaction log, summaries,
//! settings, and (through its queue) the annotation collections.
//!
//! Requests arrive on an mpsc queue as [`Envelope`]s and are handled strictly
//! one at a time, so read-modify-write sequences never interleave.

pub mod message;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::annotations::{AnnotationKind, AnnotationStore};
use crate::badge::{BadgeAggregator, BadgeSink};
use crate::config::MindCacheConfig;
use crate::error::MessageError;
use crate::storage::{Storage, StorageChange, SETTINGS_KEY};
use crate::tracking::analytics::AnalyticsClient;
use crate::tracking::log::InteractionLog;
use crate::tracking::settings::Settings;
use crate::tracking::stats::activity_stats;
use crate::tracking::summary::{self, SummaryLog};
use crate::tracking::types::{InteractionEvent, InteractionRecord, PageRef, VisitData};

pub use message::{decode, result_wire, Message, Response, TabInfo};

const INBOX_CAPACITY: usize = 256;

/// One queued request.
pub struct Envelope {
    message: Message,
    sender: Option<TabInfo>,
    reply: oneshot::Sender<Result<Response, MessageError>>,
}

/// Cloneable address of a running [`Background`].
#[derive(Clone)]
pub struct BackgroundHandle {
    tx: mpsc::Sender<Envelope>,
    timeout: Duration,
}

impl BackgroundHandle {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn request(&self, message: Message) -> Result<Response, MessageError> {
        self.request_from(message, None).await
    }

    /// Send `message` as if from tab `sender` and wait for the reply.
    ///
    /// [`MessageError::Disconnected`] if the background has stopped,
    /// [`MessageError::Timeout`] if it did not answer in time.
    pub async fn request_from(
        &self,
        message: Message,
        sender: Option<TabInfo>,
    ) -> Result<Response, MessageError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                message,
                sender,
                reply,
            })
            .await
            .map_err(|_| MessageError::Disconnected)?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(MessageError::Disconnected),
            Err(_) => Err(MessageError::Timeout),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct Background {
    storage: Storage,
    log: InteractionLog,
    summaries: SummaryLog,
    annotations: AnnotationStore,
    badge: BadgeAggregator,
    analytics: Option<AnalyticsClient>,
    inbox: mpsc::Receiver<Envelope>,
    changes: tokio::sync::broadcast::Receiver<StorageChange>,
    sweep_interval: Duration,
}

impl Background {
    pub fn new(
        storage: Storage,
        config: &MindCacheConfig,
        badge_sink: Arc<dyn BadgeSink>,
    ) -> Result<(Self, BackgroundHandle)> {
        let (tx, inbox) = mpsc::channel(INBOX_CAPACITY);
        let analytics = AnalyticsClient::from_config(config, storage.clone())?;
        let background = Self {
            changes: storage.subscribe(),
            log: InteractionLog::from_config(storage.clone(), config),
            summaries: SummaryLog::new(storage.clone(), config.tracking.summary_cap),
            annotations: AnnotationStore::new(storage.clone()),
            badge: BadgeAggregator::new(badge_sink),
            analytics,
            inbox,
            sweep_interval: Duration::from_secs(config.tracking.retention_sweep_interval_secs.max(1)),
            storage,
        };
        let handle = BackgroundHandle {
            tx,
            timeout: config.server.request_timeout(),
        };
        Ok((background, handle))
    }

    /// Build and run on a new task.
    pub fn spawn(
        storage: Storage,
        config: &MindCacheConfig,
        badge_sink: Arc<dyn BadgeSink>,
    ) -> Result<(BackgroundHandle, JoinHandle<()>)> {
        let (background, handle) = Self::new(storage, config, badge_sink)?;
        Ok((handle, tokio::spawn(background.run())))
    }

    /// First-run setup: default settings and empty annotation collections.
    pub async fn install(&self) -> Result<()> {
        if self.storage.get_value(SETTINGS_KEY).await?.is_none() {
            Settings::default().save(&self.storage).await?;
            info!("default settings initialized");
        }
        self.annotations.ensure_initialized().await
    }

    /// Process requests until every handle is dropped.
    pub async fn run(mut self) {
        if let Err(e) = self.install().await {
            warn!(error = %format!("{e:#}"), "install step failed");
        }

        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                envelope = self.inbox.recv() => {
                    let Some(envelope) = envelope else { break };
                    let name = envelope.message.name();
                    let result = self.handle(envelope.message, envelope.sender).await;
                    if let Err(e) = &result {
                        debug!(message = name, error = %e, "request failed");
                    }
                    if envelope.reply.send(result).is_err() {
                        debug!(message = name, "requester went away before the reply");
                    }
                }
                change = self.changes.recv() => match change {
                    Ok(change) if is_annotation_key(&change.key) => self.refresh_badge().await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        debug!(missed, "storage change notifications lagged");
                        self.refresh_badge().await;
                    }
                    // `self.storage` holds the sender, so this cannot happen while we run.
                    Err(RecvError::Closed) => break,
                },
                _ = sweep.tick() => self.sweep_retention().await,
            }
        }
        info!("background stopped");
    }

    async fn handle(
        &mut self,
        message: Message,
        sender: Option<TabInfo>,
    ) -> Result<Response, MessageError> {
        match message {
            Message::UserInteraction { action, data } => {
                let now = now_ms();
                let mut event = InteractionEvent::from_parts(action, data)
                    .map_err(|e| MessageError::InvalidPayload(e.to_string()))?;
                if let Some(tab) = sender {
                    merge_sender(event.page_mut(), tab);
                }
                self.record(InteractionRecord::new(event, now)).await;
                Ok(Response::Recorded { timestamp: now })
            }
            Message::UpdateCounts { data } => {
                self.badge.apply_update(&data);
                Ok(Response::Ack)
            }
            Message::GetCounts { domain } => {
                Ok(Response::Counts(self.annotations.counts(domain.as_deref()).await?))
            }
            Message::ExportData { domain } => {
                Ok(Response::Export(self.annotations.export(domain.as_deref()).await?))
            }
            Message::ClearData { data_type, domain } => {
                let removed = self.annotations.clear(data_type, domain.as_deref()).await?;
                info!(collection = %data_type, domain = ?domain, removed, "cleared annotations");
                self.refresh_badge().await;
                Ok(Response::Ack)
            }
            Message::AddAnnotation { kind, item } => {
                if !item.fits(kind) {
                    return Err(MessageError::InvalidPayload(format!(
                        "item does not belong in {kind}"
                    )));
                }
                self.annotations.add(kind, item).await?;
                self.refresh_badge().await;
                Ok(Response::Ack)
            }
            Message::RemoveAnnotation { kind, id } => {
                let removed = self.annotations.remove(kind, &id).await?;
                if removed {
                    self.refresh_badge().await;
                }
                Ok(Response::Removed(removed))
            }
            Message::GetHighlights { url } => {
                Ok(Response::Highlights(self.annotations.highlights_for_url(&url).await?))
            }
            Message::QueryInteractions { filters } => {
                Ok(Response::Interactions(self.log.query(&filters).await?))
            }
            Message::GetSummaries { limit } => {
                Ok(Response::Summaries(self.summaries.recent(limit).await?))
            }
            Message::GetSettings => Ok(Response::Settings(Settings::load(&self.storage).await?)),
            Message::SaveSettings { settings } => {
                settings
                    .validate()
                    .map_err(|e| MessageError::InvalidPayload(format!("{e:#}")))?;
                settings.save(&self.storage).await?;
                info!(?settings, "settings saved");
                self.sweep_retention().await;
                Ok(Response::Ack)
            }
            Message::GetStats => Ok(Response::Stats(activity_stats(&self.storage, None).await?)),
            Message::TabActivated { tab } => {
                self.badge.set_active_url(tab.url.clone());
                if tab.url.is_some() {
                    self.record_tab_event(tab, true).await;
                }
                self.refresh_badge().await;
                Ok(Response::Ack)
            }
            Message::TabUpdated { tab, status } => {
                if status.as_deref() == Some("complete") && tab.url.is_some() {
                    self.badge.set_active_url(tab.url.clone());
                    self.record_tab_event(tab, false).await;
                    self.refresh_badge().await;
                }
                Ok(Response::Ack)
            }
        }
    }

    async fn record_tab_event(&mut self, tab: TabInfo, switched: bool) {
        let data = VisitData {
            page: PageRef {
                url: tab.url,
                title: tab.title,
                tab_id: tab.id,
            },
        };
        let event = if switched {
            InteractionEvent::TabSwitch(data)
        } else {
            InteractionEvent::PageVisit(data)
        };
        self.record(InteractionRecord::new(event, now_ms())).await;
    }

    /// Append to the log, forward to analytics, and summarize when due.
    /// Failures drop the record and are only logged.
    async fn record(&mut self, record: InteractionRecord) {
        let settings = match Settings::load(&self.storage).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "could not read settings, using defaults");
                Settings::default()
            }
        };
        if !settings.tracking_enabled {
            debug!(kind = %record.kind(), "tracking disabled, interaction not recorded");
            return;
        }

        let kind = record.kind();
        if let Some(analytics) = self.analytics.as_ref().filter(|_| kind.is_analyzed()) {
            analytics.spawn_submit(record.clone());
        }

        let log = match self.log.append(record).await {
            Ok(log) => log,
            Err(e) => {
                warn!(kind = %kind, error = %e, "interaction dropped");
                return;
            }
        };
        debug!(kind = %kind, len = log.len(), "interaction recorded");

        if !summary::is_due(log.len(), settings.summarize_frequency) {
            return;
        }
        let batch = summary::latest_batch(&log, settings.summarize_frequency);
        if let Some(record) = summary::summarize(batch, now_ms()) {
            match self.summaries.append(record).await {
                Ok(count) => debug!(summaries = count, "summary generated"),
                Err(e) => warn!(error = %format!("{e:#}"), "summary dropped"),
            }
        }
    }

    async fn refresh_badge(&mut self) {
        match self.annotations.load_all().await {
            Ok(set) => self.badge.refresh(&set),
            Err(e) => debug!(error = %format!("{e:#}"), "badge refresh skipped"),
        }
    }

    /// Drop interactions older than the retention window.
    async fn sweep_retention(&mut self) {
        let settings = match Settings::load(&self.storage).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "retention sweep skipped");
                return;
            }
        };
        let cutoff = now_ms() - settings.retention_ms();
        match self.log.prune_older_than(cutoff).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, days = settings.data_retention_days, "pruned old interactions"),
            Err(e) => warn!(error = %e, "retention sweep failed"),
        }
    }
}

fn is_annotation_key(key: &str) -> bool {
    AnnotationKind::ALL.iter().any(|k| k.storage_key() == key)
}

/// Sender tab identity wins over whatever the page reported.
fn merge_sender(page: &mut PageRef, tab: TabInfo) {
    if tab.url.is_some() {
        page.url = tab.url;
    }
    if tab.id.is_some() {
        page.tab_id = tab.id;
    }
    if page.title.is_none() {
        page.title = tab.title;
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
