//! Read-modify-write access to the three annotation collections.
//!
//! `AnnotationStore` does no locking of its own. Two callers that interleave
//! `load` and `save` on the same collection will lose one of the writes; the
//! background service avoids this by funnelling every mutation through a single
//! task.

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::debug;

use super::counts::{count_in, DomainCounts};
use super::types::{Annotation, AnnotationKind, AnnotationSet, ExportBundle};
use crate::storage::Storage;

#[derive(Clone)]
pub struct AnnotationStore {
    storage: Storage,
}

impl AnnotationStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn load(&self, kind: AnnotationKind) -> Result<Vec<Annotation>> {
        self.storage.get_or_default(kind.storage_key()).await
    }

    pub async fn save(&self, kind: AnnotationKind, items: &[Annotation]) -> Result<()> {
        self.storage.set(kind.storage_key(), &items).await
    }

    pub async fn load_all(&self) -> Result<AnnotationSet> {
        Ok(AnnotationSet {
            highlights: self.load(AnnotationKind::Highlight).await?,
            notes: self.load(AnnotationKind::Note).await?,
            quotes: self.load(AnnotationKind::Quote).await?,
        })
    }

    /// Create any missing collection as an empty array.
    pub async fn ensure_initialized(&self) -> Result<()> {
        for kind in AnnotationKind::ALL {
            if self.storage.get_value(kind.storage_key()).await?.is_none() {
                self.save(kind, &[]).await?;
                debug!(collection = %kind, "initialized empty collection");
            }
        }
        Ok(())
    }

    pub async fn add(&self, kind: AnnotationKind, item: Annotation) -> Result<()> {
        if !item.fits(kind) {
            bail!("item {} does not belong in {kind}", item.id);
        }
        let mut items = self.load(kind).await?;
        if items.iter().any(|a| a.id == item.id) {
            bail!("{kind} already contains {}", item.id);
        }
        items.push(item);
        self.save(kind, &items).await
    }

    /// Remove one item by id. Returns whether anything was removed.
    pub async fn remove(&self, kind: AnnotationKind, id: &str) -> Result<bool> {
        let mut items = self.load(kind).await?;
        let before = items.len();
        items.retain(|a| a.id != id);
        if items.len() == before {
            return Ok(false);
        }
        self.save(kind, &items).await?;
        Ok(true)
    }

    /// Remove every item of `kind` whose domain equals `domain`, or the whole
    /// collection when `domain` is `None`. Returns how many were removed.
    pub async fn clear(&self, kind: AnnotationKind, domain: Option<&str>) -> Result<usize> {
        let mut items = self.load(kind).await?;
        let before = items.len();
        match domain {
            Some(d) => items.retain(|a| a.domain != d),
            None => items.clear(),
        }
        let removed = before - items.len();
        if removed > 0 {
            self.save(kind, &items).await?;
        }
        Ok(removed)
    }

    /// Snapshot of all annotations for `domain` (or everything).
    pub async fn export(&self, domain: Option<&str>) -> Result<ExportBundle> {
        let set = self.load_all().await?.filtered(domain);
        Ok(ExportBundle::new(domain, set, Utc::now()))
    }

    pub async fn counts(&self, domain: Option<&str>) -> Result<DomainCounts> {
        Ok(count_in(&self.load_all().await?, domain))
    }

    /// Highlights whose stored URL equals `url` exactly.
    pub async fn highlights_for_url(&self, url: &str) -> Result<Vec<Annotation>> {
        Ok(self
            .load(AnnotationKind::Highlight)
            .await?
            .into_iter()
            .filter(|a| a.url == url)
            .collect())
    }

    /// Add every item from `bundle` not already present by id. Returns how many
    /// were added.
    pub async fn merge(&self, bundle: &ExportBundle) -> Result<usize> {
        let mut added = 0;
        for (kind, incoming) in [
            (AnnotationKind::Highlight, &bundle.highlights),
            (AnnotationKind::Note, &bundle.notes),
            (AnnotationKind::Quote, &bundle.quotes),
        ] {
            let mut items = self.load(kind).await?;
            let before = items.len();
            for item in incoming {
                if !item.fits(kind) {
                    debug!(id = %item.id, collection = %kind, "skipped item that does not fit collection");
                } else if !items.iter().any(|a| a.id == item.id) {
                    items.push(item.clone());
                }
            }
            if items.len() > before {
                added += items.len() - before;
                self.save(kind, &items).await?;
            }
        }
        Ok(added)
    }
}
