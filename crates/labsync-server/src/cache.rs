//! In-process caches shared by all handlers.
//!
//! [`PageCache`] holds rendered listing responses keyed by page path; the
//! sync endpoint drops entries by exact key. [`CatalogCache`] holds the
//! grouped product snapshot fetched from Airtable.
//!
//! Both caches count invalidations. A result computed from data read before
//! an invalidation is still returned to its caller but never stored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use labsync_airtable::{AirtableClient, AirtableError};
use labsync_core::{group_variants, ProductGroup, ProductRecord};
use serde_json::Value;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CachedPage {
    body: Value,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct PageCache {
    pages: RwLock<HashMap<String, CachedPage>>,
    epoch: AtomicU64,
}

impl PageCache {
    /// Cached body for `path`, if present and not expired.
    pub async fn get(&self, path: &str) -> Option<Value> {
        let pages = self.pages.read().await;
        pages
            .get(path)
            .filter(|page| page.expires_at > Instant::now())
            .map(|page| page.body.clone())
    }

    /// Invalidation counter. Read it before loading the data a page is
    /// rendered from and hand it to [`PageCache::insert_at`].
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Store `body` unless an invalidation ran since `epoch` was read.
    /// Returns whether the page was stored.
    pub async fn insert_at(
        &self,
        epoch: u64,
        path: impl Into<String>,
        body: Value,
        ttl: Duration,
    ) -> bool {
        let mut pages = self.pages.write().await;
        if self.epoch.load(Ordering::Acquire) != epoch {
            return false;
        }
        let page = CachedPage {
            body,
            expires_at: Instant::now() + ttl,
        };
        pages.insert(path.into(), page);
        true
    }

    /// Drop exactly the given keys and bump the epoch. Returns how many
    /// entries were removed.
    pub async fn invalidate<I, S>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pages = self.pages.write().await;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        paths
            .into_iter()
            .filter(|path| pages.remove(path.as_ref()).is_some())
            .count()
    }

    #[cfg(test)]
    pub async fn insert(&self, path: impl Into<String>, body: Value, ttl: Duration) {
        self.insert_at(self.epoch(), path, body, ttl).await;
    }

    #[cfg(test)]
    pub async fn contains(&self, path: &str) -> bool {
        self.get(path).await.is_some()
    }
}

/// Listed products grouped into variant groups.
#[derive(Debug)]
pub struct CatalogSnapshot {
    pub groups: Vec<ProductGroup>,
    /// Listed rows the groups were built from.
    pub record_count: usize,
    fetched_at: Instant,
}

impl CatalogSnapshot {
    /// Build from raw rows, keeping only listed ones.
    #[must_use]
    pub fn from_records(records: &[ProductRecord]) -> Self {
        let listed: Vec<ProductRecord> = records
            .iter()
            .filter(|r| r.is_listed())
            .cloned()
            .collect();
        Self {
            groups: group_variants(&listed),
            record_count: listed.len(),
            fetched_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn find(&self, slug: &str) -> Option<&ProductGroup> {
        self.groups.iter().find(|g| g.slug == slug)
    }

    /// Distinct category slugs, in first-seen order.
    #[must_use]
    pub fn category_slugs(&self) -> Vec<&str> {
        let mut slugs: Vec<&str> = Vec::new();
        for group in &self.groups {
            if !slugs.contains(&group.category_slug.as_str()) {
                slugs.push(&group.category_slug);
            }
        }
        slugs
    }
}

#[derive(Debug)]
pub struct CatalogCache {
    ttl: Duration,
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
    generation: AtomicU64,
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            snapshot: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// The stored snapshot regardless of age.
    pub async fn peek(&self) -> Option<Arc<CatalogSnapshot>> {
        self.snapshot.read().await.clone()
    }

    #[cfg(test)]
    pub async fn store(&self, records: &[ProductRecord]) -> Arc<CatalogSnapshot> {
        let generation = self.generation.load(Ordering::Acquire);
        self.store_at(generation, records).await
    }

    /// Build a snapshot from `records`, keeping it only if no
    /// [`CatalogCache::clear`] ran since `generation` was read.
    async fn store_at(&self, generation: u64, records: &[ProductRecord]) -> Arc<CatalogSnapshot> {
        let snapshot = Arc::new(CatalogSnapshot::from_records(records));
        let mut slot = self.snapshot.write().await;
        if self.generation.load(Ordering::Acquire) == generation {
            *slot = Some(Arc::clone(&snapshot));
        } else {
            tracing::debug!("catalog cleared during fetch; snapshot not stored");
        }
        snapshot
    }

    pub async fn clear(&self) {
        let mut slot = self.snapshot.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        *slot = None;
    }

    /// Fresh snapshot, fetching from Airtable when missing or older than the TTL.
    ///
    /// # Errors
    ///
    /// Returns the [`AirtableError`] from the record listing.
    pub async fn load(
        &self,
        airtable: &AirtableClient,
        table_id: &str,
    ) -> Result<Arc<CatalogSnapshot>, AirtableError> {
        if let Some(snapshot) = self.peek().await {
            if snapshot.fetched_at.elapsed() < self.ttl {
                return Ok(snapshot);
            }
        }

        let generation = self.generation.load(Ordering::Acquire);
        let records = airtable.list_records(table_id).await?;
        let snapshot = self.store_at(generation, &records).await;
        tracing::debug!(
            record_count = snapshot.record_count,
            group_count = snapshot.groups.len(),
            "catalog snapshot refreshed"
        );
        Ok(snapshot)
    }
}
