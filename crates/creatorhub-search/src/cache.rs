//! Result cache for aggregated search pages.
//!
//! Entries are replaced whole under a write lock, so readers see either the
//! previous value or the new one, never a partial write.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use creatorhub_core::{AggregatedResult, Platform, SearchQuery};
use tokio::sync::RwLock;

use crate::error::CacheError;

/// Canonical cache key for one query.
///
/// Identity is `(keyword, sorted platforms, page, page_size)`. Because the
/// merge tie-break follows request order, a request whose platform order
/// differs from the sorted order also carries that order in its key, so a
/// permuted request never receives a page merged in another order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    keyword: String,
    platforms: Vec<Platform>,
    order: Option<Vec<Platform>>,
    page: u32,
    page_size: u32,
}

impl CacheKey {
    #[must_use]
    pub fn for_query(query: &SearchQuery) -> Self {
        let mut platforms = query.platforms.clone();
        platforms.sort_by_key(|p| p.as_str());
        let order = (platforms != query.platforms).then(|| query.platforms.clone());

        Self {
            keyword: query.keyword.clone(),
            platforms,
            order,
            page: query.page,
            page_size: query.page_size,
        }
    }

    /// True if results under this key may include hits from `platform`.
    #[must_use]
    pub fn covers(&self, platform: Platform) -> bool {
        self.platforms.is_empty() || self.platforms.contains(&platform)
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }
}

fn join(platforms: &[Platform]) -> String {
    platforms
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for CacheKey {
    /// `kw:<len>:<keyword>|p:<platforms or *>|page:<n>|size:<n>[|order:<platforms>]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let platforms = if self.platforms.is_empty() {
            "*".to_string()
        } else {
            join(&self.platforms)
        };
        write!(
            f,
            "kw:{}:{}|p:{}|page:{}|size:{}",
            self.keyword.len(),
            self.keyword,
            platforms,
            self.page,
            self.page_size
        )?;
        if let Some(order) = &self.order {
            write!(f, "|order:{}", join(order))?;
        }
        Ok(())
    }
}

/// Storage for aggregated pages.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Returns the live entry for `key`, or `None` on miss or expiry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if the backing store cannot be read.
    async fn get(&self, key: &CacheKey) -> Result<Option<Arc<AggregatedResult>>, CacheError>;

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if the backing store cannot be written.
    async fn set(
        &self,
        key: CacheKey,
        value: Arc<AggregatedResult>,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Drops every entry whose key satisfies `predicate`. Returns the number
    /// of entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if the backing store cannot be written.
    async fn invalidate(
        &self,
        predicate: &(dyn for<'k> Fn(&'k CacheKey) -> bool + Send + Sync),
    ) -> Result<usize, CacheError>;
}

#[derive(Debug)]
struct CacheEntry {
    value: Arc<AggregatedResult>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process cache bounded to `max_entries`.
///
/// Inserting into a full cache first drops expired entries, then evicts the
/// entry closest to expiry.
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    max_entries: usize,
}

impl MemoryCache {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Arc<AggregatedResult>>, CacheError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| Arc::clone(&entry.value)))
    }

    async fn set(
        &self,
        key: CacheKey,
        value: Arc<AggregatedResult>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| entry.is_live(now));
            if entries.len() >= self.max_entries {
                let soonest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(evicted) = soonest {
                    tracing::debug!(key = %evicted, "evicting cache entry closest to expiry");
                    entries.remove(&evicted);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn invalidate(
        &self,
        predicate: &(dyn for<'k> Fn(&'k CacheKey) -> bool + Send + Sync),
    ) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        Ok(before - entries.len())
    }
}

/// Cache stand-in used when caching is switched off; every operation reports
/// [`CacheError::Unavailable`] so the aggregator runs in always-compute mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCache;

#[async_trait]
impl ResultCache for DisabledCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<Arc<AggregatedResult>>, CacheError> {
        Err(CacheError::Unavailable("caching disabled".to_string()))
    }

    async fn set(
        &self,
        _key: CacheKey,
        _value: Arc<AggregatedResult>,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("caching disabled".to_string()))
    }

    async fn invalidate(
        &self,
        _predicate: &(dyn for<'k> Fn(&'k CacheKey) -> bool + Send + Sync),
    ) -> Result<usize, CacheError> {
        Err(CacheError::Unavailable("caching disabled".to_string()))
    }
}
