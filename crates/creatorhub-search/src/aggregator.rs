//! Search aggregator: cache check, concurrent fan-out, merge, cache write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use creatorhub_adapters::{PlatformAdapter, SearchPage};
use creatorhub_core::{AggregatedResult, AppConfig, ErrorKind, Platform, SearchQuery};
use tokio::sync::OnceCell;
use tokio::task::JoinSet;

use crate::cache::{CacheKey, ResultCache};
use crate::error::SearchError;
use crate::merge::{merge, PlatformOutcome};
use crate::registry::{AdapterDescriptor, AdapterRegistry};
use crate::stats::{StatsSink, TracingStatsSink};

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Shared budget for the whole fan-out, not per adapter.
    pub deadline: Duration,
    pub cache_ttl: Duration,
    /// TTL for pages where some (not all) platforms failed.
    pub partial_ttl: Duration,
    pub unhealthy_threshold: u32,
    /// Upper bound on items requested from any one adapter.
    pub max_fetch_window: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(3),
            cache_ttl: Duration::from_secs(300),
            partial_ttl: Duration::from_secs(30),
            unhealthy_threshold: 5,
            max_fetch_window: 500,
        }
    }
}

impl AggregatorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let cache_ttl = config.cache_ttl();
        Self {
            deadline: config.search_deadline(),
            cache_ttl,
            partial_ttl: cache_ttl.min(Self::default().partial_ttl),
            unhealthy_threshold: config.unhealthy_threshold.max(1),
            max_fetch_window: config.max_fetch_window.max(1),
        }
    }
}

/// A search answer plus where it came from.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub result: Arc<AggregatedResult>,
    pub cached: bool,
}

impl SearchOutcome {
    /// Milliseconds since the underlying page was aggregated.
    #[must_use]
    pub fn cache_age_ms(&self) -> i64 {
        (Utc::now() - self.result.fetched_at)
            .num_milliseconds()
            .max(0)
    }
}

/// What one aggregation hands to every caller sharing its flight.
#[derive(Debug, Clone)]
struct FlightResult {
    result: Arc<AggregatedResult>,
    from_cache: bool,
    cache_available: bool,
}

type Flight = Arc<OnceCell<FlightResult>>;

/// A caller's claim on its key's flight. Dropping it, including when the
/// search future is cancelled, releases the map entry once the flight is
/// done or nobody else holds it.
struct FlightGuard<'a> {
    inflight: &'a Mutex<HashMap<CacheKey, Flight>>,
    key: &'a CacheKey,
    flight: Flight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // An unfinished flight stays while other callers can still take it over.
        let release = inflight.get(self.key).is_some_and(|current| {
            Arc::ptr_eq(current, &self.flight)
                && (self.flight.initialized() || Arc::strong_count(&self.flight) == 2)
        });
        if release {
            inflight.remove(self.key);
        }
    }
}

pub struct Aggregator {
    registry: Arc<AdapterRegistry>,
    cache: Arc<dyn ResultCache>,
    stats: Arc<dyn StatsSink>,
    config: AggregatorConfig,
    inflight: Mutex<HashMap<CacheKey, Flight>>,
    /// Bumped on every adapter swap; pages computed across a swap are not cached.
    generation: AtomicU64,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        registry: Arc<AdapterRegistry>,
        cache: Arc<dyn ResultCache>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            stats: Arc::new(TracingStatsSink),
            config,
            inflight: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_stats_sink(mut self, stats: Arc<dyn StatsSink>) -> Self {
        self.stats = stats;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Answers `query` from the cache or by fanning out to its adapters.
    ///
    /// Adapter failures never fail the query; they show up in
    /// `platform_stats`. At most one aggregation per cache key runs at a
    /// time: concurrent callers for the same key wait for it and share its
    /// result, whether or not that result was cacheable.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Degraded`] only when every queried platform
    /// failed and the cache could not be used.
    pub async fn search(&self, query: SearchQuery) -> Result<SearchOutcome, SearchError> {
        let key = CacheKey::for_query(&query);

        let cache_available = match self.cache.get(&key).await {
            Ok(Some(hit)) => {
                tracing::debug!(key = %key, "search cache hit");
                return Ok(SearchOutcome {
                    result: hit,
                    cached: true,
                });
            }
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(error = %e, "result cache read failed; computing without cache");
                false
            }
        };

        let guard = self.join_flight(&key);
        let shared = guard
            .flight
            .get_or_init(|| self.compute(&query, &key, cache_available))
            .await
            .clone();
        drop(guard);

        if shared.result.all_failed() && !shared.cache_available {
            return Err(SearchError::Degraded {
                platforms: shared.result.failed_platforms(),
            });
        }

        Ok(SearchOutcome {
            result: shared.result,
            cached: shared.from_cache,
        })
    }

    /// Runs once per flight. If the flight's first caller is cancelled, the
    /// next waiting caller runs it instead.
    async fn compute(
        &self,
        query: &SearchQuery,
        key: &CacheKey,
        mut cache_available: bool,
    ) -> FlightResult {
        if cache_available {
            match self.cache.get(key).await {
                Ok(Some(hit)) => {
                    tracing::debug!(key = %key, "search cache filled by concurrent caller");
                    return FlightResult {
                        result: hit,
                        from_cache: true,
                        cache_available: true,
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "result cache read failed; computing without cache");
                    cache_available = false;
                }
            }
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let result = Arc::new(self.aggregate(query).await);
        self.stats.record(query, &result);

        let swapped = self.generation.load(Ordering::SeqCst) != generation;
        if swapped {
            tracing::debug!(key = %key, "adapter swapped during search; result not cached");
        }
        if let Some(ttl) = self.ttl_for(&result).filter(|_| !swapped) {
            if let Err(e) = self.cache.set(key.clone(), Arc::clone(&result), ttl).await {
                tracing::warn!(error = %e, "result cache write failed");
                cache_available = false;
            }
        }

        FlightResult {
            result,
            from_cache: false,
            cache_available,
        }
    }

    /// Fully failed pages are never cached; partial pages expire sooner.
    fn ttl_for(&self, result: &AggregatedResult) -> Option<Duration> {
        if result.all_failed() {
            None
        } else if result.platform_stats.values().any(|s| !s.succeeded) {
            Some(self.config.partial_ttl)
        } else {
            Some(self.config.cache_ttl)
        }
    }

    async fn aggregate(&self, query: &SearchQuery) -> AggregatedResult {
        let descriptors = self.registry.resolve(&query.platforms).await;
        let window = query.fetch_window().min(self.config.max_fetch_window);
        let window = u32::try_from(window).unwrap_or(u32::MAX);

        let started = Instant::now();
        let results = self.fan_out(&descriptors, &query.keyword, window).await;

        let outcomes: Vec<PlatformOutcome> = descriptors
            .iter()
            .zip(results)
            .map(|(descriptor, result)| PlatformOutcome {
                platform: descriptor.platform,
                healthy: self.record_health(descriptor, &result),
                result,
            })
            .collect();

        let reachable = u64::try_from(self.config.max_fetch_window).unwrap_or(u64::MAX);
        let result = merge(&outcomes, query, reachable);
        tracing::debug!(
            keyword = query.keyword.as_str(),
            platforms = outcomes.len(),
            items = result.items.len(),
            total = result.total,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "aggregated search"
        );
        result
    }

    /// Issues one task per adapter and collects results until all finish or
    /// the shared deadline passes. Results come back in `descriptors` order.
    async fn fan_out(
        &self,
        descriptors: &[AdapterDescriptor],
        keyword: &str,
        window: u32,
    ) -> Vec<Result<SearchPage, ErrorKind>> {
        let mut slots: Vec<Option<Result<SearchPage, ErrorKind>>> =
            (0..descriptors.len()).map(|_| None).collect();
        let deadline = tokio::time::Instant::now() + self.config.deadline;
        let mut tasks = JoinSet::new();

        for (index, descriptor) in descriptors.iter().enumerate() {
            let adapter: Arc<dyn PlatformAdapter> = Arc::clone(&descriptor.adapter);
            let platform = descriptor.platform;
            let keyword = keyword.to_owned();
            tasks.spawn(async move {
                let started = Instant::now();
                let result = adapter.search(&keyword, 1, window).await;
                log_adapter_result(platform, &result, started.elapsed());
                (index, result.map_err(|e| e.kind()))
            });
        }

        let mut timed_out = false;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, result)))) => slots[index] = Some(result),
                Ok(Some(Err(e))) => {
                    tracing::error!(error = %e, "adapter search task failed");
                }
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    break;
                }
            }
        }

        if timed_out {
            tracing::warn!(
                pending = tasks.len(),
                deadline_ms = u64::try_from(self.config.deadline.as_millis()).unwrap_or(u64::MAX),
                "search deadline reached; cancelling outstanding adapter calls"
            );
            tasks.abort_all();
        }

        // Unfilled slots either missed the deadline or their task panicked.
        let missing = if timed_out {
            ErrorKind::Timeout
        } else {
            ErrorKind::Unavailable
        };
        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(missing)))
            .collect()
    }

    /// Updates the descriptor's failure streak and returns its health.
    fn record_health(
        &self,
        descriptor: &AdapterDescriptor,
        result: &Result<SearchPage, ErrorKind>,
    ) -> bool {
        let health = &descriptor.health;
        match result {
            Ok(_) => {
                if health.record_success() {
                    tracing::info!(platform = %descriptor.platform, "adapter recovered");
                }
            }
            Err(kind) => {
                if health.record_failure(self.config.unhealthy_threshold) {
                    tracing::warn!(
                        platform = %descriptor.platform,
                        failures = health.consecutive_failures(),
                        error_kind = %kind,
                        "adapter marked unhealthy after consecutive failures"
                    );
                }
            }
        }
        health.is_healthy()
    }

    /// Registers `adapter` (replacing any adapter for its platform) and drops
    /// cached pages that may contain the old adapter's results. Returns the
    /// number of cache entries removed.
    pub async fn swap_adapter(&self, adapter: Arc<dyn PlatformAdapter>) -> usize {
        let platform = adapter.platform();
        self.registry.register(adapter).await;
        // After registration: a search that resolved the old adapter sees the bump.
        self.generation.fetch_add(1, Ordering::SeqCst);

        match self.invalidate(Some(platform)).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(platform = %platform, error = %e, "cache invalidation after adapter swap failed");
                0
            }
        }
    }

    /// Drops cached pages covering `platform`, or every page when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::CacheUnavailable`] if the cache cannot be written.
    pub async fn invalidate(&self, platform: Option<Platform>) -> Result<usize, SearchError> {
        let removed = match platform {
            Some(platform) => {
                self.cache
                    .invalidate(&move |key: &CacheKey| key.covers(platform))
                    .await?
            }
            None => self.cache.invalidate(&|_: &CacheKey| true).await?,
        };
        tracing::info!(
            platform = platform.map(Platform::as_str),
            removed,
            "invalidated cached search pages"
        );
        Ok(removed)
    }

    fn join_flight<'a>(&'a self, key: &'a CacheKey) -> FlightGuard<'a> {
        let flight = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(inflight.entry(key.clone()).or_default())
        };
        FlightGuard {
            inflight: &self.inflight,
            key,
            flight,
        }
    }

    #[cfg(test)]
    fn inflight_len(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn log_adapter_result(
    platform: Platform,
    result: &Result<SearchPage, creatorhub_adapters::AdapterError>,
    elapsed: Duration,
) {
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(page) => tracing::debug!(
            platform = %platform,
            count = page.items.len(),
            total = ?page.total,
            elapsed_ms,
            "adapter search succeeded"
        ),
        Err(e) => tracing::warn!(
            platform = %platform,
            error_kind = %e.kind(),
            error = %e,
            elapsed_ms,
            "adapter search failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use creatorhub_adapters::StaticAdapter;

    async fn aggregator_with(adapter: StaticAdapter) -> (Aggregator, Arc<StaticAdapter>) {
        let adapter = Arc::new(adapter);
        let registry = Arc::new(AdapterRegistry::new());
        registry.register(adapter.clone()).await;
        let aggregator = Aggregator::new(
            registry,
            Arc::new(MemoryCache::new(100)),
            AggregatorConfig::default(),
        );
        (aggregator, adapter)
    }

    #[tokio::test]
    async fn flight_entries_are_released_after_search() {
        let (aggregator, _) =
            aggregator_with(StaticAdapter::with_generated(Platform::Telegram, "t", 3)).await;
        aggregator
            .search(SearchQuery::new("t", [], 1, 10))
            .await
            .unwrap();
        assert_eq!(aggregator.inflight_len(), 0);
    }

    #[tokio::test]
    async fn concurrent_identical_queries_share_one_fan_out() {
        let (aggregator, adapter) = aggregator_with(
            StaticAdapter::with_generated(Platform::Telegram, "t", 3)
                .with_delay(Duration::from_millis(100)),
        )
        .await;

        let query = SearchQuery::new("t", [], 1, 10);
        let (a, b, c) = tokio::join!(
            aggregator.search(query.clone()),
            aggregator.search(query.clone()),
            aggregator.search(query),
        );

        let outcomes = [a.unwrap(), b.unwrap(), c.unwrap()];
        assert_eq!(adapter.search_calls(), 1);
        assert!(outcomes.iter().all(|o| !o.cached));
        assert!(outcomes
            .iter()
            .all(|o| Arc::ptr_eq(&o.result, &outcomes[0].result)));
        assert_eq!(aggregator.inflight_len(), 0);
    }

    #[tokio::test]
    async fn cancelled_search_releases_its_flight() {
        let (aggregator, _) = aggregator_with(
            StaticAdapter::with_generated(Platform::Telegram, "t", 3)
                .with_delay(Duration::from_millis(500)),
        )
        .await;

        let cancelled = tokio::time::timeout(
            Duration::from_millis(50),
            aggregator.search(SearchQuery::new("t", [], 1, 10)),
        )
        .await;
        assert!(cancelled.is_err());
        assert_eq!(aggregator.inflight_len(), 0);
    }

    #[tokio::test]
    async fn waiter_takes_over_when_the_first_caller_is_cancelled() {
        let (aggregator, adapter) = aggregator_with(
            StaticAdapter::with_generated(Platform::Telegram, "t", 3)
                .with_delay(Duration::from_millis(100)),
        )
        .await;
        let query = SearchQuery::new("t", [], 1, 10);

        let (first, second) = tokio::join!(
            tokio::time::timeout(Duration::from_millis(30), aggregator.search(query.clone())),
            aggregator.search(query),
        );
        assert!(first.is_err());
        assert_eq!(second.unwrap().result.items.len(), 3);
        assert_eq!(adapter.search_calls(), 2);
        assert_eq!(aggregator.inflight_len(), 0);
    }

    #[tokio::test]
    async fn partial_failure_uses_shorter_ttl_and_full_failure_is_not_cached() {
        let (aggregator, _) = aggregator_with(
            StaticAdapter::with_generated(Platform::Telegram, "t", 1).failing(ErrorKind::Unavailable),
        )
        .await;
        let result = aggregator
            .search(SearchQuery::new("t", [], 1, 10))
            .await
            .expect("cache available, so all-failed is still a result");
        assert!(result.result.all_failed());
        assert_eq!(aggregator.ttl_for(&result.result), None);

        let mut partial = (*result.result).clone();
        partial.platform_stats.insert(
            Platform::Mastodon,
            creatorhub_core::PlatformStat::success(1, true),
        );
        assert_eq!(
            aggregator.ttl_for(&partial),
            Some(aggregator.config().partial_ttl)
        );
    }

    #[test]
    fn config_from_app_config_caps_partial_ttl_by_cache_ttl() {
        let mut app = creatorhub_core::build_app_config(|_| Err(std::env::VarError::NotPresent))
            .expect("defaults are valid");
        app.cache_ttl_secs = 10;
        app.search_deadline_ms = 750;
        let config = AggregatorConfig::from_app_config(&app);
        assert_eq!(config.deadline, Duration::from_millis(750));
        assert_eq!(config.cache_ttl, Duration::from_secs(10));
        assert_eq!(config.partial_ttl, Duration::from_secs(10));
    }
}
