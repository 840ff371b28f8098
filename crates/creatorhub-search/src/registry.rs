//! Adapter registry: at most one adapter per platform, in registration order.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use creatorhub_adapters::PlatformAdapter;
use creatorhub_core::{AccountResult, Platform, PlatformInfo};
use tokio::sync::RwLock;

use crate::error::SearchError;

/// Consecutive-failure bookkeeping for one registered adapter.
///
/// Purely a monitoring signal: unhealthy adapters keep receiving queries.
#[derive(Debug)]
pub struct AdapterHealth {
    consecutive_failures: AtomicU32,
    healthy: AtomicBool,
}

impl Default for AdapterHealth {
    fn default() -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            healthy: AtomicBool::new(true),
        }
    }
}

impl AdapterHealth {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Resets the failure streak. Returns `true` if the adapter was unhealthy.
    pub fn record_success(&self) -> bool {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        !self.healthy.swap(true, Ordering::SeqCst)
    }

    /// Extends the failure streak. Returns `true` only on the call that
    /// crosses `threshold` and flips the adapter to unhealthy.
    pub fn record_failure(&self, threshold: u32) -> bool {
        let failures = self
            .consecutive_failures
            .fetch_add(1, Ordering::SeqCst)
            .saturating_add(1);
        if failures >= threshold {
            return self.healthy.swap(false, Ordering::SeqCst);
        }
        false
    }
}

/// Registry record handed out by [`AdapterRegistry::resolve`].
///
/// Cloning is cheap; clones share the adapter and its health state.
#[derive(Clone)]
pub struct AdapterDescriptor {
    pub platform: Platform,
    pub adapter: Arc<dyn PlatformAdapter>,
    pub health: Arc<AdapterHealth>,
}

impl std::fmt::Debug for AdapterDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterDescriptor")
            .field("platform", &self.platform)
            .field("healthy", &self.health.is_healthy())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<Vec<AdapterDescriptor>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` under its own platform key.
    ///
    /// Re-registering a platform swaps the adapter in place: it keeps its
    /// registry position and starts with fresh health. Returns the replaced
    /// descriptor, if any.
    pub async fn register(&self, adapter: Arc<dyn PlatformAdapter>) -> Option<AdapterDescriptor> {
        let platform = adapter.platform();
        let descriptor = AdapterDescriptor {
            platform,
            adapter,
            health: Arc::new(AdapterHealth::default()),
        };

        let mut adapters = self.adapters.write().await;
        if let Some(slot) = adapters.iter_mut().find(|d| d.platform == platform) {
            tracing::info!(platform = %platform, "replacing registered adapter");
            return Some(std::mem::replace(slot, descriptor));
        }

        tracing::info!(platform = %platform, "registered adapter");
        adapters.push(descriptor);
        None
    }

    /// Resolves the adapters for a query.
    ///
    /// An empty request yields every adapter in registry order. Otherwise the
    /// result follows the request order; platforms without an adapter are
    /// logged and skipped.
    pub async fn resolve(&self, requested: &[Platform]) -> Vec<AdapterDescriptor> {
        let adapters = self.adapters.read().await;
        if requested.is_empty() {
            return adapters.clone();
        }

        requested
            .iter()
            .filter_map(|platform| {
                let found = adapters.iter().find(|d| d.platform == *platform).cloned();
                if found.is_none() {
                    tracing::warn!(
                        error = %SearchError::UnknownPlatformRequested(platform.to_string()),
                        "ignoring platform without a registered adapter"
                    );
                }
                found
            })
            .collect()
    }

    pub async fn get(&self, platform: Platform) -> Option<AdapterDescriptor> {
        self.adapters
            .read()
            .await
            .iter()
            .find(|d| d.platform == platform)
            .cloned()
    }

    pub async fn list_supported_platforms(&self) -> Vec<PlatformInfo> {
        self.adapters
            .read()
            .await
            .iter()
            .map(|d| d.platform.info(d.health.is_healthy()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.adapters.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.adapters.read().await.is_empty()
    }

    /// Looks up one account through a single adapter, bypassing aggregation.
    ///
    /// # Errors
    ///
    /// - [`SearchError::UnknownPlatformRequested`] if no adapter serves `platform`.
    /// - [`SearchError::Adapter`] if the adapter call fails.
    pub async fn lookup_account(
        &self,
        platform: Platform,
        platform_account_id: &str,
    ) -> Result<Option<AccountResult>, SearchError> {
        let descriptor = self
            .get(platform)
            .await
            .ok_or_else(|| SearchError::UnknownPlatformRequested(platform.to_string()))?;

        descriptor
            .adapter
            .get_account_by_platform_id(platform_account_id)
            .await
            .map_err(|source| SearchError::Adapter { platform, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creatorhub_adapters::StaticAdapter;

    fn adapter(platform: Platform, prefix: &str) -> Arc<dyn PlatformAdapter> {
        Arc::new(StaticAdapter::with_generated(platform, prefix, 2))
    }

    #[tokio::test]
    async fn resolve_empty_returns_registry_order() {
        let registry = AdapterRegistry::new();
        registry.register(adapter(Platform::Bluesky, "b")).await;
        registry.register(adapter(Platform::Telegram, "t")).await;

        let platforms: Vec<_> = registry.resolve(&[]).await.iter().map(|d| d.platform).collect();
        assert_eq!(platforms, vec![Platform::Bluesky, Platform::Telegram]);
    }

    #[tokio::test]
    async fn resolve_follows_request_order_and_skips_unregistered() {
        let registry = AdapterRegistry::new();
        registry.register(adapter(Platform::Bluesky, "b")).await;
        registry.register(adapter(Platform::Telegram, "t")).await;

        let platforms: Vec<_> = registry
            .resolve(&[Platform::Telegram, Platform::Mastodon, Platform::Bluesky])
            .await
            .iter()
            .map(|d| d.platform)
            .collect();
        assert_eq!(platforms, vec![Platform::Telegram, Platform::Bluesky]);
    }

    #[tokio::test]
    async fn register_replaces_in_place_and_resets_health() {
        let registry = AdapterRegistry::new();
        registry.register(adapter(Platform::Telegram, "old")).await;
        registry.register(adapter(Platform::Mastodon, "m")).await;

        let old = registry.get(Platform::Telegram).await.expect("registered");
        for _ in 0..5 {
            old.health.record_failure(5);
        }
        assert!(!old.health.is_healthy());

        let replaced = registry.register(adapter(Platform::Telegram, "new")).await;
        assert!(replaced.is_some());
        assert_eq!(registry.len().await, 2);

        let current = registry.get(Platform::Telegram).await.expect("registered");
        assert!(current.health.is_healthy());
        let page = current.adapter.search("", 1, 10).await.unwrap();
        assert_eq!(page.items[0].platform_account_id, "new-1");

        let order: Vec<_> = registry
            .list_supported_platforms()
            .await
            .iter()
            .map(|p| p.platform)
            .collect();
        assert_eq!(order, vec![Platform::Telegram, Platform::Mastodon]);
    }

    #[tokio::test]
    async fn lookup_account_unknown_platform_is_error() {
        let registry = AdapterRegistry::new();
        let result = registry.lookup_account(Platform::Bluesky, "did:plc:x").await;
        assert!(matches!(
            result,
            Err(SearchError::UnknownPlatformRequested(ref p)) if p == "bluesky"
        ));
    }

    #[tokio::test]
    async fn lookup_account_delegates_to_adapter() {
        let registry = AdapterRegistry::new();
        registry.register(adapter(Platform::Mastodon, "m")).await;
        let found = registry.lookup_account(Platform::Mastodon, "m-1").await.unwrap();
        assert!(found.is_some());
        let missing = registry.lookup_account(Platform::Mastodon, "m-7").await.unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn health_flips_once_at_threshold_and_recovers() {
        let health = AdapterHealth::default();
        assert!(!health.record_failure(3));
        assert!(!health.record_failure(3));
        assert!(health.record_failure(3), "third failure crosses threshold");
        assert!(!health.record_failure(3), "already unhealthy");
        assert!(!health.is_healthy());
        assert_eq!(health.consecutive_failures(), 4);

        assert!(health.record_success(), "recovery reported once");
        assert!(health.is_healthy());
        assert_eq!(health.consecutive_failures(), 0);
        assert!(!health.record_success());
    }
}
