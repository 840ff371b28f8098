//! Composition helpers shared by the server and CLI binaries.

use std::sync::Arc;

use creatorhub_adapters::{
    AdapterError, BlueskyAdapter, MastodonAdapter, PlatformAdapter, TelegramAdapter,
};
use creatorhub_core::AppConfig;

use crate::aggregator::{Aggregator, AggregatorConfig};
use crate::cache::{DisabledCache, MemoryCache, ResultCache};
use crate::registry::AdapterRegistry;

/// Builds the HTTP adapters enabled by `config`, in registry order.
///
/// Telegram is skipped when no TGStat token is configured.
///
/// # Errors
///
/// Returns [`AdapterError::Unavailable`] if an HTTP client or base URL is invalid.
pub fn build_adapters(config: &AppConfig) -> Result<Vec<Arc<dyn PlatformAdapter>>, AdapterError> {
    let timeout = config.adapter_timeout_secs;
    let user_agent = config.user_agent.as_str();
    let mut adapters: Vec<Arc<dyn PlatformAdapter>> = Vec::new();

    match config.tgstat_api_token.as_deref() {
        Some(token) => adapters.push(Arc::new(TelegramAdapter::with_base_url(
            token,
            timeout,
            user_agent,
            &config.tgstat_base_url,
        )?)),
        None => tracing::warn!("TGSTAT_API_TOKEN not set; telegram adapter disabled"),
    }

    adapters.push(Arc::new(MastodonAdapter::with_base_url(
        config.mastodon_access_token.as_deref(),
        timeout,
        user_agent,
        &config.mastodon_base_url,
    )?));
    adapters.push(Arc::new(BlueskyAdapter::with_base_url(
        timeout,
        user_agent,
        &config.bluesky_base_url,
    )?));

    Ok(adapters)
}

/// `MemoryCache` when caching is enabled, otherwise [`DisabledCache`].
#[must_use]
pub fn build_cache(config: &AppConfig) -> Arc<dyn ResultCache> {
    if config.cache_enabled {
        Arc::new(MemoryCache::new(config.cache_max_entries))
    } else {
        tracing::info!("result cache disabled; every search fans out");
        Arc::new(DisabledCache)
    }
}

/// Wires registry, cache and aggregator from `config`.
///
/// # Errors
///
/// Propagates adapter construction failures from [`build_adapters`].
pub async fn build_aggregator(config: &AppConfig) -> Result<Aggregator, AdapterError> {
    let registry = Arc::new(AdapterRegistry::new());
    for adapter in build_adapters(config)? {
        registry.register(adapter).await;
    }

    Ok(Aggregator::new(
        registry,
        build_cache(config),
        AggregatorConfig::from_app_config(config),
    ))
}
