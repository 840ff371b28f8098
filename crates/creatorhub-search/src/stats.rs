//! Hand-off point for per-query platform statistics.

use creatorhub_core::{AggregatedResult, SearchQuery};

/// Receives the outcome of every fresh aggregation (cache hits are not
/// reported). Implementations must not block.
pub trait StatsSink: Send + Sync {
    fn record(&self, query: &SearchQuery, result: &AggregatedResult);
}

/// Emits one structured `tracing` event per platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatsSink;

impl StatsSink for TracingStatsSink {
    fn record(&self, query: &SearchQuery, result: &AggregatedResult) {
        for (platform, stat) in &result.platform_stats {
            tracing::info!(
                target: "creatorhub::stats",
                platform = %platform,
                keyword = query.keyword.as_str(),
                page = query.page,
                count = stat.count,
                succeeded = stat.succeeded,
                error_kind = ?stat.error_kind,
                healthy = stat.healthy,
                "platform search stats"
            );
        }
    }
}
