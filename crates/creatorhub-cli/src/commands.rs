//! Subcommand handlers. Each returns the pretty-printed JSON to emit.

use creatorhub_core::{parse_platform_list, AccountId, SearchQuery};
use creatorhub_search::Aggregator;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SearchOutput<'a> {
    cached: bool,
    #[serde(flatten)]
    result: &'a creatorhub_core::AggregatedResult,
    total_pages: u64,
}

/// # Errors
///
/// Returns an error when every requested platform is unknown, when the search
/// is degraded, or if the output cannot be serialized.
pub(crate) async fn run_search(
    aggregator: &Aggregator,
    keyword: &str,
    platforms: Option<&str>,
    page: u32,
    page_size: u32,
) -> anyhow::Result<String> {
    let (platforms, unknown) = parse_platform_list(platforms.unwrap_or(""));
    if !unknown.is_empty() {
        tracing::warn!(unknown = ?unknown, "ignoring unknown platform keys");
        if platforms.is_empty() {
            anyhow::bail!("no known platforms in --platforms: {}", unknown.join(", "));
        }
    }

    let query = SearchQuery::new(keyword, platforms, page, page_size);
    let outcome = aggregator.search(query).await?;

    for (platform, stat) in &outcome.result.platform_stats {
        if let Some(kind) = stat.error_kind {
            tracing::warn!(platform = %platform, error_kind = %kind, "platform returned no results");
        }
    }

    Ok(serde_json::to_string_pretty(&SearchOutput {
        cached: outcome.cached,
        result: &outcome.result,
        total_pages: outcome.result.total_pages(),
    })?)
}

/// # Errors
///
/// Returns an error if the output cannot be serialized.
pub(crate) async fn run_platforms(aggregator: &Aggregator) -> anyhow::Result<String> {
    let platforms = aggregator.registry().list_supported_platforms().await;
    Ok(serde_json::to_string_pretty(&platforms)?)
}

/// # Errors
///
/// Returns an error for a malformed id, an unregistered platform, an adapter
/// failure, or an account that does not exist.
pub(crate) async fn run_account(aggregator: &Aggregator, account_id: &str) -> anyhow::Result<String> {
    let id: AccountId = account_id.parse()?;
    let account = aggregator
        .registry()
        .lookup_account(id.platform, &id.platform_account_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("account {id} not found"))?;
    Ok(serde_json::to_string_pretty(&account)?)
}
