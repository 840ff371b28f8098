//! Merge pipeline: filter → dedupe → tie-break → paginate.
//!
//! Each stage is a plain function over owned vectors so it can be tested on
//! its own. Input order is the resolved platform order (request order, or
//! registry order for all-platform queries).

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use creatorhub_adapters::SearchPage;
use creatorhub_core::{AccountResult, AggregatedResult, ErrorKind, Platform, PlatformStat, SearchQuery};

/// What one platform produced during a fan-out.
#[derive(Debug, Clone)]
pub struct PlatformOutcome {
    pub platform: Platform,
    pub result: Result<SearchPage, ErrorKind>,
    /// Adapter health after this round's bookkeeping.
    pub healthy: bool,
}

/// Concatenates items from successful outcomes in platform order, keeping
/// each adapter's own order. Items tagged with a platform other than the
/// adapter's are dropped.
#[must_use]
pub fn filter_successful(outcomes: &[PlatformOutcome]) -> Vec<AccountResult> {
    outcomes
        .iter()
        .filter_map(|outcome| {
            outcome
                .result
                .as_ref()
                .ok()
                .map(|page| (outcome.platform, page))
        })
        .flat_map(|(platform, page)| {
            page.items
                .iter()
                .filter(move |item| item.platform == platform)
                .cloned()
        })
        .collect()
}

/// Removes repeated `(platform, platform_account_id)` pairs; the first
/// occurrence wins.
#[must_use]
pub fn dedupe(items: Vec<AccountResult>) -> Vec<AccountResult> {
    let mut seen: HashSet<(Platform, String)> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert((item.platform, item.platform_account_id.clone())))
        .collect()
}

/// Orders items by their platform's position in `order`, stable within a
/// platform. Platforms missing from `order` sort last.
#[must_use]
pub fn tie_break(mut items: Vec<AccountResult>, order: &[Platform]) -> Vec<AccountResult> {
    let rank = |platform: Platform| {
        order
            .iter()
            .position(|p| *p == platform)
            .unwrap_or(order.len())
    };
    items.sort_by_key(|item| rank(item.platform));
    items
}

/// Final page slice over the merged sequence.
#[must_use]
pub fn paginate(items: Vec<AccountResult>, offset: usize, page_size: usize) -> Vec<AccountResult> {
    items.into_iter().skip(offset).take(page_size).collect()
}

/// Sum of each successful platform's reported total, falling back to its
/// returned item count. Failed platforms contribute nothing. Each platform
/// counts at most `reachable` items, the most a single fetch may return, so
/// `total_pages` never promises pages past the fetch window.
#[must_use]
pub fn total(outcomes: &[PlatformOutcome], reachable: u64) -> u64 {
    outcomes
        .iter()
        .filter_map(|outcome| outcome.result.as_ref().ok())
        .map(|page| page.total.unwrap_or(page.items.len() as u64).min(reachable))
        .sum()
}

/// One stat per outcome; `count` is what the platform contributed to the
/// merged (pre-pagination) sequence.
#[must_use]
pub fn platform_stats(
    outcomes: &[PlatformOutcome],
    merged: &[AccountResult],
) -> BTreeMap<Platform, PlatformStat> {
    outcomes
        .iter()
        .map(|outcome| {
            let stat = match &outcome.result {
                Ok(_) => PlatformStat::success(
                    merged
                        .iter()
                        .filter(|item| item.platform == outcome.platform)
                        .count(),
                    outcome.healthy,
                ),
                Err(kind) => PlatformStat::failure(*kind, outcome.healthy),
            };
            (outcome.platform, stat)
        })
        .collect()
}

/// Runs the full pipeline for `query`. `reachable` is the per-platform fetch
/// window cap.
#[must_use]
pub fn merge(
    outcomes: &[PlatformOutcome],
    query: &SearchQuery,
    reachable: u64,
) -> AggregatedResult {
    let order: Vec<Platform> = outcomes.iter().map(|o| o.platform).collect();

    let merged = tie_break(dedupe(filter_successful(outcomes)), &order);
    let platform_stats = platform_stats(outcomes, &merged);
    let items = paginate(merged, query.offset(), query.page_size as usize);

    AggregatedResult {
        items,
        total: total(outcomes, reachable),
        page: query.page,
        page_size: query.page_size,
        platform_stats,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(platform: Platform, id: &str) -> AccountResult {
        AccountResult::new(platform, id)
    }

    fn ok(platform: Platform, ids: &[&str], total: Option<u64>) -> PlatformOutcome {
        PlatformOutcome {
            platform,
            result: Ok(SearchPage {
                items: ids.iter().map(|id| hit(platform, id)).collect(),
                total,
            }),
            healthy: true,
        }
    }

    fn failed(platform: Platform, kind: ErrorKind) -> PlatformOutcome {
        PlatformOutcome {
            platform,
            result: Err(kind),
            healthy: true,
        }
    }

    fn ids(items: &[AccountResult]) -> Vec<String> {
        items
            .iter()
            .map(|i| format!("{}:{}", i.platform, i.platform_account_id))
            .collect()
    }

    #[test]
    fn filter_keeps_platform_order_and_skips_failures() {
        let outcomes = vec![
            ok(Platform::Bluesky, &["b1", "b2"], None),
            failed(Platform::Telegram, ErrorKind::Timeout),
            ok(Platform::Mastodon, &["m1"], None),
        ];
        assert_eq!(
            ids(&filter_successful(&outcomes)),
            vec!["bluesky:b1", "bluesky:b2", "mastodon:m1"]
        );
    }

    #[test]
    fn filter_drops_items_tagged_with_another_platform() {
        let mut outcome = ok(Platform::Mastodon, &["m1"], None);
        if let Ok(page) = &mut outcome.result {
            page.items.push(hit(Platform::Telegram, "stray"));
        }
        assert_eq!(ids(&filter_successful(&[outcome])), vec!["mastodon:m1"]);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let items = vec![
            hit(Platform::Telegram, "1"),
            hit(Platform::Mastodon, "1"),
            hit(Platform::Telegram, "1"),
            hit(Platform::Telegram, "2"),
        ];
        assert_eq!(
            ids(&dedupe(items)),
            vec!["telegram:1", "mastodon:1", "telegram:2"]
        );
    }

    #[test]
    fn tie_break_is_stable_within_platform() {
        let items = vec![
            hit(Platform::Mastodon, "m1"),
            hit(Platform::Telegram, "t1"),
            hit(Platform::Mastodon, "m2"),
            hit(Platform::Telegram, "t2"),
        ];
        let ordered = tie_break(items, &[Platform::Telegram, Platform::Mastodon]);
        assert_eq!(
            ids(&ordered),
            vec!["telegram:t1", "telegram:t2", "mastodon:m1", "mastodon:m2"]
        );
    }

    #[test]
    fn paginate_slices_past_end_to_empty() {
        let items: Vec<_> = (0..5).map(|i| hit(Platform::Telegram, &i.to_string())).collect();
        assert_eq!(paginate(items.clone(), 2, 2).len(), 2);
        assert_eq!(paginate(items.clone(), 4, 2).len(), 1);
        assert!(paginate(items, 10, 2).is_empty());
    }

    #[test]
    fn total_prefers_reported_totals_and_ignores_failures() {
        let outcomes = vec![
            ok(Platform::Telegram, &["t1", "t2"], Some(120)),
            ok(Platform::Mastodon, &["m1", "m2", "m3"], None),
            failed(Platform::Bluesky, ErrorKind::RateLimited),
        ];
        assert_eq!(total(&outcomes, u64::MAX), 123);
    }

    #[test]
    fn total_counts_at_most_the_fetch_window_per_platform() {
        let outcomes = vec![
            ok(Platform::Telegram, &["t1", "t2"], Some(120)),
            ok(Platform::Mastodon, &["m1", "m2", "m3"], None),
        ];
        assert_eq!(total(&outcomes, 10), 13);
    }

    #[test]
    fn merge_builds_stats_for_every_outcome() {
        let outcomes = vec![
            ok(Platform::Telegram, &["t1", "t2"], None),
            failed(Platform::Bluesky, ErrorKind::Timeout),
        ];
        let query = SearchQuery::new("tech", [Platform::Telegram, Platform::Bluesky], 1, 20);
        let result = merge(&outcomes, &query, 500);

        assert_eq!(result.items.len(), 2);
        assert_eq!(result.total, 2);
        assert_eq!(result.platform_stats.len(), 2);
        assert_eq!(
            result.platform_stats[&Platform::Telegram],
            PlatformStat::success(2, true)
        );
        assert_eq!(
            result.platform_stats[&Platform::Bluesky],
            PlatformStat::failure(ErrorKind::Timeout, true)
        );
    }

    #[test]
    fn merge_paginates_after_merging() {
        let outcomes = vec![
            ok(Platform::Telegram, &["t1", "t2", "t3"], None),
            ok(Platform::Mastodon, &["m1", "m2", "m3"], None),
        ];
        let page2 = SearchQuery::new("", [], 2, 2);
        let result = merge(&outcomes, &page2, 500);
        assert_eq!(ids(&result.items), vec!["telegram:t3", "mastodon:m1"]);
        assert_eq!(result.page, 2);
    }
}
