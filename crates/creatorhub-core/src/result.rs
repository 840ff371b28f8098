use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountResult, Platform};

/// Classified reason a platform contributed nothing to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Timeout,
    RateLimited,
    AuthExpired,
    Unavailable,
    Malformed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Timeout => "Timeout",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthExpired => "AuthExpired",
            ErrorKind::Unavailable => "Unavailable",
            ErrorKind::Malformed => "Malformed",
        };
        f.write_str(s)
    }
}

/// Per-platform outcome of one aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStat {
    /// Items this platform contributed to the merged sequence.
    pub count: usize,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Health of the adapter after this query's bookkeeping.
    pub healthy: bool,
}

impl PlatformStat {
    #[must_use]
    pub fn success(count: usize, healthy: bool) -> Self {
        Self {
            count,
            succeeded: true,
            error_kind: None,
            healthy,
        }
    }

    #[must_use]
    pub fn failure(kind: ErrorKind, healthy: bool) -> Self {
        Self {
            count: 0,
            succeeded: false,
            error_kind: Some(kind),
            healthy,
        }
    }
}

/// One page of merged search results. Immutable once built; the cache hands
/// out shared references to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub items: Vec<AccountResult>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub platform_stats: BTreeMap<Platform, PlatformStat>,
    pub fetched_at: DateTime<Utc>,
}

impl AggregatedResult {
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }

    /// True when at least one platform was queried and every one of them failed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.platform_stats.is_empty() && self.platform_stats.values().all(|s| !s.succeeded)
    }

    #[must_use]
    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.platform_stats
            .iter()
            .filter(|(_, stat)| !stat.succeeded)
            .map(|(platform, _)| *platform)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(total: u64, page_size: u32, stats: Vec<(Platform, PlatformStat)>) -> AggregatedResult {
        AggregatedResult {
            items: Vec::new(),
            total,
            page: 1,
            page_size,
            platform_stats: stats.into_iter().collect(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(result_with(41, 20, vec![]).total_pages(), 3);
        assert_eq!(result_with(40, 20, vec![]).total_pages(), 2);
        assert_eq!(result_with(0, 20, vec![]).total_pages(), 0);
    }

    #[test]
    fn all_failed_requires_at_least_one_platform() {
        assert!(!result_with(0, 20, vec![]).all_failed());

        let failed = result_with(
            0,
            20,
            vec![
                (Platform::Telegram, PlatformStat::failure(ErrorKind::Timeout, true)),
                (Platform::Bluesky, PlatformStat::failure(ErrorKind::Unavailable, true)),
            ],
        );
        assert!(failed.all_failed());
        assert_eq!(
            failed.failed_platforms(),
            vec![Platform::Telegram, Platform::Bluesky]
        );
    }

    #[test]
    fn stat_serializes_error_kind_only_on_failure() {
        let ok = serde_json::to_value(PlatformStat::success(2, true)).expect("serialize");
        assert!(ok.get("error_kind").is_none());

        let failed =
            serde_json::to_value(PlatformStat::failure(ErrorKind::Timeout, true)).expect("serialize");
        assert_eq!(failed["error_kind"], "Timeout");
        assert_eq!(failed["count"], 0);
    }
}
