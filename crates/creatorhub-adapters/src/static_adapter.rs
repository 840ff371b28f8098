//! In-memory adapter backed by a fixed account list.
//!
//! Used as a stand-in platform in tests and local runs, and as the "mock"
//! side of an adapter hot swap. It can simulate latency and failures, and
//! counts the calls it receives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use creatorhub_core::{AccountResult, ErrorKind, Platform};

use crate::adapter::{page_bounds, PlatformAdapter, SearchPage};
use crate::error::AdapterError;

pub struct StaticAdapter {
    platform: Platform,
    accounts: Vec<AccountResult>,
    delay: Option<Duration>,
    failure: Option<ErrorKind>,
    reports_total: bool,
    search_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
}

impl StaticAdapter {
    /// Accounts whose platform differs from `platform` are re-tagged.
    #[must_use]
    pub fn new(platform: Platform, accounts: Vec<AccountResult>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|mut a| {
                a.platform = platform;
                a
            })
            .collect();

        Self {
            platform,
            accounts,
            delay: None,
            failure: None,
            reports_total: true,
            search_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
        }
    }

    /// Builds `count` accounts named `<prefix> <n>` with ids `<prefix>-<n>`.
    #[must_use]
    pub fn with_generated(platform: Platform, prefix: &str, count: usize) -> Self {
        let accounts = (1..=count)
            .map(|n| {
                let mut account = AccountResult::new(platform, format!("{prefix}-{n}"));
                account.name = Some(format!("{prefix} {n}"));
                account
            })
            .collect();
        Self::new(platform, accounts)
    }

    /// Sleeps for `delay` before answering any call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails every call with an error of `kind`.
    #[must_use]
    pub fn failing(mut self, kind: ErrorKind) -> Self {
        self.failure = Some(kind);
        self
    }

    /// Reports `total: None`, like platforms that cannot count matches.
    #[must_use]
    pub fn without_total(mut self) -> Self {
        self.reports_total = false;
        self
    }

    #[must_use]
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> Result<(), AdapterError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure {
            Some(kind) => Err(AdapterError::from_kind(
                kind,
                format!("{} static adapter", self.platform),
            )),
            None => Ok(()),
        }
    }

    fn matches(account: &AccountResult, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        [
            account.name.as_deref(),
            account.description.as_deref(),
            Some(account.platform_account_id.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

#[async_trait]
impl PlatformAdapter for StaticAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn search(
        &self,
        keyword: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchPage, AdapterError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;

        let needle = keyword.trim().to_lowercase();
        let matching: Vec<&AccountResult> = self
            .accounts
            .iter()
            .filter(|a| Self::matches(a, &needle))
            .collect();
        let (offset, limit) = page_bounds(page, page_size);

        Ok(SearchPage {
            total: self.reports_total.then_some(matching.len() as u64),
            items: matching
                .into_iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
        })
    }

    async fn get_account_by_platform_id(
        &self,
        id: &str,
    ) -> Result<Option<AccountResult>, AdapterError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        Ok(self
            .accounts
            .iter()
            .find(|a| a.platform_account_id == id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_filters_case_insensitively_and_pages() {
        let adapter = StaticAdapter::with_generated(Platform::Telegram, "Tech", 5);

        let first = adapter.search("tech", 1, 2).await.unwrap();
        assert_eq!(first.total, Some(5));
        let ids: Vec<_> = first.items.iter().map(|a| a.platform_account_id.as_str()).collect();
        assert_eq!(ids, vec!["Tech-1", "Tech-2"]);

        let last = adapter.search("TECH", 3, 2).await.unwrap();
        assert_eq!(last.items.len(), 1);

        let none = adapter.search("cooking", 1, 10).await.unwrap();
        assert!(none.items.is_empty());
        assert_eq!(none.total, Some(0));
        assert_eq!(adapter.search_calls(), 3);
    }

    #[tokio::test]
    async fn failing_adapter_reports_kind_and_counts_calls() {
        let adapter = StaticAdapter::with_generated(Platform::Bluesky, "x", 1)
            .failing(ErrorKind::RateLimited);
        let err = adapter.search("", 1, 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(adapter.search_calls(), 1);
    }

    #[tokio::test]
    async fn lookup_returns_none_for_unknown_id() {
        let adapter = StaticAdapter::with_generated(Platform::Mastodon, "m", 2);
        assert!(adapter.get_account_by_platform_id("m-2").await.unwrap().is_some());
        assert!(adapter.get_account_by_platform_id("m-9").await.unwrap().is_none());
        assert_eq!(adapter.lookup_calls(), 2);
    }

    #[tokio::test]
    async fn without_total_omits_total() {
        let adapter = StaticAdapter::with_generated(Platform::Mastodon, "m", 3).without_total();
        assert_eq!(adapter.search("", 1, 10).await.unwrap().total, None);
    }
}
