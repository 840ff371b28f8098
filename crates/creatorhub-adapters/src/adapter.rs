use async_trait::async_trait;
use creatorhub_core::{AccountResult, Platform};

use crate::error::AdapterError;

/// One page of hits returned by a single adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub items: Vec<AccountResult>,
    /// Total matches the platform reports, when it reports one.
    pub total: Option<u64>,
}

impl SearchPage {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Capability contract every platform adapter implements.
///
/// Adapters hold no per-request mutable state; the only resource they own is
/// their HTTP client, released when the adapter is dropped.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Platform served by this adapter. Constant for the adapter's lifetime.
    fn platform(&self) -> Platform;

    /// Searches accounts matching `keyword` (empty = browse).
    ///
    /// `page` is 1-based. "No results" is an empty page, not an error.
    ///
    /// # Errors
    ///
    /// Returns a classified [`AdapterError`] on transport, auth, rate-limit
    /// or response-shape problems.
    async fn search(
        &self,
        keyword: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchPage, AdapterError>;

    /// Looks up one account by its platform-native id.
    ///
    /// Returns `Ok(None)` when the account does not exist.
    ///
    /// # Errors
    ///
    /// Returns a classified [`AdapterError`] on any other failure.
    async fn get_account_by_platform_id(
        &self,
        id: &str,
    ) -> Result<Option<AccountResult>, AdapterError>;
}

/// Converts a 1-based page into the `(offset, limit)` pair most platform
/// APIs take.
#[must_use]
pub fn page_bounds(page: u32, page_size: u32) -> (usize, usize) {
    let page = page.max(1) as usize;
    let size = page_size as usize;
    ((page - 1) * size, size)
}
