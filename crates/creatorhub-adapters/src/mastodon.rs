//! Mastodon account search via the REST API of one instance.

use async_trait::async_trait;
use creatorhub_core::{AccountResult, Platform};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::adapter::{page_bounds, PlatformAdapter, SearchPage};
use crate::error::AdapterError;
use crate::http::{
    build_client, check_status, collect_chunked, decode_json, endpoint, non_empty,
    normalize_base_url, strip_html,
};

const DEFAULT_BASE_URL: &str = "https://mastodon.social";
const SEARCH_MAX_CHUNK: usize = 40;
const DIRECTORY_MAX_CHUNK: usize = 80;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct Account {
    id: String,
    username: Option<String>,
    display_name: Option<String>,
    note: Option<String>,
    avatar: Option<String>,
    url: Option<String>,
    followers_count: Option<u64>,
}

impl Account {
    fn into_account(self) -> AccountResult {
        AccountResult {
            platform: Platform::Mastodon,
            platform_account_id: self.id,
            name: non_empty(self.display_name).or(non_empty(self.username)),
            description: non_empty(self.note.as_deref().map(strip_html)),
            avatar_url: non_empty(self.avatar),
            profile_url: non_empty(self.url),
            follower_count: self.followers_count.unwrap_or(0),
        }
    }
}

/// Adapter for the microblogging platform.
///
/// Keyword queries go through `/api/v2/search`; an empty keyword browses the
/// instance's public profile directory instead. Neither endpoint reports a
/// total, so pages carry `total: None`.
pub struct MastodonAdapter {
    client: Client,
    access_token: Option<String>,
    base_url: Url,
}

impl MastodonAdapter {
    /// Creates an adapter pointed at `mastodon.social`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(
        access_token: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, AdapterError> {
        Self::with_base_url(access_token, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates an adapter for a specific instance (or a wiremock server).
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] if the HTTP client cannot be
    /// built or `base_url` is invalid.
    pub fn with_base_url(
        access_token: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, AdapterError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            access_token: access_token.map(str::to_owned),
            base_url: normalize_base_url(base_url)?,
        })
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn search_chunk(
        &self,
        keyword: &str,
        offset: usize,
        limit: usize,
    ) -> Result<SearchPage, AdapterError> {
        let url = endpoint(&self.base_url, "api/v2/search")?;
        let response = self
            .get(url)
            .query(&[
                ("q", keyword.to_string()),
                ("type", "accounts".to_string()),
                ("resolve", "false".to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;
        let body: SearchResponse = decode_json(check_status(response)?, "api/v2/search").await?;

        Ok(SearchPage {
            items: body.accounts.into_iter().map(Account::into_account).collect(),
            total: None,
        })
    }

    async fn directory_chunk(&self, offset: usize, limit: usize) -> Result<SearchPage, AdapterError> {
        let url = endpoint(&self.base_url, "api/v1/directory")?;
        let response = self
            .get(url)
            .query(&[
                ("order", "active".to_string()),
                ("local", "false".to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;
        let accounts: Vec<Account> =
            decode_json(check_status(response)?, "api/v1/directory").await?;

        Ok(SearchPage {
            items: accounts.into_iter().map(Account::into_account).collect(),
            total: None,
        })
    }
}

#[async_trait]
impl PlatformAdapter for MastodonAdapter {
    fn platform(&self) -> Platform {
        Platform::Mastodon
    }

    async fn search(
        &self,
        keyword: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchPage, AdapterError> {
        let (offset, limit) = page_bounds(page, page_size);
        let result = if keyword.is_empty() {
            collect_chunked(offset, limit, DIRECTORY_MAX_CHUNK, |offset, limit| {
                self.directory_chunk(offset, limit)
            })
            .await?
        } else {
            collect_chunked(offset, limit, SEARCH_MAX_CHUNK, |offset, limit| {
                self.search_chunk(keyword, offset, limit)
            })
            .await?
        };

        tracing::debug!(
            platform = "mastodon",
            keyword,
            count = result.items.len(),
            "Mastodon account search complete"
        );
        Ok(result)
    }

    async fn get_account_by_platform_id(
        &self,
        id: &str,
    ) -> Result<Option<AccountResult>, AdapterError> {
        // Mastodon ids are numeric snowflakes; anything else cannot exist.
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(None);
        }

        let url = endpoint(&self.base_url, &format!("api/v1/accounts/{id}"))?;
        let response = self.get(url).send().await?;

        // Suspended accounts answer 410.
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Ok(None);
        }

        let account: Account = decode_json(check_status(response)?, "api/v1/accounts").await?;
        Ok(Some(account.into_account()))
    }
}
