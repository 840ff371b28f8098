//! Telegram channel search through the TGStat directory API.
//!
//! TGStat wraps every payload in `{"status": "ok", "response": ...}` and
//! reports failures as `{"status": "error", "error": "<code>"}`, frequently
//! with HTTP 200, so the envelope status is checked on every call.

use async_trait::async_trait;
use creatorhub_core::{AccountResult, Platform};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::adapter::{page_bounds, PlatformAdapter, SearchPage};
use crate::error::AdapterError;
use crate::http::{
    build_client, check_status, collect_chunked, decode_json, endpoint, non_empty,
    normalize_base_url,
};

const DEFAULT_BASE_URL: &str = "https://api.tgstat.ru";
/// TGStat rejects `limit` values above 100.
const MAX_CHUNK: usize = 100;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    response: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    count: Option<u64>,
    #[serde(default)]
    items: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: i64,
    link: Option<String>,
    username: Option<String>,
    title: Option<String>,
    about: Option<String>,
    image640: Option<String>,
    image100: Option<String>,
    participants_count: Option<u64>,
}

impl Channel {
    fn into_account(self) -> AccountResult {
        let profile_url = self.link.as_deref().map(|link| {
            if link.starts_with("http") {
                link.to_string()
            } else {
                format!("https://{link}")
            }
        });
        let name = non_empty(self.title).or_else(|| {
            self.username
                .as_deref()
                .map(|u| u.trim_start_matches('@').to_string())
        });

        AccountResult {
            platform: Platform::Telegram,
            platform_account_id: self.id.to_string(),
            name,
            description: non_empty(self.about),
            avatar_url: non_empty(self.image640).or(non_empty(self.image100)),
            profile_url,
            follower_count: self.participants_count.unwrap_or(0),
        }
    }
}

/// Adapter for the messaging platform.
pub struct TelegramAdapter {
    client: Client,
    token: String,
    base_url: Url,
}

impl TelegramAdapter {
    /// Creates an adapter pointed at the production TGStat API.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(token: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, AdapterError> {
        Self::with_base_url(token, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates an adapter with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] if the HTTP client cannot be
    /// built or `base_url` is invalid.
    pub fn with_base_url(
        token: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, AdapterError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            token: token.to_owned(),
            base_url: normalize_base_url(base_url)?,
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        context: &str,
    ) -> Result<Option<T>, AdapterError> {
        let url = endpoint(&self.base_url, path)?;
        let response = self
            .client
            .get(url)
            .query(&[("token", self.token.as_str())])
            .query(params)
            .send()
            .await?;
        let envelope: Envelope<T> = decode_json(check_status(response)?, context).await?;

        if envelope.status == "ok" {
            return envelope
                .response
                .map(Some)
                .ok_or_else(|| AdapterError::malformed(context, "missing response payload"));
        }

        let code = envelope.error.unwrap_or_default();
        if code.contains("not_found") {
            return Ok(None);
        }
        Err(classify_api_error(&code))
    }

    async fn search_chunk(
        &self,
        keyword: &str,
        offset: usize,
        limit: usize,
    ) -> Result<SearchPage, AdapterError> {
        let mut params = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("peer_type", "channel".to_string()),
        ];
        if !keyword.is_empty() {
            params.push(("q", keyword.to_string()));
        }

        let response: Option<SearchResponse> = self
            .request("channels/search", &params, "channels/search")
            .await?;
        let Some(response) = response else {
            return Ok(SearchPage::empty());
        };

        Ok(SearchPage {
            total: response.count,
            items: response
                .items
                .into_iter()
                .map(Channel::into_account)
                .collect(),
        })
    }
}

/// Maps TGStat error codes onto adapter error kinds.
fn classify_api_error(code: &str) -> AdapterError {
    if code.contains("token") || code.contains("auth") {
        AdapterError::AuthExpired(format!("TGStat error: {code}"))
    } else if code.contains("quota") || code.contains("limit") {
        AdapterError::RateLimited {
            retry_after_secs: None,
        }
    } else {
        AdapterError::Unavailable(format!("TGStat error: {code}"))
    }
}

#[async_trait]
impl PlatformAdapter for TelegramAdapter {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    async fn search(
        &self,
        keyword: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchPage, AdapterError> {
        let (offset, limit) = page_bounds(page, page_size);
        let result = collect_chunked(offset, limit, MAX_CHUNK, |offset, limit| {
            self.search_chunk(keyword, offset, limit)
        })
        .await?;

        tracing::debug!(
            platform = "telegram",
            keyword,
            count = result.items.len(),
            total = ?result.total,
            "TGStat channel search complete"
        );
        Ok(result)
    }

    async fn get_account_by_platform_id(
        &self,
        id: &str,
    ) -> Result<Option<AccountResult>, AdapterError> {
        let channel: Option<Channel> = self
            .request("channels/get", &[("channelId", id.to_string())], "channels/get")
            .await?;
        Ok(channel.map(Channel::into_account))
    }
}
