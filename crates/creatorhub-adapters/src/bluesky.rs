//! Bluesky actor search through the public AppView XRPC endpoints.

use async_trait::async_trait;
use creatorhub_core::{AccountResult, Platform};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::adapter::{page_bounds, PlatformAdapter, SearchPage};
use crate::error::AdapterError;
use crate::http::{
    build_client, check_status, collect_chunked, decode_json, endpoint, non_empty,
    normalize_base_url,
};

const DEFAULT_BASE_URL: &str = "https://public.api.bsky.app";
const MAX_CHUNK: usize = 100;

#[derive(Debug, Deserialize)]
struct ActorsResponse {
    #[serde(default)]
    actors: Vec<Actor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Actor {
    did: String,
    handle: String,
    display_name: Option<String>,
    description: Option<String>,
    avatar: Option<String>,
    /// Only present on full profile views, not on search hits.
    followers_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct XrpcError {
    error: Option<String>,
    message: Option<String>,
}

impl Actor {
    fn into_account(self) -> AccountResult {
        AccountResult {
            platform: Platform::Bluesky,
            profile_url: Some(format!("https://bsky.app/profile/{}", self.handle)),
            name: non_empty(self.display_name).or(Some(self.handle)),
            platform_account_id: self.did,
            description: non_empty(self.description),
            avatar_url: non_empty(self.avatar),
            follower_count: self.followers_count.unwrap_or(0),
        }
    }
}

/// Adapter for the short-post platform.
///
/// Keyword queries use `app.bsky.actor.searchActors`; an empty keyword falls
/// back to `app.bsky.actor.getSuggestions`. The platform account id is the
/// actor's DID, which survives handle changes.
pub struct BlueskyAdapter {
    client: Client,
    base_url: Url,
}

impl BlueskyAdapter {
    /// Creates an adapter pointed at the public Bluesky AppView.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, AdapterError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates an adapter with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] if the HTTP client cannot be
    /// built or `base_url` is invalid.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, AdapterError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            base_url: normalize_base_url(base_url)?,
        })
    }

    async fn actors_chunk(
        &self,
        method: &str,
        keyword: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<SearchPage, AdapterError> {
        let url = endpoint(&self.base_url, &format!("xrpc/{method}"))?;
        let mut params = vec![("limit", limit.to_string())];
        if let Some(q) = keyword {
            params.push(("q", q.to_string()));
        }
        // The AppView cursor for these listings is the numeric offset.
        if offset > 0 {
            params.push(("cursor", offset.to_string()));
        }

        let response = self.client.get(url).query(&params).send().await?;
        let body: ActorsResponse = decode_json(check_status(response)?, method).await?;

        Ok(SearchPage {
            items: body.actors.into_iter().map(Actor::into_account).collect(),
            total: None,
        })
    }
}

#[async_trait]
impl PlatformAdapter for BlueskyAdapter {
    fn platform(&self) -> Platform {
        Platform::Bluesky
    }

    async fn search(
        &self,
        keyword: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchPage, AdapterError> {
        let (offset, limit) = page_bounds(page, page_size);
        let (method, q) = if keyword.is_empty() {
            ("app.bsky.actor.getSuggestions", None)
        } else {
            ("app.bsky.actor.searchActors", Some(keyword))
        };

        let result = collect_chunked(offset, limit, MAX_CHUNK, |offset, limit| {
            self.actors_chunk(method, q, offset, limit)
        })
        .await?;

        tracing::debug!(
            platform = "bluesky",
            keyword,
            count = result.items.len(),
            "Bluesky actor search complete"
        );
        Ok(result)
    }

    async fn get_account_by_platform_id(
        &self,
        id: &str,
    ) -> Result<Option<AccountResult>, AdapterError> {
        let url = endpoint(&self.base_url, "xrpc/app.bsky.actor.getProfile")?;
        let response = self.client.get(url).query(&[("actor", id)]).send().await?;

        // Unknown actors come back as 400 InvalidRequest "Profile not found".
        if response.status() == StatusCode::BAD_REQUEST {
            let err: XrpcError = decode_json(response, "app.bsky.actor.getProfile").await?;
            let message = err.message.unwrap_or_default();
            if message.to_ascii_lowercase().contains("not found")
                || err.error.as_deref() == Some("InvalidRequest")
            {
                return Ok(None);
            }
            return Err(AdapterError::Unavailable(format!(
                "getProfile rejected: {message}"
            )));
        }

        let actor: Actor = decode_json(check_status(response)?, "app.bsky.actor.getProfile").await?;
        Ok(Some(actor.into_account()))
    }
}
