//! HTTP plumbing shared by the network adapters.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::adapter::SearchPage;
use crate::error::AdapterError;

/// Builds the `reqwest::Client` an adapter owns for its lifetime.
///
/// # Errors
///
/// Returns [`AdapterError::Unavailable`] if the client cannot be constructed.
pub(crate) fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client, AdapterError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(5))
        .user_agent(user_agent)
        .build()
        .map_err(|e| AdapterError::Unavailable(format!("failed to build HTTP client: {e}")))
}

/// Parses `base_url`, ensuring exactly one trailing slash so that
/// `Url::join` appends to the path instead of replacing its last segment.
///
/// # Errors
///
/// Returns [`AdapterError::Unavailable`] if `base_url` is not a valid URL.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<Url, AdapterError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised)
        .map_err(|e| AdapterError::Unavailable(format!("invalid base URL '{base_url}': {e}")))
}

/// Joins a relative endpoint path onto a normalized base URL.
///
/// # Errors
///
/// Returns [`AdapterError::Unavailable`] if the joined URL is invalid.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, AdapterError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| AdapterError::Unavailable(format!("invalid endpoint '{path}': {e}")))
}

/// Maps non-2xx statuses onto adapter error kinds.
///
/// - 401/403 → [`AdapterError::AuthExpired`]
/// - 429 → [`AdapterError::RateLimited`], honouring a numeric `Retry-After`
/// - 408/504 → [`AdapterError::Timeout`]
/// - anything else → [`AdapterError::Unavailable`]
///
/// # Errors
///
/// Returns the classified error for any non-success status.
pub(crate) fn check_status(response: Response) -> Result<Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AdapterError::AuthExpired(format!("HTTP {status} from {}", response.url()))
        }
        StatusCode::TOO_MANY_REQUESTS => AdapterError::RateLimited {
            retry_after_secs: response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok()),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => AdapterError::Timeout,
        _ => AdapterError::Unavailable(format!("HTTP {status} from {}", response.url())),
    };
    Err(err)
}

/// Reads the body and deserializes it, reporting shape errors as
/// [`AdapterError::Malformed`] with `context`.
///
/// # Errors
///
/// Returns [`AdapterError::Malformed`] on invalid JSON or a transport error
/// while reading the body.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, AdapterError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| AdapterError::malformed(context, e))
}

/// Fetches `limit` items starting at `offset` from an API that caps each
/// request at `max_chunk`, issuing sequential requests until the window is
/// filled or the platform runs out of results.
///
/// The reported total is the last one the platform returned.
///
/// # Errors
///
/// Propagates the first error from `fetch`; partial chunks are discarded.
pub(crate) async fn collect_chunked<F, Fut>(
    offset: usize,
    limit: usize,
    max_chunk: usize,
    mut fetch: F,
) -> Result<SearchPage, AdapterError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<SearchPage, AdapterError>>,
{
    let max_chunk = max_chunk.max(1);
    let mut collected = SearchPage::empty();

    while collected.items.len() < limit {
        let chunk = (limit - collected.items.len()).min(max_chunk);
        let page = fetch(offset + collected.items.len(), chunk).await?;
        let received = page.items.len();

        collected.items.extend(page.items);
        if page.total.is_some() {
            collected.total = page.total;
        }
        if received < chunk {
            break;
        }
    }

    collected.items.truncate(limit);
    Ok(collected)
}

/// Flattens an HTML fragment (profile bios) to plain text.
pub(crate) fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    let mut tag = String::new();

    for ch in input.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name = tag.trim_start_matches('/').to_ascii_lowercase();
                if (name.starts_with("br") || name == "p") && !out.ends_with(' ') && !out.is_empty()
                {
                    out.push(' ');
                }
            }
            _ if in_tag => tag.push(ch),
            _ => out.push(ch),
        }
    }

    let decoded = out
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns `None` for empty or whitespace-only strings.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use creatorhub_core::{AccountResult, Platform};
    use std::sync::{Arc, Mutex};

    fn accounts(range: std::ops::Range<usize>) -> Vec<AccountResult> {
        range
            .map(|i| AccountResult::new(Platform::Mastodon, i.to_string()))
            .collect()
    }

    #[test]
    fn normalize_base_url_appends_single_slash() {
        let url = normalize_base_url("https://mastodon.social//").unwrap();
        assert_eq!(url.as_str(), "https://mastodon.social/");
        let joined = endpoint(&url, "/api/v2/search").unwrap();
        assert_eq!(joined.as_str(), "https://mastodon.social/api/v2/search");
    }

    #[test]
    fn normalize_base_url_keeps_path_prefix() {
        let url = normalize_base_url("http://127.0.0.1:9000/proxy").unwrap();
        let joined = endpoint(&url, "xrpc/app.bsky.actor.searchActors").unwrap();
        assert_eq!(
            joined.as_str(),
            "http://127.0.0.1:9000/proxy/xrpc/app.bsky.actor.searchActors"
        );
    }

    #[test]
    fn strip_html_flattens_markup_and_entities() {
        let html = "<p>Rust &amp; systems</p><p>Talks <a href=\"x\">@here</a><br/>daily</p>";
        assert_eq!(strip_html(html), "Rust & systems Talks @here daily");
    }

    #[test]
    fn non_empty_drops_blank_strings() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some("x".to_string())), Some("x".to_string()));
    }

    #[tokio::test]
    async fn collect_chunked_splits_large_windows() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let page = collect_chunked(10, 25, 10, |offset, limit| {
            seen.lock().unwrap().push((offset, limit));
            async move {
                Ok(SearchPage {
                    items: accounts(offset..offset + limit),
                    total: Some(100),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(page.items.len(), 25);
        assert_eq!(page.items[0].platform_account_id, "10");
        assert_eq!(page.total, Some(100));
        assert_eq!(*calls.lock().unwrap(), vec![(10, 10), (20, 10), (30, 5)]);
    }

    #[tokio::test]
    async fn collect_chunked_stops_on_short_chunk() {
        let calls = Arc::new(Mutex::new(0usize));
        let seen = Arc::clone(&calls);
        let page = collect_chunked(0, 50, 20, |offset, _limit| {
            *seen.lock().unwrap() += 1;
            async move {
                Ok(SearchPage {
                    items: accounts(offset..offset + 7),
                    total: None,
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(page.items.len(), 7);
        assert_eq!(page.total, None);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn collect_chunked_propagates_errors() {
        let result = collect_chunked(0, 10, 5, |_, _| async { Err(AdapterError::Timeout) }).await;
        assert!(matches!(result, Err(AdapterError::Timeout)));
    }
}
