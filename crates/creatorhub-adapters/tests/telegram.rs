//! Integration tests for `TelegramAdapter` using wiremock HTTP mocks.

use creatorhub_adapters::{AdapterError, PlatformAdapter, TelegramAdapter};
use creatorhub_core::{ErrorKind, Platform};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_adapter(base_url: &str) -> TelegramAdapter {
    TelegramAdapter::with_base_url("test-token", 5, "creatorhub-test/0.1", base_url)
        .expect("adapter construction should not fail")
}

fn channel(id: i64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "link": format!("t.me/channel{id}"),
        "username": format!("@channel{id}"),
        "title": title,
        "about": "daily tech digest",
        "image640": format!("https://static.tgstat.ru/{id}.jpg"),
        "participants_count": 5000 + id
    })
}

#[tokio::test]
async fn search_returns_normalized_channels_and_total() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/search"))
        .and(query_param("token", "test-token"))
        .and(query_param("q", "tech"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "response": {
                "count": 57,
                "items": [channel(1, "Tech Daily"), channel(2, "Tech Weekly")]
            }
        })))
        .mount(&server)
        .await;

    let page = test_adapter(&server.uri())
        .search("tech", 1, 20)
        .await
        .expect("search should succeed");

    assert_eq!(page.total, Some(57));
    assert_eq!(page.items.len(), 2);
    let first = &page.items[0];
    assert_eq!(first.platform, Platform::Telegram);
    assert_eq!(first.platform_account_id, "1");
    assert_eq!(first.name.as_deref(), Some("Tech Daily"));
    assert_eq!(first.profile_url.as_deref(), Some("https://t.me/channel1"));
    assert_eq!(first.follower_count, 5001);
}

#[tokio::test]
async fn search_with_no_results_is_empty_not_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "response": { "count": 0, "items": [] }
        })))
        .mount(&server)
        .await;

    let page = test_adapter(&server.uri())
        .search("zzzz", 1, 20)
        .await
        .expect("empty result should not be an error");
    assert!(page.items.is_empty());
    assert_eq!(page.total, Some(0));
}

#[tokio::test]
async fn envelope_token_error_is_auth_expired() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "error": "token_invalid"
        })))
        .mount(&server)
        .await;

    let err = test_adapter(&server.uri())
        .search("tech", 1, 20)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthExpired);
}

#[tokio::test]
async fn http_429_is_rate_limited_with_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let err = test_adapter(&server.uri())
        .search("tech", 1, 20)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            AdapterError::RateLimited {
                retry_after_secs: Some(30)
            }
        ),
        "expected RateLimited(30), got: {err:?}"
    );
}

#[tokio::test]
async fn invalid_json_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = test_adapter(&server.uri())
        .search("tech", 1, 20)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn get_channel_returns_none_when_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/get"))
        .and(query_param("channelId", "404"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "error": "channel_not_found"
        })))
        .mount(&server)
        .await;

    let account = test_adapter(&server.uri())
        .get_account_by_platform_id("404")
        .await
        .expect("missing channel is not an error");
    assert!(account.is_none());
}

#[tokio::test]
async fn get_channel_returns_account() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channels/get"))
        .and(query_param("channelId", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "response": channel(7, "Seven")
        })))
        .mount(&server)
        .await;

    let account = test_adapter(&server.uri())
        .get_account_by_platform_id("7")
        .await
        .expect("lookup should succeed")
        .expect("channel exists");
    assert_eq!(account.name.as_deref(), Some("Seven"));
}
