//! Integration tests for `BlueskyAdapter` using wiremock HTTP mocks.

use creatorhub_adapters::{BlueskyAdapter, PlatformAdapter};
use creatorhub_core::{ErrorKind, Platform};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_adapter(base_url: &str) -> BlueskyAdapter {
    BlueskyAdapter::with_base_url(5, "creatorhub-test/0.1", base_url).expect("adapter")
}

#[tokio::test]
async fn search_actors_maps_did_and_profile_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.searchActors"))
        .and(query_param("q", "tech"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "actors": [
                {
                    "did": "did:plc:tech1",
                    "handle": "tech.bsky.social",
                    "displayName": "Tech Bsky",
                    "description": "posts about tech",
                    "avatar": "https://cdn.bsky.app/avatar/tech.jpg"
                }
            ],
            "cursor": "20"
        })))
        .mount(&server)
        .await;

    let page = test_adapter(&server.uri())
        .search("tech", 1, 20)
        .await
        .expect("search");
    assert_eq!(page.items.len(), 1);
    let actor = &page.items[0];
    assert_eq!(actor.platform, Platform::Bluesky);
    assert_eq!(actor.platform_account_id, "did:plc:tech1");
    assert_eq!(
        actor.profile_url.as_deref(),
        Some("https://bsky.app/profile/tech.bsky.social")
    );
}

#[tokio::test]
async fn later_pages_send_offset_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.searchActors"))
        .and(query_param("cursor", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "actors": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let page = test_adapter(&server.uri())
        .search("tech", 2, 10)
        .await
        .expect("search");
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn empty_keyword_uses_suggestions() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getSuggestions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "actors": [{ "did": "did:plc:s1", "handle": "s1.bsky.social" }]
        })))
        .mount(&server)
        .await;

    let page = test_adapter(&server.uri())
        .search("", 1, 20)
        .await
        .expect("browse");
    assert_eq!(page.items[0].platform_account_id, "did:plc:s1");
}

#[tokio::test]
async fn get_profile_includes_follower_count() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .and(query_param("actor", "did:plc:abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "did": "did:plc:abc",
            "handle": "abc.bsky.social",
            "displayName": "ABC",
            "followersCount": 4242
        })))
        .mount(&server)
        .await;

    let account = test_adapter(&server.uri())
        .get_account_by_platform_id("did:plc:abc")
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(account.follower_count, 4242);
}

#[tokio::test]
async fn get_profile_not_found_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "InvalidRequest",
            "message": "Profile not found"
        })))
        .mount(&server)
        .await;

    let account = test_adapter(&server.uri())
        .get_account_by_platform_id("did:plc:missing")
        .await
        .expect("not found is not an error");
    assert!(account.is_none());
}

#[tokio::test]
async fn slow_response_beyond_client_timeout_is_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.searchActors"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "actors": [] }))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let adapter = BlueskyAdapter::with_base_url(1, "creatorhub-test/0.1", &server.uri())
        .expect("adapter");
    let err = adapter.search("slow", 1, 10).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}
