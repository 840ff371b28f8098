mod accounts;
mod admin;
mod platforms;
mod search;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use creatorhub_core::{ErrorKind, Platform};
use creatorhub_search::{Aggregator, SearchError};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, require_bearer_auth, AuthState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

/// Success envelope. List endpoints flatten [`PageMeta`] next to `data`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: &'static str,
    pub message: String,
    pub data: T,
    #[serde(flatten)]
    pub page: Option<PageMeta>,
    #[serde(flatten)]
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(flatten)]
    pub meta: ResponseMeta,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn ok(request_id: String, data: T) -> Self {
        Self {
            code: "ok",
            message: "success".to_string(),
            data,
            page: None,
            meta: ResponseMeta::new(request_id),
        }
    }

    pub(super) fn paged(request_id: String, data: T, page: PageMeta) -> Self {
        Self {
            page: Some(page),
            ..Self::ok(request_id, data)
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "upstream_timeout" => StatusCode::GATEWAY_TIMEOUT,
            "degraded" | "cache_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn join_platforms(platforms: &[Platform]) -> String {
    platforms
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

pub(super) fn map_search_error(request_id: String, error: &SearchError) -> ApiError {
    match error {
        SearchError::UnknownPlatformRequested(platform) => ApiError::new(
            request_id,
            "not_found",
            format!("no adapter registered for platform \"{platform}\""),
        ),
        SearchError::CacheUnavailable(e) => {
            tracing::warn!(error = %e, "result cache unavailable");
            ApiError::new(request_id, "cache_unavailable", e.to_string())
        }
        SearchError::Degraded { platforms } => {
            tracing::error!(platforms = %join_platforms(platforms), "search degraded: every platform failed");
            ApiError::new(
                request_id,
                "degraded",
                format!(
                    "all platforms failed and no cached result is available: {}",
                    join_platforms(platforms)
                ),
            )
        }
        SearchError::Adapter { platform, source } => {
            tracing::warn!(platform = %platform, error = %source, "adapter lookup failed");
            let code = match source.kind() {
                ErrorKind::Timeout => "upstream_timeout",
                ErrorKind::RateLimited => "rate_limited",
                ErrorKind::AuthExpired | ErrorKind::Unavailable | ErrorKind::Malformed => {
                    "upstream_error"
                }
            };
            ApiError::new(
                request_id,
                code,
                format!("{platform} request failed: {}", source.kind()),
            )
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn admin_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/admin/cache/invalidate",
            post(admin::invalidate_cache),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

pub fn build_app(state: AppState, auth: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/search", get(search::search))
        .route("/api/v1/platforms", get(platforms::list_platforms))
        .route(
            "/api/v1/platforms/{platform}/accounts/{platform_account_id}",
            get(accounts::get_platform_account),
        )
        .route("/api/v1/accounts/{account_id}", get(accounts::get_account));

    Router::new()
        .merge(public_routes)
        .merge(admin_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    adapters: usize,
    unhealthy: Vec<Platform>,
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let platforms = state.aggregator.registry().list_supported_platforms().await;
    let unhealthy: Vec<Platform> = platforms
        .iter()
        .filter(|p| !p.healthy)
        .map(|p| p.platform)
        .collect();

    let (status_code, status) = if platforms.is_empty() || unhealthy.len() == platforms.len() {
        tracing::warn!(adapters = platforms.len(), "health check: no healthy adapters");
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    } else if unhealthy.is_empty() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::OK, "degraded")
    };

    (
        status_code,
        Json(ApiResponse::ok(
            req_id.0,
            HealthData {
                status,
                adapters: platforms.len(),
                unhealthy,
            },
        )),
    )
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
