use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use creatorhub_core::{
    parse_platform_list, AccountResult, AggregatedResult, Platform, PlatformStat, SearchQuery,
    DEFAULT_PAGE_SIZE,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_search_error, ApiError, ApiResponse, AppState, PageMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    pub keyword: Option<String>,
    /// Comma-separated platform keys; absent or empty means all platforms.
    pub platforms: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchData {
    items: Vec<AccountResult>,
    platform_stats: BTreeMap<Platform, PlatformStat>,
    fetched_at: DateTime<Utc>,
    cached: bool,
    cache_age_ms: i64,
}

pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

    let raw_platforms = params.platforms.as_deref().unwrap_or("");
    let (platforms, unknown) = parse_platform_list(raw_platforms);
    if !unknown.is_empty() {
        tracing::warn!(unknown = ?unknown, "ignoring unknown platform keys");
    }

    let query = SearchQuery::new(
        params.keyword.unwrap_or_default(),
        platforms,
        page,
        page_size,
    );

    // Every requested key was unknown; an empty list would otherwise mean "all".
    if query.platforms.is_empty() && !unknown.is_empty() {
        let empty = AggregatedResult {
            items: Vec::new(),
            total: 0,
            page: query.page,
            page_size: query.page_size,
            platform_stats: BTreeMap::new(),
            fetched_at: Utc::now(),
        };
        return Ok(Json(respond(req_id.0, &empty, false, 0)));
    }

    let outcome = state
        .aggregator
        .search(query)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(respond(
        req_id.0,
        &outcome.result,
        outcome.cached,
        outcome.cache_age_ms(),
    )))
}

fn respond(
    request_id: String,
    result: &AggregatedResult,
    cached: bool,
    cache_age_ms: i64,
) -> ApiResponse<SearchData> {
    let page = PageMeta {
        total: result.total,
        page: result.page,
        page_size: result.page_size,
        total_pages: result.total_pages(),
    };
    ApiResponse::paged(
        request_id,
        SearchData {
            items: result.items.clone(),
            platform_stats: result.platform_stats.clone(),
            fetched_at: result.fetched_at,
            cached,
            cache_age_ms,
        },
        page,
    )
}
