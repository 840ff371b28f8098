use axum::{
    extract::{Query, State},
    Extension, Json,
};
use creatorhub_core::Platform;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_search_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct InvalidateParams {
    pub platform: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct InvalidateData {
    platform: Option<Platform>,
    removed: usize,
}

/// Drops cached search pages covering `platform`, or all pages when omitted.
pub(super) async fn invalidate_cache(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<InvalidateParams>,
) -> Result<Json<ApiResponse<InvalidateData>>, ApiError> {
    let platform = match params.platform.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<Platform>().map_err(|e| {
            ApiError::new(req_id.0.clone(), "bad_request", e.to_string())
        })?),
    };

    let removed = state
        .aggregator
        .invalidate(platform)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::ok(
        req_id.0,
        InvalidateData { platform, removed },
    )))
}
