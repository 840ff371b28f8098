use axum::{extract::State, Extension, Json};
use creatorhub_core::PlatformInfo;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState};

pub(super) async fn list_platforms(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<PlatformInfo>>> {
    let platforms = state.aggregator.registry().list_supported_platforms().await;
    Json(ApiResponse::ok(req_id.0, platforms))
}
