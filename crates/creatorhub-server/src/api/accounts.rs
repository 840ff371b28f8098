use axum::{
    extract::{Path, State},
    Extension, Json,
};
use creatorhub_core::{AccountId, AccountResult, Platform};

use crate::middleware::RequestId;

use super::{map_search_error, ApiError, ApiResponse, AppState};

/// `GET /api/v1/platforms/{platform}/accounts/{platform_account_id}`
pub(super) async fn get_platform_account(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((platform, platform_account_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<AccountResult>>, ApiError> {
    let platform: Platform = platform
        .parse()
        .map_err(|e: creatorhub_core::CoreError| {
            ApiError::new(req_id.0.clone(), "not_found", e.to_string())
        })?;

    lookup(
        &state,
        req_id,
        AccountId {
            platform,
            platform_account_id,
        },
    )
    .await
}

/// `GET /api/v1/accounts/{account_id}` where the id is `platform:platform_account_id`.
pub(super) async fn get_account(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(account_id): Path<String>,
) -> Result<Json<ApiResponse<AccountResult>>, ApiError> {
    let account_id: AccountId = account_id
        .parse()
        .map_err(|e: creatorhub_core::CoreError| {
            ApiError::new(req_id.0.clone(), "bad_request", e.to_string())
        })?;

    lookup(&state, req_id, account_id).await
}

async fn lookup(
    state: &AppState,
    req_id: RequestId,
    account_id: AccountId,
) -> Result<Json<ApiResponse<AccountResult>>, ApiError> {
    let account = state
        .aggregator
        .registry()
        .lookup_account(account_id.platform, &account_id.platform_account_id)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    match account {
        Some(account) => Ok(Json(ApiResponse::ok(req_id.0, account))),
        None => Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("account {account_id} not found"),
        )),
    }
}
