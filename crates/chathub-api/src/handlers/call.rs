//! Call-control handlers. Each pairs a state change with a real-time
//! notification to the other party.

use axum::body::Bytes;
use axum::extract::State;
use validator::Validate;

use chathub_core::error::AppError;
use chathub_core::types::CallId;
use chathub_entity::call::CallDetails;

use crate::dto::request::{EndCallRequest, InitiateCallRequest};
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, AuthUser};
use crate::state::AppState;

/// POST /api/calls/initiate
pub async fn initiate(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<InitiateCallRequest>,
) -> ApiResult<ApiResponse<CallDetails>> {
    let call = state
        .call_service
        .initiate(auth.user_id(), req.receiver_id, req.call_type)
        .await?;
    Ok(ApiResponse::created(call))
}

/// POST /api/calls/{id}/answer
pub async fn answer(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<CallId>,
) -> ApiResult<ApiResponse<CallDetails>> {
    let call = state.call_service.answer(auth.user_id(), id).await?;
    Ok(ApiResponse::ok(call))
}

/// POST /api/calls/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<CallId>,
) -> ApiResult<ApiResponse<CallDetails>> {
    let call = state.call_service.reject(auth.user_id(), id).await?;
    Ok(ApiResponse::ok(call))
}

/// POST /api/calls/{id}/end
///
/// The body is optional; an empty body ends the call with zero duration.
pub async fn end(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<CallId>,
    body: Bytes,
) -> ApiResult<ApiResponse<CallDetails>> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        EndCallRequest::default()
    } else {
        serde_json::from_slice::<EndCallRequest>(&body)
            .map_err(|e| AppError::validation(format!("Invalid request body: {e}")))?
    };
    req.validate()?;

    let call = state
        .call_service
        .end(auth.user_id(), id, req.duration)
        .await?;
    Ok(ApiResponse::ok(call))
}

/// GET /api/calls/history
pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<ApiResponse<Vec<CallDetails>>> {
    let calls = state.call_service.history(auth.user_id()).await?;
    Ok(ApiResponse::ok(calls))
}

/// DELETE /api/calls/{id}
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<CallId>,
) -> ApiResult<ApiResponse<MessageResponse>> {
    state.call_service.delete(auth.user_id(), id).await?;
    Ok(ApiResponse::ok(MessageResponse::new(
        "Call log deleted successfully",
    )))
}
