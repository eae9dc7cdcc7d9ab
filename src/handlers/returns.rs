use axum::{extract::State, response::Json};

use crate::{
    errors::ServiceError,
    services::returns::{ReturnRequest, ReturnedLineItem},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/returns",
    summary = "Process returns",
    description = "Processes a batch of return requests sequentially, fail-fast. Each entry re-prices the affected line with its original campaign and credits stock back.",
    request_body = Vec<ReturnRequest>,
    responses(
        (status = 200, description = "Returns processed", body = ApiResponse<Vec<ReturnedLineItem>>),
        (status = 400, description = "Return window expired or quantity invalid", body = crate::errors::ErrorResponse),
        (status = 404, description = "Sale or sale item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Returns"
)]
pub async fn process_returns(
    State(state): State<AppState>,
    Json(payload): Json<Vec<ReturnRequest>>,
) -> ApiResult<Vec<ReturnedLineItem>> {
    if payload.is_empty() {
        return Err(ServiceError::InvalidInput(
            "at least one return entry is required".to_string(),
        ));
    }

    // Sequential, fail-fast: entries already processed stand even if a later
    // entry fails.
    let mut updated = Vec::with_capacity(payload.len());
    for request in payload {
        updated.push(state.services.returns.process_return(request).await?);
    }

    Ok(Json(ApiResponse::success(updated)))
}
