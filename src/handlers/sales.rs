use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::Principal,
    handlers::common::{PaginatedResponse, PaginationParams},
    services::sales::{CreateSaleRequest, SaleResponse, SaleSummary},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/sales",
    summary = "Create sale",
    description = "Prices a cart against the inventory service, applies campaign discounts, validates payment and persists the sale",
    request_body = CreateSaleRequest,
    responses(
        (status = 200, description = "Sale created", body = ApiResponse<SaleResponse>),
        (status = 400, description = "Business rule violation", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product or campaign not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Inventory fetch failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateSaleRequest>,
) -> ApiResult<SaleResponse> {
    let sale = state
        .services
        .sales
        .create_sale(payload, principal.subject)
        .await?;
    Ok(Json(ApiResponse::success(sale)))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales",
    summary = "List sales",
    params(PaginationParams),
    responses(
        (status = 200, description = "Sales listed", body = ApiResponse<PaginatedResponse<SaleSummary>>)
    ),
    tag = "Sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<SaleSummary>> {
    let page = pagination.page();
    let per_page = pagination.per_page();

    let (sales, total) = state.services.sales.list_sales(page, per_page).await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        sales, page, per_page, total,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    summary = "Get sale",
    description = "Accepts either the sale id or the public sales number (e.g. S-7K2F9QXA)",
    params(("id" = String, Path, description = "Sale id or sales number")),
    responses(
        (status = 200, description = "Sale retrieved", body = ApiResponse<SaleResponse>),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SaleResponse> {
    let sale = match Uuid::parse_str(&id) {
        Ok(sale_id) => state.services.sales.get_sale(sale_id).await?,
        Err(_) => state.services.sales.get_sale_by_number(&id).await?,
    };
    Ok(Json(ApiResponse::success(sale)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sales/{id}",
    summary = "Delete sale",
    description = "Soft-deletes a sale; line items are retained for audit",
    params(("id" = Uuid, Path, description = "Sale id")),
    responses(
        (status = 200, description = "Sale deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Sales"
)]
pub async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.sales.delete_sale(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": id,
        "deleted": true
    }))))
}
