use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::Principal,
    entities::campaign::{self, CampaignKind},
    handlers::common::{PaginatedResponse, PaginationParams},
    services::campaigns::{CampaignFilter, CreateCampaignRequest, UpdateCampaignRequest},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub category: CampaignKind,
    pub buy_quantity: Option<i32>,
    pub pay_quantity: Option<i32>,
    pub percent: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub state: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<campaign::Model> for CampaignResponse {
    fn from(model: campaign::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            category: model.kind,
            buy_quantity: model.buy_quantity,
            pay_quantity: model.pay_quantity,
            percent: model.percent,
            amount: model.amount,
            state: model.active,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CampaignListQuery {
    /// Substring match on the campaign name
    pub name: Option<String>,
    pub category: Option<CampaignKind>,
    pub state: Option<bool>,
    pub created_by: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/campaigns",
    summary = "Create campaign",
    request_body = CreateCampaignRequest,
    responses(
        (status = 200, description = "Campaign created", body = ApiResponse<CampaignResponse>),
        (status = 400, description = "Invalid campaign key", body = crate::errors::ErrorResponse),
        (status = 409, description = "Campaign name already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "Campaigns"
)]
pub async fn create_campaign(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateCampaignRequest>,
) -> ApiResult<CampaignResponse> {
    let created = state
        .services
        .campaigns
        .create_campaign(payload, principal.subject)
        .await?;
    Ok(Json(ApiResponse::success(created.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/campaigns",
    summary = "List campaigns",
    params(CampaignListQuery, PaginationParams),
    responses(
        (status = 200, description = "Campaigns listed", body = ApiResponse<PaginatedResponse<CampaignResponse>>)
    ),
    tag = "Campaigns"
)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(filter): Query<CampaignListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<CampaignResponse>> {
    let page = pagination.page();
    let per_page = pagination.per_page();

    let (campaigns, total) = state
        .services
        .campaigns
        .list_campaigns(
            CampaignFilter {
                name: filter.name,
                kind: filter.category,
                active: filter.state,
                created_by: filter.created_by,
            },
            page,
            per_page,
        )
        .await?;

    let items = campaigns.into_iter().map(CampaignResponse::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, page, per_page, total,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/campaigns/{id}",
    summary = "Get campaign",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign retrieved", body = ApiResponse<CampaignResponse>),
        (status = 404, description = "Campaign not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Campaigns"
)]
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CampaignResponse> {
    let found = state.services.campaigns.get_campaign(id).await?;
    Ok(Json(ApiResponse::success(found.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/campaigns/{id}",
    summary = "Update campaign",
    description = "Updates name, active state and discount key; the category is fixed after creation",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body = UpdateCampaignRequest,
    responses(
        (status = 200, description = "Campaign updated", body = ApiResponse<CampaignResponse>),
        (status = 400, description = "Invalid campaign key", body = crate::errors::ErrorResponse),
        (status = 404, description = "Campaign not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Campaign name already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "Campaigns"
)]
pub async fn update_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCampaignRequest>,
) -> ApiResult<CampaignResponse> {
    let updated = state.services.campaigns.update_campaign(id, payload).await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/campaigns/{id}",
    summary = "Delete campaign",
    description = "Soft delete; historical sale lines keep their campaign reference",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Campaign not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Campaigns"
)]
pub async fn delete_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.campaigns.delete_campaign(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": id,
        "deleted": true
    }))))
}
