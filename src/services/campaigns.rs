use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::campaign::{self, CampaignKind, Entity as CampaignEntity},
    errors::{FieldError, ServiceError},
    events::{Event, EventSender},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    #[validate(length(min = 1, max = 100, message = "Campaign name is required"))]
    pub name: String,
    pub category: CampaignKind,
    #[serde(default)]
    pub buy_quantity: Option<i32>,
    #[serde(default)]
    pub pay_quantity: Option<i32>,
    #[serde(default)]
    pub percent: Option<Decimal>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCampaignRequest {
    #[validate(length(min = 1, max = 100, message = "Campaign name cannot be empty"))]
    pub name: Option<String>,
    pub state: Option<bool>,
    pub buy_quantity: Option<i32>,
    pub pay_quantity: Option<i32>,
    pub percent: Option<Decimal>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CampaignFilter {
    pub name: Option<String>,
    pub kind: Option<CampaignKind>,
    pub active: Option<bool>,
    pub created_by: Option<String>,
}

/// The discount key of a campaign, validated as a whole against its kind.
/// Exactly one shape is populated per kind; the invariant is enforced here,
/// at write time, never at apply time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CampaignKey {
    pub buy_quantity: Option<i32>,
    pub pay_quantity: Option<i32>,
    pub percent: Option<Decimal>,
    pub amount: Option<Decimal>,
}

pub fn validate_campaign_key(kind: CampaignKind, key: &CampaignKey) -> Result<(), ServiceError> {
    let mut errors = Vec::new();
    let reject = |errors: &mut Vec<FieldError>, field: &str, value: Option<String>, message: &str| {
        errors.push(FieldError {
            object: "campaign".to_string(),
            field: field.to_string(),
            rejected_value: value,
            message: message.to_string(),
        });
    };

    match kind {
        CampaignKind::BuyXPayY => {
            match (key.buy_quantity, key.pay_quantity) {
                (Some(buy), Some(pay)) => {
                    if pay <= 0 {
                        reject(
                            &mut errors,
                            "payQuantity",
                            Some(pay.to_string()),
                            "pay quantity must be positive",
                        );
                    } else if buy <= pay {
                        reject(
                            &mut errors,
                            "buyQuantity",
                            Some(buy.to_string()),
                            "buy quantity must exceed pay quantity",
                        );
                    }
                }
                _ => reject(
                    &mut errors,
                    "buyQuantity",
                    None,
                    "buy and pay quantities are required for BUY_X_PAY_Y",
                ),
            }
            if key.percent.is_some() {
                reject(
                    &mut errors,
                    "percent",
                    key.percent.map(|p| p.to_string()),
                    "percent is not valid for BUY_X_PAY_Y",
                );
            }
            if key.amount.is_some() {
                reject(
                    &mut errors,
                    "amount",
                    key.amount.map(|a| a.to_string()),
                    "amount is not valid for BUY_X_PAY_Y",
                );
            }
        }
        CampaignKind::Percent => {
            match key.percent {
                Some(p) if p > Decimal::ZERO && p <= Decimal::from(100) => {}
                Some(p) => reject(
                    &mut errors,
                    "percent",
                    Some(p.to_string()),
                    "percent must be greater than 0 and at most 100",
                ),
                None => reject(&mut errors, "percent", None, "percent is required for PERCENT"),
            }
            if key.buy_quantity.is_some() || key.pay_quantity.is_some() {
                reject(
                    &mut errors,
                    "buyQuantity",
                    None,
                    "buy/pay quantities are not valid for PERCENT",
                );
            }
            if key.amount.is_some() {
                reject(
                    &mut errors,
                    "amount",
                    key.amount.map(|a| a.to_string()),
                    "amount is not valid for PERCENT",
                );
            }
        }
        CampaignKind::MoneyDiscount => {
            match key.amount {
                Some(a) if a > Decimal::ZERO => {}
                Some(a) => reject(
                    &mut errors,
                    "amount",
                    Some(a.to_string()),
                    "amount must be greater than 0",
                ),
                None => reject(
                    &mut errors,
                    "amount",
                    None,
                    "amount is required for MONEY_DISCOUNT",
                ),
            }
            if key.buy_quantity.is_some() || key.pay_quantity.is_some() {
                reject(
                    &mut errors,
                    "buyQuantity",
                    None,
                    "buy/pay quantities are not valid for MONEY_DISCOUNT",
                );
            }
            if key.percent.is_some() {
                reject(
                    &mut errors,
                    "percent",
                    key.percent.map(|p| p.to_string()),
                    "percent is not valid for MONEY_DISCOUNT",
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::FieldValidation(errors))
    }
}

/// Service for administering discount campaigns
#[derive(Clone)]
pub struct CampaignService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl CampaignService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_campaign(
        &self,
        request: CreateCampaignRequest,
        created_by: String,
    ) -> Result<campaign::Model, ServiceError> {
        request.validate()?;
        let key = CampaignKey {
            buy_quantity: request.buy_quantity,
            pay_quantity: request.pay_quantity,
            percent: request.percent,
            amount: request.amount,
        };
        validate_campaign_key(request.category, &key)?;

        let db = &*self.db_pool;

        let existing = CampaignEntity::find_active()
            .filter(campaign::Column::Name.eq(request.name.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "campaign {} already exists",
                request.name
            )));
        }

        let campaign_id = Uuid::new_v4();
        let model = campaign::ActiveModel {
            id: Set(campaign_id),
            name: Set(request.name),
            kind: Set(request.category),
            buy_quantity: Set(request.buy_quantity),
            pay_quantity: Set(request.pay_quantity),
            percent: Set(request.percent),
            amount: Set(request.amount),
            active: Set(true),
            created_by: Set(request.created_by.unwrap_or(created_by)),
            is_deleted: Set(false),
            ..Default::default()
        };

        let created = model.insert(db).await?;
        info!(campaign_id = %campaign_id, "Campaign created");

        if let Err(e) = self.event_sender.send(Event::CampaignCreated(campaign_id)).await {
            warn!(error = %e, campaign_id = %campaign_id, "Failed to send campaign created event");
        }

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_campaign(&self, campaign_id: Uuid) -> Result<campaign::Model, ServiceError> {
        let db = &*self.db_pool;
        CampaignEntity::find_active()
            .filter(campaign::Column::Id.eq(campaign_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("campaign {} not found", campaign_id)))
    }

    #[instrument(skip(self, request))]
    pub async fn update_campaign(
        &self,
        campaign_id: Uuid,
        request: UpdateCampaignRequest,
    ) -> Result<campaign::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let existing = self.get_campaign(campaign_id).await?;

        // Category is fixed after creation; the key may be replaced within it.
        let touches_key = request.buy_quantity.is_some()
            || request.pay_quantity.is_some()
            || request.percent.is_some()
            || request.amount.is_some();
        let merged_key = CampaignKey {
            buy_quantity: request.buy_quantity.or(existing.buy_quantity),
            pay_quantity: request.pay_quantity.or(existing.pay_quantity),
            percent: request.percent.or(existing.percent),
            amount: request.amount.or(existing.amount),
        };
        if touches_key {
            validate_campaign_key(existing.kind, &merged_key)?;
        }

        if let Some(new_name) = &request.name {
            if *new_name != existing.name {
                let conflict = CampaignEntity::find_active()
                    .filter(campaign::Column::Name.eq(new_name.clone()))
                    .filter(campaign::Column::Id.ne(campaign_id))
                    .one(db)
                    .await?;
                if conflict.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "campaign {} already exists",
                        new_name
                    )));
                }
            }
        }

        let mut active_model: campaign::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active_model.name = Set(name);
        }
        if let Some(state) = request.state {
            active_model.active = Set(state);
        }
        if touches_key {
            active_model.buy_quantity = Set(merged_key.buy_quantity);
            active_model.pay_quantity = Set(merged_key.pay_quantity);
            active_model.percent = Set(merged_key.percent);
            active_model.amount = Set(merged_key.amount);
        }
        active_model.updated_at = Set(Some(Utc::now()));

        let updated = active_model.update(db).await?;
        info!(campaign_id = %campaign_id, "Campaign updated");

        if let Err(e) = self.event_sender.send(Event::CampaignUpdated(campaign_id)).await {
            warn!(error = %e, campaign_id = %campaign_id, "Failed to send campaign updated event");
        }

        Ok(updated)
    }

    /// Soft delete: the row is kept for audit, and historical sale lines keep
    /// referencing it; only new applications are prevented.
    #[instrument(skip(self))]
    pub async fn delete_campaign(&self, campaign_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = self.get_campaign(campaign_id).await?;

        let mut active_model: campaign::ActiveModel = existing.into();
        active_model.is_deleted = Set(true);
        active_model.active = Set(false);
        active_model.updated_at = Set(Some(Utc::now()));
        active_model.update(db).await?;

        info!(campaign_id = %campaign_id, "Campaign soft-deleted");

        if let Err(e) = self.event_sender.send(Event::CampaignDeleted(campaign_id)).await {
            warn!(error = %e, campaign_id = %campaign_id, "Failed to send campaign deleted event");
        }

        Ok(())
    }

    #[instrument(skip(self, filter))]
    pub async fn list_campaigns(
        &self,
        filter: CampaignFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<campaign::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = CampaignEntity::find_active();
        if let Some(name) = filter.name {
            query = query.filter(campaign::Column::Name.contains(name));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(campaign::Column::Kind.eq(kind));
        }
        if let Some(active) = filter.active {
            query = query.filter(campaign::Column::Active.eq(active));
        }
        if let Some(created_by) = filter.created_by {
            query = query.filter(campaign::Column::CreatedBy.eq(created_by));
        }

        let paginator = query
            .order_by_desc(campaign::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let campaigns = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((campaigns, total))
    }
}
