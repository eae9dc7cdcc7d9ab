use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    clients::inventory::{spawn_credit, InventoryApi},
    db::DbPool,
    entities::campaign::{self, Entity as CampaignEntity},
    entities::sale::{self, Entity as SaleEntity},
    entities::sale_item::{self, Entity as SaleItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::discount::apply_discount,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[validate(length(min = 1, message = "Sales number is required"))]
    pub sales_number: String,
    #[validate(length(min = 1, message = "Product id is required"))]
    pub product_id: String,
    #[validate(range(min = 1, message = "Return quantity must be at least 1"))]
    pub quantity: i32,
    /// Defaults to now when omitted
    #[serde(default)]
    pub return_date: Option<DateTime<Utc>>,
}

/// The updated line after a return was processed.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnedLineItem {
    pub sales_number: String,
    pub product_id: String,
    pub name: String,
    pub returned_quantity: i32,
    pub remaining_quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub campaign_id: Option<Uuid>,
}

/// Whether `return_date` falls inside the return window measured from
/// `sale_date`. The boundary is inclusive: a return exactly `window_days`
/// after the sale is accepted.
pub fn within_return_window(
    sale_date: DateTime<Utc>,
    return_date: DateTime<Utc>,
    window_days: i64,
) -> bool {
    return_date - sale_date <= Duration::days(window_days)
}

/// Processes returns: validates the window and quantity, re-prices the line
/// with its original campaign, and credits stock back best-effort.
#[derive(Clone)]
pub struct ReturnService {
    db_pool: Arc<DbPool>,
    inventory: Arc<dyn InventoryApi>,
    event_sender: EventSender,
    return_window_days: i64,
}

impl ReturnService {
    pub fn new(
        db_pool: Arc<DbPool>,
        inventory: Arc<dyn InventoryApi>,
        event_sender: EventSender,
        return_window_days: i64,
    ) -> Self {
        Self {
            db_pool,
            inventory,
            event_sender,
            return_window_days,
        }
    }

    #[instrument(skip(self, request), fields(sales_number = %request.sales_number, product_id = %request.product_id))]
    pub async fn process_return(
        &self,
        request: ReturnRequest,
    ) -> Result<ReturnedLineItem, ServiceError> {
        request.validate()?;
        let return_date = request.return_date.unwrap_or_else(Utc::now);

        let db = &*self.db_pool;

        let sale = SaleEntity::find_active()
            .filter(sale::Column::SalesNumber.eq(request.sales_number.clone()))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("sale {} not found", request.sales_number))
            })?;

        let item = SaleItemEntity::find()
            .filter(sale_item::Column::SaleId.eq(sale.id))
            .filter(sale_item::Column::ProductId.eq(request.product_id.clone()))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "sale item {} not found on sale {}",
                    request.product_id, request.sales_number
                ))
            })?;

        if !within_return_window(sale.sales_date, return_date, self.return_window_days) {
            return Err(ServiceError::ReturnWindowExpired(format!(
                "sale {} is older than {} days",
                request.sales_number, self.return_window_days
            )));
        }

        if request.quantity > item.quantity {
            return Err(ServiceError::InvalidInput(format!(
                "return quantity {} exceeds purchased quantity {}",
                request.quantity, item.quantity
            )));
        }

        let remaining_quantity = item.quantity - request.quantity;

        // Historical pricing: the refund must mirror what was charged, so the
        // originally applied campaign is used even if it has since been
        // deactivated or soft-deleted.
        let campaign = match item.campaign_id {
            Some(campaign_id) => Some(self.load_historical_campaign(campaign_id).await?),
            None => None,
        };

        let new_total = if remaining_quantity == 0 {
            Decimal::ZERO
        } else {
            apply_discount(remaining_quantity, item.unit_price, campaign.as_ref())?.round_dp(2)
        };

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for return");
            ServiceError::DatabaseError(e)
        })?;

        let item_id = item.id;
        let item_name = item.name.clone();
        let item_unit_price = item.unit_price;
        let item_campaign_id = item.campaign_id;
        let previous_total = item.total_price;

        let mut item_model: sale_item::ActiveModel = item.into();
        item_model.quantity = Set(remaining_quantity);
        item_model.total_price = Set(new_total);
        item_model.updated_at = Set(Some(Utc::now()));
        item_model.update(&txn).await.map_err(|e| {
            error!(error = %e, item_id = %item_id, "Failed to update returned line");
            ServiceError::DatabaseError(e)
        })?;

        // Keep the sale total equal to the sum of its line totals. Money and
        // change stay as captured at the register; the refund itself is paid
        // out of band.
        let sale_id = sale.id;
        let sales_number = sale.sales_number.clone();
        let new_sale_total = sale.total_price - previous_total + new_total;
        let mut sale_model: sale::ActiveModel = sale.into();
        sale_model.total_price = Set(new_sale_total);
        sale_model.updated_at = Set(Some(Utc::now()));
        sale_model.update(&txn).await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "Failed to update sale total after return");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "Failed to commit return transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            sales_number = %sales_number,
            product_id = %request.product_id,
            returned = request.quantity,
            remaining = remaining_quantity,
            "Return processed"
        );

        spawn_credit(
            self.inventory.clone(),
            self.event_sender.clone(),
            request.product_id.clone(),
            request.quantity,
        );

        if let Err(e) = self
            .event_sender
            .send(Event::SaleReturned {
                sale_id,
                sales_number: sales_number.clone(),
                product_id: request.product_id.clone(),
                returned_quantity: request.quantity,
            })
            .await
        {
            warn!(error = %e, sale_id = %sale_id, "Failed to send sale returned event");
        }

        Ok(ReturnedLineItem {
            sales_number,
            product_id: request.product_id,
            name: item_name,
            returned_quantity: request.quantity,
            remaining_quantity,
            unit_price: item_unit_price,
            total_price: new_total,
            campaign_id: item_campaign_id,
        })
    }

    /// Loads a campaign for re-pricing a historical line. Soft-deleted rows
    /// are included on purpose; a missing row means referential corruption.
    async fn load_historical_campaign(
        &self,
        campaign_id: Uuid,
    ) -> Result<campaign::Model, ServiceError> {
        let db = &*self.db_pool;
        CampaignEntity::find_by_id(campaign_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "campaign {} referenced by a sale line no longer exists",
                    campaign_id
                ))
            })
    }
}
