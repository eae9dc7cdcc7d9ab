use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    clients::inventory::{spawn_commit, ConsumedLine, InventoryApi},
    db::DbPool,
    entities::campaign,
    entities::sale::{self, Entity as SaleEntity, SalePaymentType},
    entities::sale_item::{self, Entity as SaleItemEntity, PaymentType},
    errors::ServiceError,
    events::{Event, EventSender},
    services::discount::apply_discount,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    /// Money tendered by the customer; required when any line is paid cash
    pub money: Option<Decimal>,
    /// Accepted for wire compatibility; the service derives change itself
    #[serde(default)]
    pub change: Option<Decimal>,
    /// Sale-level payment type; may instead be carried per line
    pub payment_type: Option<PaymentType>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub items: Vec<CreateSaleItem>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleItem {
    #[validate(length(min = 1, message = "Product id is required"))]
    pub product_id: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub campaign_id: Option<Uuid>,
    pub payment_type: Option<PaymentType>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemResponse {
    pub id: Uuid,
    pub product_id: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub campaign_id: Option<Uuid>,
    pub payment_type: Option<PaymentType>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub id: Uuid,
    pub sales_number: String,
    pub sales_date: DateTime<Utc>,
    pub created_by: String,
    pub payment_type: SalePaymentType,
    pub total_price: Decimal,
    pub money: Decimal,
    pub change: Decimal,
    pub items: Vec<SaleItemResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleSummary {
    pub id: Uuid,
    pub sales_number: String,
    pub sales_date: DateTime<Utc>,
    pub created_by: String,
    pub payment_type: SalePaymentType,
    pub total_price: Decimal,
}

impl From<sale::Model> for SaleSummary {
    fn from(model: sale::Model) -> Self {
        Self {
            id: model.id,
            sales_number: model.sales_number,
            sales_date: model.sales_date,
            created_by: model.created_by,
            payment_type: model.payment_type,
            total_price: model.total_price,
        }
    }
}

/// Outcome of payment validation: the derived summary type, totals and
/// change. The caller-supplied change is never trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentBreakdown {
    pub payment_type: SalePaymentType,
    pub total_price: Decimal,
    pub money: Decimal,
    pub change: Decimal,
}

/// Validates payment coverage for a priced cart.
///
/// Every line must resolve a payment type, either its own tag or the
/// sale-level one. The cash portion must be covered by the tendered money;
/// card portions are informational and settle out of band.
pub fn validate_payment(
    sale_payment: Option<PaymentType>,
    lines: &[(Option<PaymentType>, Decimal)],
    money: Option<Decimal>,
) -> Result<PaymentBreakdown, ServiceError> {
    let mut total = Decimal::ZERO;
    let mut cash_portion = Decimal::ZERO;
    let mut seen: Option<PaymentType> = None;
    let mut mixed = false;

    for (line_payment, line_total) in lines {
        let effective = line_payment.or(sale_payment).ok_or_else(|| {
            ServiceError::ValidationError("payment type not entered".to_string())
        })?;

        total += *line_total;
        if effective == PaymentType::Cash {
            cash_portion += *line_total;
        }
        match seen {
            None => seen = Some(effective),
            Some(previous) if previous != effective => mixed = true,
            Some(_) => {}
        }
    }

    let change = if cash_portion > Decimal::ZERO {
        let money = money.filter(|m| *m > Decimal::ZERO).ok_or_else(|| {
            ServiceError::InvalidInput("no money entered for cash payment".to_string())
        })?;
        if money < cash_portion {
            return Err(ServiceError::InsufficientBalance(format!(
                "tendered {} does not cover cash total {}",
                money, cash_portion
            )));
        }
        money - cash_portion
    } else {
        Decimal::ZERO
    };

    let payment_type = if mixed {
        SalePaymentType::Mixed
    } else {
        match seen {
            Some(PaymentType::Cash) => SalePaymentType::Cash,
            Some(PaymentType::Card) => SalePaymentType::Card,
            None => return Err(ServiceError::ValidationError("payment type not entered".to_string())),
        }
    };

    Ok(PaymentBreakdown {
        payment_type,
        total_price: total,
        money: money.unwrap_or(Decimal::ZERO),
        change,
    })
}

const SALES_NUMBER_LEN: usize = 8;

/// Generates an opaque receipt number like `S-7K2F9QXA`.
pub fn generate_sales_number() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SALES_NUMBER_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("S-{}", suffix)
}

#[derive(Debug)]
struct PricedItem {
    product_id: String,
    name: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    campaign_id: Option<Uuid>,
    payment_type: Option<PaymentType>,
}

/// Orchestrates sale capture: pricing against the inventory service,
/// campaign application, payment validation and atomic persistence, followed
/// by the best-effort inventory consumption report.
#[derive(Clone)]
pub struct SaleService {
    db_pool: Arc<DbPool>,
    inventory: Arc<dyn InventoryApi>,
    event_sender: EventSender,
}

impl SaleService {
    pub fn new(
        db_pool: Arc<DbPool>,
        inventory: Arc<dyn InventoryApi>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db_pool,
            inventory,
            event_sender,
        }
    }

    /// Creates a sale. Any failure aborts the whole operation; nothing is
    /// persisted until every line has been priced and payment validated.
    #[instrument(skip(self, request), fields(item_count = request.items.len()))]
    pub async fn create_sale(
        &self,
        request: CreateSaleRequest,
        created_by: String,
    ) -> Result<SaleResponse, ServiceError> {
        request.validate()?;
        for item in &request.items {
            item.validate()?;
        }

        let priced = self.price_items(&request.items).await?;

        let lines: Vec<(Option<PaymentType>, Decimal)> = priced
            .iter()
            .map(|item| (item.payment_type, item.total_price))
            .collect();
        let breakdown = validate_payment(request.payment_type, &lines, request.money)?;

        let db = &*self.db_pool;
        let sale_id = Uuid::new_v4();
        let sales_number = self.reserve_sales_number().await?;
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for sale creation");
            ServiceError::DatabaseError(e)
        })?;

        let sale_model = sale::ActiveModel {
            id: Set(sale_id),
            sales_number: Set(sales_number.clone()),
            sales_date: Set(now),
            created_by: Set(request.created_by.unwrap_or(created_by)),
            payment_type: Set(breakdown.payment_type),
            total_price: Set(breakdown.total_price),
            money: Set(breakdown.money),
            change: Set(breakdown.change),
            is_deleted: Set(false),
            ..Default::default()
        };
        let sale_row = sale_model.insert(&txn).await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "Failed to insert sale");
            ServiceError::DatabaseError(e)
        })?;

        let mut item_rows = Vec::with_capacity(priced.len());
        for item in &priced {
            let item_model = sale_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(sale_id),
                product_id: Set(item.product_id.clone()),
                name: Set(item.name.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total_price: Set(item.total_price),
                campaign_id: Set(item.campaign_id),
                payment_type: Set(item.payment_type),
                ..Default::default()
            };
            let row = item_model.insert(&txn).await.map_err(|e| {
                error!(error = %e, sale_id = %sale_id, product_id = %item.product_id, "Failed to insert sale item");
                ServiceError::DatabaseError(e)
            })?;
            item_rows.push(row);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "Failed to commit sale transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(sale_id = %sale_id, sales_number = %sales_number, total = %breakdown.total_price, "Sale persisted");

        // The sale is committed; stock consumption is reported best-effort
        // and a failure leaves a reconciliation trail instead of rolling back.
        let consumed: Vec<ConsumedLine> = priced
            .iter()
            .map(|item| ConsumedLine {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            })
            .collect();
        spawn_commit(self.inventory.clone(), self.event_sender.clone(), consumed);

        if let Err(e) = self
            .event_sender
            .send(Event::SaleCompleted {
                sale_id,
                sales_number: sales_number.clone(),
                total_price: breakdown.total_price,
            })
            .await
        {
            warn!(error = %e, sale_id = %sale_id, "Failed to send sale completed event");
        }

        Ok(Self::to_response(sale_row, item_rows))
    }

    /// Resolves each requested line against inventory and prices it. Lines
    /// are processed in submitted order and the first failure aborts.
    async fn price_items(
        &self,
        items: &[CreateSaleItem],
    ) -> Result<Vec<PricedItem>, ServiceError> {
        let mut priced = Vec::with_capacity(items.len());
        for item in items {
            let stock = self.inventory.check(&item.product_id, item.quantity).await?;
            if !stock.state {
                return Err(ServiceError::InvalidOperation(format!(
                    "product {} is disabled",
                    item.product_id
                )));
            }
            if !stock.in_stock {
                return Err(ServiceError::InsufficientStock(format!(
                    "product {} is out of stock",
                    item.product_id
                )));
            }

            let campaign = match item.campaign_id {
                Some(campaign_id) => Some(self.load_applicable_campaign(campaign_id).await?),
                None => None,
            };

            let total_price =
                apply_discount(item.quantity, stock.unit_price, campaign.as_ref())?.round_dp(2);

            priced.push(PricedItem {
                product_id: item.product_id.clone(),
                name: stock.name,
                quantity: item.quantity,
                unit_price: stock.unit_price,
                total_price,
                campaign_id: item.campaign_id,
                payment_type: item.payment_type,
            });
        }
        Ok(priced)
    }

    /// Loads a campaign for a new application. Deactivated or soft-deleted
    /// campaigns cannot be applied to new sales.
    async fn load_applicable_campaign(
        &self,
        campaign_id: Uuid,
    ) -> Result<campaign::Model, ServiceError> {
        let db = &*self.db_pool;
        let campaign = campaign::Entity::find_active()
            .filter(campaign::Column::Id.eq(campaign_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("campaign {} not found", campaign_id)))?;

        if !campaign.active {
            return Err(ServiceError::InvalidOperation(format!(
                "campaign {} is not active",
                campaign.name
            )));
        }

        Ok(campaign)
    }

    /// Picks a sales number not yet in use. The space is large enough that a
    /// collision is overwhelmingly unlikely; the loop guards the residual
    /// race between check and insert being lost.
    async fn reserve_sales_number(&self) -> Result<String, ServiceError> {
        let db = &*self.db_pool;
        for _ in 0..5 {
            let candidate = generate_sales_number();
            let taken = SaleEntity::find()
                .filter(sale::Column::SalesNumber.eq(candidate.clone()))
                .one(db)
                .await?
                .is_some();
            if !taken {
                return Ok(candidate);
            }
        }
        Err(ServiceError::InternalError(
            "unable to allocate a unique sales number".to_string(),
        ))
    }

    #[instrument(skip(self))]
    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleResponse, ServiceError> {
        let db = &*self.db_pool;
        let sale = SaleEntity::find_active()
            .filter(sale::Column::Id.eq(sale_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("sale {} not found", sale_id)))?;

        let items = self.load_items(sale.id).await?;
        Ok(Self::to_response(sale, items))
    }

    #[instrument(skip(self))]
    pub async fn get_sale_by_number(&self, sales_number: &str) -> Result<SaleResponse, ServiceError> {
        let db = &*self.db_pool;
        let sale = SaleEntity::find_active()
            .filter(sale::Column::SalesNumber.eq(sales_number))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("sale {} not found", sales_number))
            })?;

        let items = self.load_items(sale.id).await?;
        Ok(Self::to_response(sale, items))
    }

    #[instrument(skip(self))]
    pub async fn list_sales(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<SaleSummary>, u64), ServiceError> {
        let db = &*self.db_pool;

        let paginator = SaleEntity::find_active()
            .order_by_desc(sale::Column::SalesDate)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let sales = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((sales.into_iter().map(SaleSummary::from).collect(), total))
    }

    /// Soft delete; line items stay for audit and returns are no longer
    /// possible against the sale.
    #[instrument(skip(self))]
    pub async fn delete_sale(&self, sale_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let sale = SaleEntity::find_active()
            .filter(sale::Column::Id.eq(sale_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("sale {} not found", sale_id)))?;

        let mut active_model: sale::ActiveModel = sale.into();
        active_model.is_deleted = Set(true);
        active_model.updated_at = Set(Some(Utc::now()));
        active_model.update(db).await?;

        info!(sale_id = %sale_id, "Sale soft-deleted");

        if let Err(e) = self.event_sender.send(Event::SaleDeleted(sale_id)).await {
            warn!(error = %e, sale_id = %sale_id, "Failed to send sale deleted event");
        }

        Ok(())
    }

    async fn load_items(&self, sale_id: Uuid) -> Result<Vec<sale_item::Model>, ServiceError> {
        let db = &*self.db_pool;
        SaleItemEntity::find()
            .filter(sale_item::Column::SaleId.eq(sale_id))
            .order_by_asc(sale_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    fn to_response(sale: sale::Model, items: Vec<sale_item::Model>) -> SaleResponse {
        SaleResponse {
            id: sale.id,
            sales_number: sale.sales_number,
            sales_date: sale.sales_date,
            created_by: sale.created_by,
            payment_type: sale.payment_type,
            total_price: sale.total_price,
            money: sale.money,
            change: sale.change,
            items: items
                .into_iter()
                .map(|item| SaleItemResponse {
                    id: item.id,
                    product_id: item.product_id,
                    name: item.name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                    campaign_id: item.campaign_id,
                    payment_type: item.payment_type,
                })
                .collect(),
        }
    }
}
