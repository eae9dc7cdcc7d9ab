use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Discount shape of a campaign. Exactly one key-field group is populated per
/// kind; enforced at create/update time, not at apply time.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignKind {
    #[sea_orm(string_value = "BUY_X_PAY_Y")]
    BuyXPayY,
    #[sea_orm(string_value = "PERCENT")]
    Percent,
    #[sea_orm(string_value = "MONEY_DISCOUNT")]
    MoneyDiscount,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub kind: CampaignKind,
    /// BUY_X_PAY_Y: quantity that must be bought
    pub buy_quantity: Option<i32>,
    /// BUY_X_PAY_Y: quantity that is paid for
    pub pay_quantity: Option<i32>,
    /// PERCENT: percentage off, in (0, 100]
    pub percent: Option<Decimal>,
    /// MONEY_DISCOUNT: flat amount off the line subtotal
    pub amount: Option<Decimal>,
    pub active: bool,
    pub created_by: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_item::Entity")]
    SaleItem,
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItem.def()
    }
}

impl Entity {
    /// Campaigns that have not been soft-deleted. All read paths go through
    /// this so the deletion flag never has to be remembered at call sites.
    pub fn find_active() -> Select<Entity> {
        Self::find().filter(Column::IsDeleted.eq(false))
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        if let ActiveValue::NotSet = active_model.updated_at {
            active_model.updated_at = Set(Some(now));
        }

        Ok(active_model)
    }
}
