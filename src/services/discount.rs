use rust_decimal::Decimal;

use crate::entities::campaign::{self, CampaignKind};
use crate::errors::ServiceError;

/// Computes the total price of one sale line after applying at most one
/// campaign. Pure; callers decide which campaign (if any) may be applied.
///
/// A campaign row whose key fields do not match its kind is rejected with a
/// typed error rather than being silently priced at full value: such a row
/// can only exist if write-time validation was bypassed, and quietly ignoring
/// it would hide the corruption.
pub fn apply_discount(
    quantity: i32,
    unit_price: Decimal,
    campaign: Option<&campaign::Model>,
) -> Result<Decimal, ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::InvalidInput(format!(
            "quantity must be at least 1, got {}",
            quantity
        )));
    }
    if unit_price < Decimal::ZERO {
        return Err(ServiceError::InvalidInput(format!(
            "unit price cannot be negative, got {}",
            unit_price
        )));
    }

    let subtotal = Decimal::from(quantity) * unit_price;

    let Some(campaign) = campaign else {
        return Ok(subtotal);
    };

    match campaign.kind {
        CampaignKind::BuyXPayY => {
            let (buy, pay) = match (campaign.buy_quantity, campaign.pay_quantity) {
                (Some(buy), Some(pay)) if buy > pay && pay > 0 => (buy, pay),
                _ => return Err(malformed(campaign, "buy/pay quantities")),
            };
            let full_groups = quantity / buy;
            let remainder = quantity % buy;
            Ok(Decimal::from(full_groups * pay + remainder) * unit_price)
        }
        CampaignKind::Percent => {
            let percent = match campaign.percent {
                Some(p) if p > Decimal::ZERO && p <= Decimal::from(100) => p,
                _ => return Err(malformed(campaign, "percent")),
            };
            Ok(subtotal * (Decimal::ONE - percent / Decimal::from(100)))
        }
        CampaignKind::MoneyDiscount => {
            let amount = match campaign.amount {
                Some(a) if a > Decimal::ZERO => a,
                _ => return Err(malformed(campaign, "amount")),
            };
            // Flat discounts larger than the line subtotal clamp at zero; a
            // negative line total has no meaning at the register.
            Ok((subtotal - amount).max(Decimal::ZERO))
        }
    }
}

fn malformed(campaign: &campaign::Model, field: &str) -> ServiceError {
    ServiceError::InvalidOperation(format!(
        "campaign {} has an invalid {} for kind {:?}",
        campaign.id, field, campaign.kind
    ))
}
