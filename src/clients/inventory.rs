use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Availability and pricing of one product, as reported by the inventory
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCheck {
    pub name: String,
    pub unit_price: Decimal,
    /// false when the requested quantity exceeds what is available
    pub in_stock: bool,
    /// false when the product has been administratively disabled
    pub state: bool,
}

/// One consumed line reported back after a sale is finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedLine {
    pub product_id: String,
    pub quantity: i32,
}

/// Failures of the inventory boundary. A missing product, an unreachable
/// service and an out-of-stock line are three different things and must stay
/// distinguishable; the third is not represented here because it is a
/// business decision made by the orchestrator from `StockCheck`.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("product {0} not found")]
    ProductNotFound(String),
    #[error("inventory fetch failed: {0}")]
    Unavailable(String),
}

impl From<InventoryError> for ServiceError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::ProductNotFound(id) => {
                ServiceError::NotFound(format!("product {} not found", id))
            }
            InventoryError::Unavailable(msg) => ServiceError::InventoryUnavailable(msg),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// Queries availability and unit price without decrementing stock.
    async fn check(&self, product_id: &str, quantity: i32) -> Result<StockCheck, InventoryError>;

    /// Reports consumption after a finalized sale.
    async fn commit(&self, lines: Vec<ConsumedLine>) -> Result<(), InventoryError>;

    /// Re-adds stock after a return.
    async fn credit(&self, product_id: &str, quantity: i32) -> Result<(), InventoryError>;
}

/// HTTP adapter for the inventory service.
#[derive(Clone)]
pub struct HttpInventoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInventoryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client build failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckRequest<'a> {
    product_id: &'a str,
    quantity: i32,
}

#[async_trait]
impl InventoryApi for HttpInventoryClient {
    #[instrument(skip(self))]
    async fn check(&self, product_id: &str, quantity: i32) -> Result<StockCheck, InventoryError> {
        let response = self
            .client
            .post(self.url("/inventory/check"))
            .json(&CheckRequest {
                product_id,
                quantity,
            })
            .send()
            .await
            .map_err(|e| InventoryError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(InventoryError::ProductNotFound(product_id.to_string())),
            status if status.is_success() => response
                .json::<StockCheck>()
                .await
                .map_err(|e| InventoryError::Unavailable(format!("malformed response: {}", e))),
            status => Err(InventoryError::Unavailable(format!(
                "inventory check returned {}",
                status
            ))),
        }
    }

    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    async fn commit(&self, lines: Vec<ConsumedLine>) -> Result<(), InventoryError> {
        let response = self
            .client
            .post(self.url("/inventory/commit"))
            .json(&lines)
            .send()
            .await
            .map_err(|e| InventoryError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(InventoryError::Unavailable(format!(
                "inventory commit returned {}",
                response.status()
            )))
        }
    }

    #[instrument(skip(self))]
    async fn credit(&self, product_id: &str, quantity: i32) -> Result<(), InventoryError> {
        let response = self
            .client
            .post(self.url("/inventory/credit"))
            .json(&ConsumedLine {
                product_id: product_id.to_string(),
                quantity,
            })
            .send()
            .await
            .map_err(|e| InventoryError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(InventoryError::Unavailable(format!(
                "inventory credit returned {}",
                response.status()
            )))
        }
    }
}

/// Reports consumption as a detached task. Best-effort, at most once: the
/// sale has already committed, so a failure here is logged and emitted as an
/// [`Event::InventorySyncFailed`] per line instead of propagating.
pub fn spawn_commit(
    inventory: Arc<dyn InventoryApi>,
    events: EventSender,
    lines: Vec<ConsumedLine>,
) {
    tokio::spawn(async move {
        match inventory.commit(lines.clone()).await {
            Ok(()) => info!(line_count = lines.len(), "Inventory consumption committed"),
            Err(e) => {
                error!(error = %e, "Async inventory commit failed");
                for line in lines {
                    let _ = events
                        .send(Event::InventorySyncFailed {
                            product_id: line.product_id,
                            quantity: line.quantity,
                            reason: e.to_string(),
                        })
                        .await;
                }
            }
        }
    });
}

/// Credits returned stock as a detached task, with the same best-effort
/// semantics as [`spawn_commit`].
pub fn spawn_credit(
    inventory: Arc<dyn InventoryApi>,
    events: EventSender,
    product_id: String,
    quantity: i32,
) {
    tokio::spawn(async move {
        match inventory.credit(&product_id, quantity).await {
            Ok(()) => info!(product_id = %product_id, quantity, "Inventory credited for return"),
            Err(e) => {
                error!(error = %e, product_id = %product_id, "Async inventory credit failed");
                let _ = events
                    .send(Event::InventorySyncFailed {
                        product_id,
                        quantity,
                        reason: e.to_string(),
                    })
                    .await;
            }
        }
    });
}
