use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the sales service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    SaleCompleted {
        sale_id: Uuid,
        sales_number: String,
        total_price: Decimal,
    },
    SaleDeleted(Uuid),
    SaleReturned {
        sale_id: Uuid,
        sales_number: String,
        product_id: String,
        returned_quantity: i32,
    },

    CampaignCreated(Uuid),
    CampaignUpdated(Uuid),
    CampaignDeleted(Uuid),

    /// A fire-and-forget inventory notification failed after the local
    /// transaction committed. Reconciliation picks these up from the log.
    InventorySyncFailed {
        product_id: String,
        quantity: i32,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. Spawned once at startup.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::InventorySyncFailed {
                product_id,
                quantity,
                reason,
            } => {
                warn!(
                    product_id = %product_id,
                    quantity = quantity,
                    reason = %reason,
                    "Inventory notification lost; stock requires reconciliation"
                );
            }
            other => info!(event = ?other, "Event processed"),
        }
    }
    info!("Event channel closed; event processor exiting");
}
