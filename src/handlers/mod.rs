pub mod campaigns;
pub mod common;
pub mod returns;
pub mod sales;

use std::sync::Arc;

use crate::clients::inventory::InventoryApi;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub sales: Arc<crate::services::sales::SaleService>,
    pub returns: Arc<crate::services::returns::ReturnService>,
    pub campaigns: Arc<crate::services::campaigns::CampaignService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        inventory: Arc<dyn InventoryApi>,
        event_sender: EventSender,
        config: &AppConfig,
    ) -> Self {
        let sales = Arc::new(crate::services::sales::SaleService::new(
            db_pool.clone(),
            inventory.clone(),
            event_sender.clone(),
        ));
        let returns = Arc::new(crate::services::returns::ReturnService::new(
            db_pool.clone(),
            inventory,
            event_sender.clone(),
            config.return_window_days,
        ));
        let campaigns = Arc::new(crate::services::campaigns::CampaignService::new(
            db_pool,
            event_sender,
        ));

        Self {
            sales,
            returns,
            campaigns,
        }
    }
}
