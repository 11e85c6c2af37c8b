use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::TicketService;

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub tickets: Arc<dyn TicketService>,
}

impl AppContext {
    pub fn new(config: AppConfig, tickets: Arc<dyn TicketService>) -> Self {
        Self { config, tickets }
    }
}
