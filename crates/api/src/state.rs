//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;

use coursebundle_billing::BillingService;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub billing: Arc<BillingService>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, billing: BillingService) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            billing: Arc::new(billing),
        }
    }
}
