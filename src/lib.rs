pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use crate::services::notify::LogNotifier;
use crate::services::payment::CheckoutClient;
use crate::services::reservation::ReservationService;
use crate::store::{PgStore, TicketStore};

// Shared state for the whole application
pub struct AppState {
    pub store: Arc<dyn TicketStore>,
    pub reservations: ReservationService,
    pub payments: CheckoutClient,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db =
            database::Database::connect(&config.database.url, config.database.pool_size).await?;

        let store: Arc<dyn TicketStore> = Arc::new(PgStore::new(db));
        let reservations = ReservationService::new(store.clone(), Arc::new(LogNotifier));
        let payments = CheckoutClient::from_config(&config.payment);

        Ok(Arc::new(Self {
            store,
            reservations,
            payments,
            config,
        }))
    }
}
