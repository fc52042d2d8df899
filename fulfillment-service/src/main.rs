use anyhow::Result;
use clap::Parser;
use fulfillment_service::api::{self, AppState};
use fulfillment_service::config::{Config, StoreBackend};
use fulfillment_service::store::{self, InMemoryStore, PgStore, RecordStore};
use fulfillment_service::telemetry;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    telemetry::init(config.log_format);

    let store: Arc<dyn RecordStore> = match config.store {
        StoreBackend::Postgres => {
            if config.run_migrations {
                store::run_migrations(&config.database_url)?;
            }
            Arc::new(PgStore::connect(&config.database_url, config.pool_size).await?)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; records are lost on shutdown");
            Arc::new(InMemoryStore::default())
        }
    };

    let app = api::create_router(AppState::new(store));
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!("Fulfillment service ready to accept HTTP requests at http://{}/v1", address);

    axum::serve(listener, app).await?;

    Ok(())
}
