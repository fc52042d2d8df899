pub mod dto;
pub mod error;
mod inventories;
mod orders;
mod params;

use axum::{routing::get, Router};
use shared::{Entity, FulfillmentError};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::reconciler::OrderReconciler;
use crate::store::RecordStore;
use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub reconciler: OrderReconciler,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            reconciler: OrderReconciler::new(store.clone()),
            store,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/status", get(health_check))
        .nest("/inventories", inventories::router())
        .nest("/orders", orders::router());

    Router::new()
        .route("/health", get(health_check))
        .nest("/v1", v1)
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// Ids that are not UUIDs cannot name a record, so they read as missing.
fn parse_id(raw: &str, entity: Entity) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| FulfillmentError::NotFound(entity).into())
}
