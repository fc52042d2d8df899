use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use shared::{Entity, Inventory};
use std::collections::HashMap;
use validator::Validate;

use super::dto::InventoryRequest;
use super::error::ApiError;
use super::{params, parse_id, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventories).post(create_inventory))
        .route(
            "/:inventory_id",
            get(get_inventory).put(update_inventory).delete(delete_inventory),
        )
}

async fn list_inventories(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Inventory>>, ApiError> {
    let (filter, page) = params::inventory_list(&query)?;
    let inventories = state.store.list_inventories(&filter, page).await?;
    Ok(Json(inventories))
}

async fn create_inventory(
    State(state): State<AppState>,
    payload: Result<Json<InventoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Inventory>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let inventory = state.store.create_inventory(request.into_draft()).await?;
    tracing::info!(inventory_id = %inventory.id, quantity = inventory.quantity, "Inventory created");
    Ok((StatusCode::CREATED, Json(inventory)))
}

async fn get_inventory(
    State(state): State<AppState>,
    Path(inventory_id): Path<String>,
) -> Result<Json<Inventory>, ApiError> {
    let id = parse_id(&inventory_id, Entity::Inventory)?;
    Ok(Json(state.store.get_inventory(id).await?))
}

async fn update_inventory(
    State(state): State<AppState>,
    Path(inventory_id): Path<String>,
    payload: Result<Json<InventoryRequest>, JsonRejection>,
) -> Result<Json<Inventory>, ApiError> {
    let id = parse_id(&inventory_id, Entity::Inventory)?;
    let Json(request) = payload?;
    request.validate()?;

    let inventory = state.store.update_inventory(id, request.into_patch()).await?;
    tracing::info!(inventory_id = %inventory.id, quantity = inventory.quantity, "Inventory updated");
    Ok(Json(inventory))
}

async fn delete_inventory(
    State(state): State<AppState>,
    Path(inventory_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&inventory_id, Entity::Inventory)?;
    state.store.delete_inventory(id).await?;
    tracing::info!(inventory_id = %id, "Inventory deleted");
    Ok(StatusCode::NO_CONTENT)
}
