use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use shared::{Entity, Order};
use std::collections::HashMap;
use validator::Validate;

use super::dto::{CreateOrderRequest, UpdateOrderRequest};
use super::error::ApiError;
use super::{params, parse_id, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route(
            "/:order_id",
            get(get_order).put(update_order).delete(delete_order),
        )
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let (filter, page) = params::order_list(&query)?;
    Ok(Json(state.reconciler.list_orders(&filter, page).await?))
}

async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let order = state.reconciler.place_order(request.into_draft()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id = parse_id(&order_id, Entity::Order)?;
    Ok(Json(state.reconciler.get_order(id).await?))
}

async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let id = parse_id(&order_id, Entity::Order)?;
    let Json(request) = payload?;
    request.validate()?;

    let order = state.reconciler.update_order(id, request.into_patch()).await?;
    Ok(Json(order))
}

async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&order_id, Entity::Order)?;
    state.reconciler.remove_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
