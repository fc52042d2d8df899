mod error;
mod query;
mod status;

pub use error::{Entity, FulfillmentError, Result};
pub use query::{InventoryFilter, OrderFilter, Page, DEFAULT_PAGE, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use status::{OrderStatus, StockEffect, UnknownStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: Uuid,
    #[validate(length(min = 1, max = 256, message = "\"name\" must be between 1 and 256 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "\"price\" must be larger than or equal to 0"))]
    pub price: f64,
    #[validate(range(min = 0, message = "\"quantity\" must be larger than or equal to 0"))]
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct InventoryDraft {
    #[validate(length(min = 1, max = 256, message = "\"name\" must be between 1 and 256 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "\"price\" must be larger than or equal to 0"))]
    pub price: f64,
    #[validate(range(min = 0, message = "\"quantity\" must be larger than or equal to 0"))]
    pub quantity: i32,
}

/// Shallow overwrite of an inventory record. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct InventoryPatch {
    #[validate(length(min = 1, max = 256, message = "\"name\" must be between 1 and 256 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "\"price\" must be larger than or equal to 0"))]
    pub price: Option<f64>,
    #[validate(range(min = 0, message = "\"quantity\" must be larger than or equal to 0"))]
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub inventory_id: Uuid,
    /// Unit price at the time the order was placed.
    #[validate(range(min = 0.0, message = "\"price\" must be larger than or equal to 0"))]
    pub price: f64,
    #[validate(range(min = 1, message = "\"quantity\" must be larger than or equal to 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[validate(email(message = "\"email\" must be a valid email"))]
    pub email: String,
    pub status: OrderStatus,
    #[validate(
        length(min = 1, message = "\"orderLines\" must contain at least 1 items"),
        nested
    )]
    pub order_lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct OrderDraft {
    #[validate(email(message = "\"email\" must be a valid email"))]
    pub email: String,
    pub status: OrderStatus,
    #[validate(
        length(min = 1, message = "\"orderLines\" must contain at least 1 items"),
        nested
    )]
    pub order_lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct OrderPatch {
    #[validate(email(message = "\"email\" must be a valid email"))]
    pub email: Option<String>,
    pub status: Option<OrderStatus>,
    #[validate(nested)]
    pub order_lines: Option<Vec<OrderLine>>,
}

/// Signed change to one inventory quantity. Stores apply it only if the
/// result stays non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub inventory_id: Uuid,
    pub delta: i32,
}

impl StockAdjustment {
    pub fn take(inventory_id: Uuid, quantity: i32) -> Self {
        Self {
            inventory_id,
            delta: -quantity,
        }
    }

    pub fn restock(inventory_id: Uuid, quantity: i32) -> Self {
        Self {
            inventory_id,
            delta: quantity,
        }
    }

    /// Quantity the record must hold for the adjustment to apply.
    pub fn required_quantity(&self) -> i32 {
        self.delta.saturating_neg().max(0)
    }
}

/// Requested quantity per inventory, in the order each inventory first
/// appears. Lines naming the same inventory are summed.
pub fn demand(lines: &[OrderLine]) -> Vec<(Uuid, i32)> {
    let mut totals: Vec<(Uuid, i32)> = Vec::with_capacity(lines.len());
    for line in lines {
        match totals.iter_mut().find(|(id, _)| *id == line.inventory_id) {
            Some((_, total)) => *total = total.saturating_add(line.quantity),
            None => totals.push((line.inventory_id, line.quantity)),
        }
    }
    totals
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl InventoryDraft {
    pub fn new(name: &str, description: Option<String>, price: f64, quantity: i32) -> Self {
        Self {
            name: name.trim().to_string(),
            description: description.map(|d| d.trim().to_string()),
            price,
            quantity,
        }
    }

    pub fn into_inventory(self, id: Uuid, created_at: DateTime<Utc>) -> Inventory {
        Inventory {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            quantity: self.quantity,
            created_at,
        }
    }
}

impl InventoryPatch {
    pub fn new(
        name: Option<&str>,
        description: Option<String>,
        price: Option<f64>,
        quantity: Option<i32>,
    ) -> Self {
        Self {
            name: name.map(|n| n.trim().to_string()),
            description: description.map(|d| d.trim().to_string()),
            price,
            quantity,
        }
    }
}

impl Inventory {
    pub fn apply(&mut self, patch: InventoryPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = Some(description.trim().to_string());
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
    }
}

impl OrderDraft {
    pub fn new(email: &str, status: Option<OrderStatus>, order_lines: Vec<OrderLine>) -> Self {
        Self {
            email: normalize_email(email),
            status: status.unwrap_or_default(),
            order_lines,
        }
    }

    pub fn into_order(self, id: Uuid, created_at: DateTime<Utc>) -> Order {
        Order {
            id,
            email: self.email,
            status: self.status,
            order_lines: self.order_lines,
            created_at,
        }
    }
}

impl Order {
    pub fn apply(&mut self, patch: OrderPatch) {
        if let Some(email) = patch.email {
            self.email = normalize_email(&email);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(order_lines) = patch.order_lines {
            self.order_lines = order_lines;
        }
    }
}
