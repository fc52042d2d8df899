use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use num_traits::ToPrimitive;
use shared::*;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::inventories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InventoryRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::inventories)]
pub struct NewInventoryRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub quantity: i32,
}

/// Partial update; `None` columns are left out of the `SET` list.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::inventories)]
pub struct InventoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub quantity: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub email: String,
    pub status: String,
    pub order_lines: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub email: String,
    pub status: String,
    pub order_lines: serde_json::Value,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::orders)]
pub struct OrderChanges {
    pub email: String,
    pub status: String,
    pub order_lines: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Prices travel as JSON numbers and are stored as NUMERIC. The shortest
/// decimal form of the float is what gets stored.
pub fn price_to_numeric(price: f64) -> Result<BigDecimal> {
    BigDecimal::from_str(&price.to_string())
        .map_err(|e| FulfillmentError::Corrupt(format!("price {price} is not a decimal: {e}")))
}

pub fn numeric_to_price(value: &BigDecimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| FulfillmentError::Corrupt(format!("price {value} does not fit a float")))
}

impl NewInventoryRow {
    pub fn from_draft(id: Uuid, draft: InventoryDraft) -> Result<Self> {
        Ok(Self {
            id,
            price: price_to_numeric(draft.price)?,
            name: draft.name,
            description: draft.description,
            quantity: draft.quantity,
        })
    }
}

impl TryFrom<InventoryPatch> for InventoryChanges {
    type Error = FulfillmentError;

    fn try_from(patch: InventoryPatch) -> Result<Self> {
        Ok(Self {
            price: patch.price.map(price_to_numeric).transpose()?,
            name: patch.name,
            description: patch.description,
            quantity: patch.quantity,
            updated_at: Utc::now(),
        })
    }
}

impl TryFrom<InventoryRow> for Inventory {
    type Error = FulfillmentError;

    fn try_from(row: InventoryRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            price: numeric_to_price(&row.price)?,
            name: row.name,
            description: row.description,
            quantity: row.quantity,
            created_at: row.created_at,
        })
    }
}

impl NewOrderRow {
    pub fn from_draft(id: Uuid, draft: &OrderDraft) -> Result<Self> {
        Ok(Self {
            id,
            email: draft.email.clone(),
            status: draft.status.to_string(),
            order_lines: serde_json::to_value(&draft.order_lines)?,
        })
    }
}

impl TryFrom<&Order> for OrderChanges {
    type Error = FulfillmentError;

    fn try_from(order: &Order) -> Result<Self> {
        Ok(Self {
            email: order.email.clone(),
            status: order.status.to_string(),
            order_lines: serde_json::to_value(&order.order_lines)?,
            updated_at: Utc::now(),
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = FulfillmentError;

    fn try_from(row: OrderRow) -> Result<Self> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(|e| FulfillmentError::Corrupt(format!("order {}: {e}", row.id)))?;
        let order_lines: Vec<OrderLine> = serde_json::from_value(row.order_lines)?;

        Ok(Self {
            id: row.id,
            email: row.email,
            status,
            order_lines,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_keep_their_decimal_form() {
        let numeric = price_to_numeric(19.99).unwrap();
        assert_eq!(numeric.to_string(), "19.99");
        assert_eq!(numeric_to_price(&numeric).unwrap(), 19.99);
    }

    #[test]
    fn inventory_changes_leave_out_absent_fields() {
        let changes =
            InventoryChanges::try_from(InventoryPatch::new(Some("Gadget"), None, Some(1.5), None))
                .unwrap();
        assert_eq!(changes.name.as_deref(), Some("Gadget"));
        assert_eq!(changes.price.map(|p| p.to_string()).as_deref(), Some("1.5"));
        assert_eq!(changes.quantity, None);
        assert_eq!(changes.description, None);
    }

    #[test]
    fn order_row_with_unknown_status_is_corrupt() {
        let row = OrderRow {
            id: Uuid::new_v4(),
            email: "buyer@example.com".to_string(),
            status: "shipped".to_string(),
            order_lines: serde_json::json!([]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            Order::try_from(row),
            Err(FulfillmentError::Corrupt(_))
        ));
    }

    #[test]
    fn order_lines_round_trip_through_jsonb() {
        let inventory_id = Uuid::new_v4();
        let draft = OrderDraft::new(
            "buyer@example.com",
            Some(OrderStatus::Pending),
            vec![OrderLine {
                inventory_id,
                price: 4.25,
                quantity: 2,
            }],
        );
        let id = Uuid::new_v4();
        let new_row = NewOrderRow::from_draft(id, &draft).unwrap();
        assert_eq!(new_row.status, "pending");
        assert_eq!(new_row.order_lines[0]["inventoryId"], inventory_id.to_string());

        let now = Utc::now();
        let order = Order::try_from(OrderRow {
            id,
            email: new_row.email,
            status: new_row.status,
            order_lines: new_row.order_lines,
            created_at: now,
            updated_at: now,
        })
        .unwrap();
        assert_eq!(order, draft.into_order(id, now));
    }
}
