//! Request bodies. Required fields are `Option`s so that a missing field
//! surfaces as a field-level validation error instead of a parse failure.

use serde::{Deserialize, Serialize};
use shared::{InventoryDraft, InventoryPatch, OrderDraft, OrderLine, OrderPatch, OrderStatus};
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRequest {
    #[validate(
        required(message = "\"name\" is required"),
        length(min = 1, max = 256, message = "\"name\" must be between 1 and 256 characters")
    )]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "\"price\" must be larger than or equal to 0"))]
    pub price: Option<f64>,
    #[validate(range(min = 0, message = "\"quantity\" must be larger than or equal to 0"))]
    pub quantity: Option<i32>,
}

impl InventoryRequest {
    pub fn into_draft(self) -> InventoryDraft {
        InventoryDraft::new(
            self.name.as_deref().unwrap_or_default(),
            self.description,
            self.price.unwrap_or_default(),
            self.quantity.unwrap_or_default(),
        )
    }

    pub fn into_patch(self) -> InventoryPatch {
        InventoryPatch::new(self.name.as_deref(), self.description, self.price, self.quantity)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    #[validate(
        required(message = "\"inventoryId\" is required"),
        custom(function = "valid_uuid")
    )]
    pub inventory_id: Option<String>,
    #[validate(
        required(message = "\"price\" is required"),
        range(min = 0.0, message = "\"price\" must be larger than or equal to 0")
    )]
    pub price: Option<f64>,
    #[validate(
        required(message = "\"quantity\" is required"),
        range(min = 1, message = "\"quantity\" must be larger than or equal to 1")
    )]
    pub quantity: Option<i32>,
}

impl OrderLineRequest {
    // Presence is checked by `validate()`.
    fn into_line(self) -> OrderLine {
        OrderLine {
            inventory_id: self
                .inventory_id
                .as_deref()
                .and_then(|id| Uuid::parse_str(id).ok())
                .unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            quantity: self.quantity.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(
        required(message = "\"email\" is required"),
        email(message = "\"email\" must be a valid email")
    )]
    pub email: Option<String>,
    #[validate(custom(function = "known_status"))]
    pub status: Option<String>,
    #[validate(
        required(message = "\"orderLines\" is required"),
        length(min = 1, message = "\"orderLines\" must contain at least 1 items"),
        nested
    )]
    pub order_lines: Option<Vec<OrderLineRequest>>,
}

impl CreateOrderRequest {
    pub fn into_draft(self) -> OrderDraft {
        OrderDraft::new(
            self.email.as_deref().unwrap_or_default(),
            parse_status(self.status.as_deref()),
            self.order_lines
                .unwrap_or_default()
                .into_iter()
                .map(OrderLineRequest::into_line)
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    #[validate(
        required(message = "\"email\" is required"),
        email(message = "\"email\" must be a valid email")
    )]
    pub email: Option<String>,
    #[validate(custom(function = "known_status"))]
    pub status: Option<String>,
    #[validate(nested)]
    pub order_lines: Option<Vec<OrderLineRequest>>,
}

impl UpdateOrderRequest {
    pub fn into_patch(self) -> OrderPatch {
        OrderPatch {
            email: self.email,
            status: parse_status(self.status.as_deref()),
            order_lines: self
                .order_lines
                .map(|lines| lines.into_iter().map(OrderLineRequest::into_line).collect()),
        }
    }
}

fn parse_status(status: Option<&str>) -> Option<OrderStatus> {
    status.and_then(|s| s.parse().ok())
}

fn valid_uuid(id: &str) -> Result<(), ValidationError> {
    match Uuid::parse_str(id) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("inventoryId")
            .with_message(Cow::Borrowed("\"inventoryId\" must be a valid GUID"))),
    }
}

fn known_status(status: &str) -> Result<(), ValidationError> {
    match status.parse::<OrderStatus>() {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("status").with_message(Cow::Owned(format!(
            "\"status\" must be one of [{}]",
            OrderStatus::allowed_values()
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::field_errors;

    fn messages_for(errors: &validator::ValidationErrors, field: &str) -> Vec<String> {
        field_errors(errors, "body")
            .into_iter()
            .find(|e| e.field == field)
            .map(|e| e.messages)
            .unwrap_or_default()
    }

    #[test]
    fn inventory_request_requires_name() {
        let request: InventoryRequest = serde_json::from_str(r#"{"price": 1, "quantity": 2}"#).unwrap();
        let errors = request.validate().unwrap_err();
        assert_eq!(messages_for(&errors, "name"), vec!["\"name\" is required"]);
    }

    #[test]
    fn inventory_request_rejects_negative_numbers() {
        let request: InventoryRequest =
            serde_json::from_str(r#"{"name": "Widget", "price": -1, "quantity": -1}"#).unwrap();
        let errors = request.validate().unwrap_err();
        assert_eq!(
            messages_for(&errors, "price"),
            vec!["\"price\" must be larger than or equal to 0"]
        );
        assert_eq!(
            messages_for(&errors, "quantity"),
            vec!["\"quantity\" must be larger than or equal to 0"]
        );
    }

    #[test]
    fn create_order_reports_each_missing_field() {
        let request: CreateOrderRequest = serde_json::from_str("{}").unwrap();
        let errors = request.validate().unwrap_err();
        assert_eq!(messages_for(&errors, "email"), vec!["\"email\" is required"]);
        assert_eq!(
            messages_for(&errors, "orderLines"),
            vec!["\"orderLines\" is required"]
        );
    }

    #[test]
    fn create_order_rejects_unknown_status_and_empty_lines() {
        let request: CreateOrderRequest = serde_json::from_str(
            r#"{"email": "buyer@example.com", "status": "shipped", "orderLines": []}"#,
        )
        .unwrap();
        let errors = request.validate().unwrap_err();
        assert_eq!(
            messages_for(&errors, "status"),
            vec!["\"status\" must be one of [new, pending, refunded, canceled, deleted]"]
        );
        assert_eq!(
            messages_for(&errors, "orderLines"),
            vec!["\"orderLines\" must contain at least 1 items"]
        );
    }

    #[test]
    fn create_order_becomes_normalized_draft() {
        let inventory_id = Uuid::new_v4();
        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "email": "Buyer@Example.com",
            "status": "pending",
            "orderLines": [{ "inventoryId": inventory_id, "price": 2.5, "quantity": 3 }],
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let draft = request.into_draft();
        assert_eq!(draft.email, "buyer@example.com");
        assert_eq!(draft.status, OrderStatus::Pending);
        assert_eq!(
            draft.order_lines,
            vec![OrderLine {
                inventory_id,
                price: 2.5,
                quantity: 3
            }]
        );
    }

    #[test]
    fn malformed_inventory_id_is_a_field_error() {
        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "email": "buyer@example.com",
            "orderLines": [{ "inventoryId": "abc", "price": 1, "quantity": 1 }],
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        assert_eq!(
            messages_for(&errors, "orderLines.0.inventoryId"),
            vec!["\"inventoryId\" must be a valid GUID"]
        );
    }

    #[test]
    fn inventory_patch_is_trimmed() {
        let request: InventoryRequest = serde_json::from_str(r#"{"name": " Gadget "}"#).unwrap();
        let patch = request.into_patch();
        assert_eq!(patch.name.as_deref(), Some("Gadget"));
        assert_eq!(patch.quantity, None);
    }

    #[test]
    fn update_order_without_lines_keeps_them_unset() {
        let request: UpdateOrderRequest =
            serde_json::from_str(r#"{"email": "buyer@example.com", "status": "canceled"}"#).unwrap();
        assert!(request.validate().is_ok());

        let patch = request.into_patch();
        assert_eq!(patch.status, Some(OrderStatus::Canceled));
        assert_eq!(patch.order_lines, None);
    }
}
