use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Record kinds, used to name the missing record in `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Inventory,
    Order,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Inventory => f.write_str("Inventory"),
            Entity::Order => f.write_str("Order"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("{0} does not exist")]
    NotFound(Entity),

    #[error("One of the Order items inventory level is too low")]
    InsufficientInventory { inventory_id: Uuid },

    /// The order's status moved between read and write.
    #[error("Order was modified concurrently")]
    StatusChanged { order_id: Uuid },

    #[error("inventory {inventory_id} quantity out of range")]
    QuantityOutOfRange { inventory_id: Uuid },

    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl FulfillmentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FulfillmentError::NotFound(_))
    }

    pub fn is_insufficient_inventory(&self) -> bool {
        matches!(self, FulfillmentError::InsufficientInventory { .. })
    }

    pub fn is_status_changed(&self) -> bool {
        matches!(self, FulfillmentError::StatusChanged { .. })
    }
}

pub type Result<T> = std::result::Result<T, FulfillmentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_missing_record() {
        assert_eq!(
            FulfillmentError::NotFound(Entity::Inventory).to_string(),
            "Inventory does not exist"
        );
        assert_eq!(
            FulfillmentError::NotFound(Entity::Order).to_string(),
            "Order does not exist"
        );
    }

    #[test]
    fn insufficient_inventory_message_is_stable() {
        let err = FulfillmentError::InsufficientInventory {
            inventory_id: Uuid::nil(),
        };
        assert!(err.is_insufficient_inventory());
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "One of the Order items inventory level is too low"
        );
    }
}
