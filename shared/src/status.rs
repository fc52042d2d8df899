use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    New,
    Pending,
    Refunded,
    Canceled,
    Deleted,
}

/// What a status change does to the inventory the order drew from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    None,
    Restock,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::New,
        OrderStatus::Pending,
        OrderStatus::Refunded,
        OrderStatus::Canceled,
        OrderStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Pending => "pending",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Deleted => "deleted",
        }
    }

    /// Transition table for order statuses.
    ///
    /// Any status may move to any other; only entering `canceled` touches stock.
    /// Soft deletion leaves stock alone, even for orders that were never canceled.
    pub fn stock_effect(self, next: OrderStatus) -> StockEffect {
        use OrderStatus::*;

        match (self, next) {
            (Canceled, Canceled) => StockEffect::None,
            (New | Pending | Refunded | Deleted, Canceled) => StockEffect::Restock,
            (_, New | Pending | Refunded | Deleted) => StockEffect::None,
        }
    }

    /// Comma separated list used in validation messages.
    pub fn allowed_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OrderStatus::New),
            "pending" => Ok(OrderStatus::Pending),
            "refunded" => Ok(OrderStatus::Refunded),
            "canceled" => Ok(OrderStatus::Canceled),
            "deleted" => Ok(OrderStatus::Deleted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
