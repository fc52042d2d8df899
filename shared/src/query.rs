use serde::{Deserialize, Serialize};

use crate::OrderStatus;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 30;
pub const MAX_PER_PAGE: u32 = 100;

/// One page of a newest-first listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Page {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.per_page) * (i64::from(self.page.max(1)) - 1)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// Exact-match filters; `None` members are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryFilter {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub email: Option<String>,
    pub status: Option<OrderStatus>,
}
