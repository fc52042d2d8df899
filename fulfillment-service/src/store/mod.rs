//! Record Store: get/save/list over inventory and order records.
//!
//! Besides plain CRUD, every backend exposes two atomic primitives that
//! persist an order together with the stock adjustments it implies. Each
//! adjustment is conditional: it applies only if the inventory quantity
//! stays non-negative, checked at write time. Either the order and all
//! adjustments land, or none of them do. Restocks aimed at an inventory that
//! no longer exists are skipped with a warning.
//!
//! Updates to an existing order are conditional on the status the caller
//! read, so a restock decided from that status is applied at most once.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::{run_migrations, DbPool, PgStore};

use async_trait::async_trait;
use shared::*;
use uuid::Uuid;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_inventory(&self, id: Uuid) -> Result<Inventory>;

    async fn create_inventory(&self, draft: InventoryDraft) -> Result<Inventory>;

    /// Merges `patch` onto the stored record in one unit. Fields the patch
    /// leaves out, quantity included, are never written.
    async fn update_inventory(&self, id: Uuid, patch: InventoryPatch) -> Result<Inventory>;

    async fn delete_inventory(&self, id: Uuid) -> Result<()>;

    async fn list_inventories(&self, filter: &InventoryFilter, page: Page) -> Result<Vec<Inventory>>;

    async fn get_order(&self, id: Uuid) -> Result<Order>;

    async fn save_order(&self, order: &Order) -> Result<Order>;

    async fn list_orders(&self, filter: &OrderFilter, page: Page) -> Result<Vec<Order>>;

    /// Inserts a new order and applies `adjustments` in one unit.
    async fn create_order_with_adjustments(
        &self,
        draft: OrderDraft,
        adjustments: &[StockAdjustment],
    ) -> Result<Order>;

    /// Saves an existing order and applies `adjustments` in one unit, provided
    /// the stored status still equals `expected`. Otherwise nothing is
    /// written and `StatusChanged` is returned.
    async fn save_order_with_adjustments(
        &self,
        order: &Order,
        expected: OrderStatus,
        adjustments: &[StockAdjustment],
    ) -> Result<Order>;
}
