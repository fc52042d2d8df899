use async_trait::async_trait;
use chrono::Utc;
use shared::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

use super::RecordStore;

struct Stored<T> {
    record: T,
    sequence: u64,
}

#[derive(Default)]
struct Tables {
    inventories: HashMap<Uuid, Stored<Inventory>>,
    orders: HashMap<Uuid, Stored<Order>>,
    next_sequence: u64,
}

impl Tables {
    fn sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }

    /// Validates every adjustment against staged quantities, then commits
    /// them all. Nothing is written if any adjustment fails.
    fn apply_adjustments(&mut self, adjustments: &[StockAdjustment]) -> Result<()> {
        let mut staged: HashMap<Uuid, i32> = HashMap::new();

        for adjustment in adjustments {
            let current = match staged.get(&adjustment.inventory_id) {
                Some(quantity) => *quantity,
                None => match self.inventories.get(&adjustment.inventory_id) {
                    Some(stored) => stored.record.quantity,
                    None if adjustment.delta > 0 => {
                        warn!(
                            inventory_id = %adjustment.inventory_id,
                            quantity = adjustment.delta,
                            "Skipping restock of deleted inventory"
                        );
                        continue;
                    }
                    None => return Err(FulfillmentError::NotFound(Entity::Inventory)),
                },
            };

            let next = current.checked_add(adjustment.delta).ok_or(
                FulfillmentError::QuantityOutOfRange {
                    inventory_id: adjustment.inventory_id,
                },
            )?;
            if next < 0 {
                return Err(FulfillmentError::InsufficientInventory {
                    inventory_id: adjustment.inventory_id,
                });
            }
            staged.insert(adjustment.inventory_id, next);
        }

        for (inventory_id, quantity) in staged {
            if let Some(stored) = self.inventories.get_mut(&inventory_id) {
                stored.record.quantity = quantity;
                debug!(%inventory_id, quantity, "Inventory quantity adjusted");
            }
        }

        Ok(())
    }

    /// Overwrites a stored order, keeping its creation time. With `expected`
    /// set, the write only happens if the stored status still matches.
    fn write_order(
        &mut self,
        order: &Order,
        expected: Option<OrderStatus>,
        adjustments: &[StockAdjustment],
    ) -> Result<Order> {
        let stored = self
            .orders
            .get(&order.id)
            .ok_or(FulfillmentError::NotFound(Entity::Order))?;

        if expected.is_some_and(|status| status != stored.record.status) {
            return Err(FulfillmentError::StatusChanged { order_id: order.id });
        }
        let created_at = stored.record.created_at;

        self.apply_adjustments(adjustments)?;

        let saved = Order {
            created_at,
            ..order.clone()
        };
        if let Some(stored) = self.orders.get_mut(&order.id) {
            stored.record = saved.clone();
        }
        Ok(saved)
    }
}

/// Process-local record store. Every unit of work runs under a single lock,
/// which makes the order-plus-adjustments primitives atomic.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| FulfillmentError::Unavailable("in-memory store poisoned".to_string()))
    }
}

/// Newest first; the insertion sequence breaks timestamp ties.
fn page_of<T: Clone>(
    mut matches: Vec<&Stored<T>>,
    created_at: impl Fn(&T) -> chrono::DateTime<Utc>,
    page: Page,
) -> Vec<T> {
    matches.sort_by(|a, b| {
        created_at(&b.record)
            .cmp(&created_at(&a.record))
            .then(b.sequence.cmp(&a.sequence))
    });

    matches
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit()).unwrap_or(0))
        .map(|stored| stored.record.clone())
        .collect()
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get_inventory(&self, id: Uuid) -> Result<Inventory> {
        self.tables()?
            .inventories
            .get(&id)
            .map(|stored| stored.record.clone())
            .ok_or(FulfillmentError::NotFound(Entity::Inventory))
    }

    async fn create_inventory(&self, draft: InventoryDraft) -> Result<Inventory> {
        draft.validate()?;
        let inventory = draft.into_inventory(Uuid::new_v4(), Utc::now());

        let mut tables = self.tables()?;
        let sequence = tables.sequence();
        tables.inventories.insert(
            inventory.id,
            Stored {
                record: inventory.clone(),
                sequence,
            },
        );
        Ok(inventory)
    }

    async fn update_inventory(&self, id: Uuid, patch: InventoryPatch) -> Result<Inventory> {
        patch.validate()?;

        let mut tables = self.tables()?;
        let stored = tables
            .inventories
            .get_mut(&id)
            .ok_or(FulfillmentError::NotFound(Entity::Inventory))?;

        stored.record.apply(patch);
        Ok(stored.record.clone())
    }

    async fn delete_inventory(&self, id: Uuid) -> Result<()> {
        self.tables()?
            .inventories
            .remove(&id)
            .map(|_| ())
            .ok_or(FulfillmentError::NotFound(Entity::Inventory))
    }

    async fn list_inventories(&self, filter: &InventoryFilter, page: Page) -> Result<Vec<Inventory>> {
        let tables = self.tables()?;
        let matches = tables
            .inventories
            .values()
            .filter(|stored| {
                let inventory = &stored.record;
                filter.name.as_ref().map_or(true, |name| &inventory.name == name)
                    && filter
                        .description
                        .as_ref()
                        .map_or(true, |d| inventory.description.as_ref() == Some(d))
                    && filter.price.map_or(true, |price| inventory.price == price)
                    && filter.quantity.map_or(true, |q| inventory.quantity == q)
            })
            .collect();

        Ok(page_of(matches, |inventory| inventory.created_at, page))
    }

    async fn get_order(&self, id: Uuid) -> Result<Order> {
        self.tables()?
            .orders
            .get(&id)
            .map(|stored| stored.record.clone())
            .ok_or(FulfillmentError::NotFound(Entity::Order))
    }

    async fn save_order(&self, order: &Order) -> Result<Order> {
        order.validate()?;
        self.tables()?.write_order(order, None, &[])
    }

    async fn list_orders(&self, filter: &OrderFilter, page: Page) -> Result<Vec<Order>> {
        let tables = self.tables()?;
        let matches = tables
            .orders
            .values()
            .filter(|stored| {
                let order = &stored.record;
                filter.email.as_ref().map_or(true, |email| &order.email == email)
                    && filter.status.map_or(true, |status| order.status == status)
            })
            .collect();

        Ok(page_of(matches, |order| order.created_at, page))
    }

    async fn create_order_with_adjustments(
        &self,
        draft: OrderDraft,
        adjustments: &[StockAdjustment],
    ) -> Result<Order> {
        draft.validate()?;
        let order = draft.into_order(Uuid::new_v4(), Utc::now());

        let mut tables = self.tables()?;
        tables.apply_adjustments(adjustments)?;
        let sequence = tables.sequence();
        tables.orders.insert(
            order.id,
            Stored {
                record: order.clone(),
                sequence,
            },
        );
        Ok(order)
    }

    async fn save_order_with_adjustments(
        &self,
        order: &Order,
        expected: OrderStatus,
        adjustments: &[StockAdjustment],
    ) -> Result<Order> {
        order.validate()?;
        self.tables()?.write_order(order, Some(expected), adjustments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(quantity: i32) -> InventoryDraft {
        InventoryDraft::new("Widget", Some("blue".to_string()), 2.5, quantity)
    }

    fn order_for(inventory_id: Uuid, quantity: i32) -> OrderDraft {
        OrderDraft::new(
            "buyer@example.com",
            None,
            vec![OrderLine {
                inventory_id,
                price: 2.5,
                quantity,
            }],
        )
    }

    #[tokio::test]
    async fn inventory_crud() {
        let store = InMemoryStore::new();

        let created = store.create_inventory(widget(5)).await.unwrap();
        assert_eq!(store.get_inventory(created.id).await.unwrap(), created);

        let saved = store
            .update_inventory(created.id, InventoryPatch::new(None, None, None, Some(9)))
            .await
            .unwrap();
        assert_eq!(saved.quantity, 9);
        assert_eq!(saved.name, created.name);
        assert_eq!(saved.created_at, created.created_at);

        store.delete_inventory(created.id).await.unwrap();
        assert!(store.get_inventory(created.id).await.unwrap_err().is_not_found());
        assert!(store.delete_inventory(created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_rejects_invalid_patches() {
        let store = InMemoryStore::new();
        let inventory = store.create_inventory(widget(1)).await.unwrap();

        let err = store
            .update_inventory(inventory.id, InventoryPatch::new(None, None, None, Some(-4)))
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Validation(_)));
        assert_eq!(store.get_inventory(inventory.id).await.unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn rename_keeps_quantity_taken_after_read() {
        let store = InMemoryStore::new();
        let inventory = store.create_inventory(widget(1)).await.unwrap();

        store
            .create_order_with_adjustments(
                order_for(inventory.id, 1),
                &[StockAdjustment::take(inventory.id, 1)],
            )
            .await
            .unwrap();
        let renamed = store
            .update_inventory(inventory.id, InventoryPatch::new(Some("Renamed"), None, None, None))
            .await
            .unwrap();

        assert_eq!(renamed.name, "Renamed");
        assert_eq!(renamed.quantity, 0);
        let err = store
            .create_order_with_adjustments(
                order_for(inventory.id, 1),
                &[StockAdjustment::take(inventory.id, 1)],
            )
            .await
            .unwrap_err();
        assert!(err.is_insufficient_inventory());
    }

    #[tokio::test]
    async fn lists_newest_first_with_paging() {
        let store = InMemoryStore::new();
        let mut ids = Vec::new();
        for quantity in 0..5 {
            ids.push(store.create_inventory(widget(quantity)).await.unwrap().id);
        }

        let first = store
            .list_inventories(&InventoryFilter::default(), Page::new(1, 2))
            .await
            .unwrap();
        assert_eq!(first.iter().map(|i| i.id).collect::<Vec<_>>(), vec![ids[4], ids[3]]);

        let last = store
            .list_inventories(&InventoryFilter::default(), Page::new(3, 2))
            .await
            .unwrap();
        assert_eq!(last.iter().map(|i| i.id).collect::<Vec<_>>(), vec![ids[0]]);

        let filtered = store
            .list_inventories(
                &InventoryFilter {
                    quantity: Some(3),
                    ..Default::default()
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, ids[3]);
    }

    #[tokio::test]
    async fn failed_adjustment_writes_nothing() {
        let store = InMemoryStore::new();
        let a = store.create_inventory(widget(3)).await.unwrap();
        let b = store.create_inventory(widget(1)).await.unwrap();

        let err = store
            .create_order_with_adjustments(
                order_for(a.id, 2),
                &[StockAdjustment::take(a.id, 2), StockAdjustment::take(b.id, 2)],
            )
            .await
            .unwrap_err();

        assert!(err.is_insufficient_inventory());
        assert_eq!(store.get_inventory(a.id).await.unwrap().quantity, 3);
        assert_eq!(store.get_inventory(b.id).await.unwrap().quantity, 1);
        let orders = store
            .list_orders(&OrderFilter::default(), Page::default())
            .await
            .unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn adjustment_against_missing_inventory_is_not_found() {
        let store = InMemoryStore::new();
        let missing = Uuid::new_v4();

        let err = store
            .create_order_with_adjustments(order_for(missing, 1), &[StockAdjustment::take(missing, 1)])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn restock_of_deleted_inventory_is_skipped() {
        let store = InMemoryStore::new();
        let kept = store.create_inventory(widget(1)).await.unwrap();
        let gone = Uuid::new_v4();
        let order = store
            .create_order_with_adjustments(order_for(kept.id, 1), &[])
            .await
            .unwrap();

        let mut canceled = order.clone();
        canceled.status = OrderStatus::Canceled;
        let saved = store
            .save_order_with_adjustments(
                &canceled,
                OrderStatus::New,
                &[StockAdjustment::restock(gone, 2), StockAdjustment::restock(kept.id, 1)],
            )
            .await
            .unwrap();

        assert_eq!(saved.status, OrderStatus::Canceled);
        assert_eq!(store.get_inventory(kept.id).await.unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn stale_status_writes_nothing() {
        let store = InMemoryStore::new();
        let inventory = store.create_inventory(widget(1)).await.unwrap();
        let order = store
            .create_order_with_adjustments(order_for(inventory.id, 1), &[])
            .await
            .unwrap();

        let mut canceled = order.clone();
        canceled.status = OrderStatus::Canceled;
        let err = store
            .save_order_with_adjustments(
                &canceled,
                OrderStatus::Pending,
                &[StockAdjustment::restock(inventory.id, 1)],
            )
            .await
            .unwrap_err();

        assert!(err.is_status_changed());
        assert_eq!(store.get_order(order.id).await.unwrap().status, OrderStatus::New);
        assert_eq!(store.get_inventory(inventory.id).await.unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn save_order_keeps_creation_time() {
        let store = InMemoryStore::new();
        let inventory = store.create_inventory(widget(2)).await.unwrap();
        let order = store
            .create_order_with_adjustments(order_for(inventory.id, 1), &[])
            .await
            .unwrap();

        let mut changed = order.clone();
        changed.status = OrderStatus::Pending;
        changed.created_at = Utc::now() + chrono::Duration::days(1);
        let saved = store.save_order(&changed).await.unwrap();

        assert_eq!(saved.status, OrderStatus::Pending);
        assert_eq!(saved.created_at, order.created_at);
    }
}
