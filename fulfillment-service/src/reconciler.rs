//! Order Fulfillment Reconciler.
//!
//! Keeps inventory quantities consistent with order lifecycle transitions:
//! placing an order takes stock, canceling it gives the stock back, and a
//! soft delete leaves stock untouched. The availability check here is a
//! read-only precheck; the store re-validates every decrement at write time
//! and applies the order together with its adjustments as one unit.

use shared::*;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::store::RecordStore;

/// Conditional writes lost to a concurrent update before giving up.
const MAX_UPDATE_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct OrderReconciler {
    store: Arc<dyn RecordStore>,
}

impl OrderReconciler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, draft), fields(email = %draft.email, lines = draft.order_lines.len()))]
    pub async fn place_order(&self, draft: OrderDraft) -> Result<Order> {
        draft.validate()?;

        let requested = demand(&draft.order_lines);
        for (inventory_id, quantity) in &requested {
            let inventory = self.store.get_inventory(*inventory_id).await?;
            if inventory.quantity < *quantity {
                warn!(
                    %inventory_id,
                    requested = quantity,
                    available = inventory.quantity,
                    "Inventory level too low for order"
                );
                return Err(FulfillmentError::InsufficientInventory {
                    inventory_id: *inventory_id,
                });
            }
        }

        let adjustments: Vec<StockAdjustment> = requested
            .iter()
            .map(|(inventory_id, quantity)| StockAdjustment::take(*inventory_id, *quantity))
            .collect();

        let order = self
            .store
            .create_order_with_adjustments(draft, &adjustments)
            .await?;

        info!(order_id = %order.id, status = %order.status, "Order placed");
        Ok(order)
    }

    /// Merges `patch` onto the stored order. Entering `canceled` restocks the
    /// lines the order held before the patch, since those are what was taken.
    ///
    /// The write is conditional on the status read here. If another update
    /// lands first, the order is re-read and the stock effect recomputed.
    #[instrument(skip(self, patch), fields(status = ?patch.status))]
    pub async fn update_order(&self, order_id: Uuid, patch: OrderPatch) -> Result<Order> {
        patch.validate()?;

        let mut attempt = 1;
        loop {
            match self.try_update_order(order_id, patch.clone()).await {
                Err(FulfillmentError::StatusChanged { .. }) if attempt < MAX_UPDATE_ATTEMPTS => {
                    debug!(%order_id, attempt, "Order changed during update, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_update_order(&self, order_id: Uuid, patch: OrderPatch) -> Result<Order> {
        let mut order = self.store.get_order(order_id).await?;
        let previous_status = order.status;
        let held_lines = order.order_lines.clone();

        order.apply(patch);

        let adjustments: Vec<StockAdjustment> = match previous_status.stock_effect(order.status) {
            StockEffect::Restock => demand(&held_lines)
                .into_iter()
                .map(|(inventory_id, quantity)| StockAdjustment::restock(inventory_id, quantity))
                .collect(),
            StockEffect::None => Vec::new(),
        };

        let saved = self
            .store
            .save_order_with_adjustments(&order, previous_status, &adjustments)
            .await?;

        info!(
            %order_id,
            from = %previous_status,
            to = %saved.status,
            restocked = adjustments.len(),
            "Order updated"
        );
        Ok(saved)
    }

    /// Soft delete: the record stays and keeps its stock effect.
    #[instrument(skip(self))]
    pub async fn remove_order(&self, order_id: Uuid) -> Result<()> {
        let deleted = OrderPatch {
            status: Some(OrderStatus::Deleted),
            ..Default::default()
        };
        self.update_order(order_id, deleted).await?;

        info!(%order_id, "Order marked deleted");
        Ok(())
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order> {
        self.store.get_order(order_id).await
    }

    pub async fn list_orders(&self, filter: &OrderFilter, page: Page) -> Result<Vec<Order>> {
        self.store.list_orders(filter, page).await
    }
}
