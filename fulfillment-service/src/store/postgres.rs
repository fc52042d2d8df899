use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use shared::*;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::RecordStore;
use crate::models::*;
use crate::schema::*;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

type PooledConnection<'a> = bb8::PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;

pub fn run_migrations(database_url: &str) -> anyhow::Result<()> {
    info!("Running database migrations...");
    let mut conn = PgConnection::establish(database_url)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!("Migration error: {}", e))?;
    info!(applied = applied.len(), "Migrations completed successfully");
    Ok(())
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_size: u32) -> anyhow::Result<Self> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = bb8::Pool::builder().max_size(max_size).build(manager).await?;
        info!(max_size, "Database connection pool created");
        Ok(Self::new(pool))
    }

    async fn conn(&self) -> Result<PooledConnection<'_>> {
        self.pool
            .get()
            .await
            .map_err(|e| FulfillmentError::Unavailable(e.to_string()))
    }
}

/// Applies each adjustment as `quantity = quantity + delta`, guarded by
/// `quantity >= required`. Must run inside the caller's transaction.
async fn apply_adjustments(
    conn: &mut AsyncPgConnection,
    adjustments: &[StockAdjustment],
) -> Result<()> {
    let now = Utc::now();

    for adjustment in adjustments {
        let updated = diesel::update(
            inventories::table
                .filter(inventories::id.eq(adjustment.inventory_id))
                .filter(inventories::quantity.ge(adjustment.required_quantity())),
        )
        .set((
            inventories::quantity.eq(inventories::quantity + adjustment.delta),
            inventories::updated_at.eq(now),
        ))
        .execute(conn)
        .await?;

        if updated == 0 {
            let exists = inventories::table
                .find(adjustment.inventory_id)
                .select(inventories::id)
                .first::<Uuid>(conn)
                .await
                .optional()?;

            match exists {
                Some(_) => {
                    return Err(FulfillmentError::InsufficientInventory {
                        inventory_id: adjustment.inventory_id,
                    })
                }
                None if adjustment.delta > 0 => {
                    warn!(
                        inventory_id = %adjustment.inventory_id,
                        quantity = adjustment.delta,
                        "Skipping restock of deleted inventory"
                    );
                    continue;
                }
                None => return Err(FulfillmentError::NotFound(Entity::Inventory)),
            }
        }

        debug!(
            inventory_id = %adjustment.inventory_id,
            delta = adjustment.delta,
            "Inventory quantity adjusted"
        );
    }

    Ok(())
}

#[async_trait]
impl RecordStore for PgStore {
    #[instrument(skip(self))]
    async fn get_inventory(&self, id: Uuid) -> Result<Inventory> {
        let mut conn = self.conn().await?;

        let row = inventories::table
            .find(id)
            .select(InventoryRow::as_select())
            .first::<InventoryRow>(&mut *conn)
            .await
            .optional()?
            .ok_or(FulfillmentError::NotFound(Entity::Inventory))?;

        Inventory::try_from(row)
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn create_inventory(&self, draft: InventoryDraft) -> Result<Inventory> {
        draft.validate()?;
        let new_row = NewInventoryRow::from_draft(Uuid::new_v4(), draft)?;
        let mut conn = self.conn().await?;

        let row = diesel::insert_into(inventories::table)
            .values(&new_row)
            .returning(InventoryRow::as_returning())
            .get_result::<InventoryRow>(&mut *conn)
            .await?;

        Inventory::try_from(row)
    }

    #[instrument(skip(self, patch))]
    async fn update_inventory(&self, id: Uuid, patch: InventoryPatch) -> Result<Inventory> {
        patch.validate()?;
        let changes = InventoryChanges::try_from(patch)?;
        let mut conn = self.conn().await?;

        let row = diesel::update(inventories::table.find(id))
            .set(&changes)
            .returning(InventoryRow::as_returning())
            .get_result::<InventoryRow>(&mut *conn)
            .await
            .optional()?
            .ok_or(FulfillmentError::NotFound(Entity::Inventory))?;

        Inventory::try_from(row)
    }

    #[instrument(skip(self))]
    async fn delete_inventory(&self, id: Uuid) -> Result<()> {
        let mut conn = self.conn().await?;

        let deleted = diesel::delete(inventories::table.find(id))
            .execute(&mut *conn)
            .await?;

        if deleted == 0 {
            return Err(FulfillmentError::NotFound(Entity::Inventory));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_inventories(&self, filter: &InventoryFilter, page: Page) -> Result<Vec<Inventory>> {
        let mut query = inventories::table
            .select(InventoryRow::as_select())
            .into_boxed();

        if let Some(name) = &filter.name {
            query = query.filter(inventories::name.eq(name.clone()));
        }
        if let Some(description) = &filter.description {
            query = query.filter(inventories::description.eq(description.clone()));
        }
        if let Some(price) = filter.price {
            query = query.filter(inventories::price.eq(price_to_numeric(price)?));
        }
        if let Some(quantity) = filter.quantity {
            query = query.filter(inventories::quantity.eq(quantity));
        }

        let mut conn = self.conn().await?;
        let rows = query
            .order((inventories::created_at.desc(), inventories::id.desc()))
            .offset(page.offset())
            .limit(page.limit())
            .load::<InventoryRow>(&mut *conn)
            .await?;

        rows.into_iter().map(Inventory::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn get_order(&self, id: Uuid) -> Result<Order> {
        let mut conn = self.conn().await?;

        let row = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first::<OrderRow>(&mut *conn)
            .await
            .optional()?
            .ok_or(FulfillmentError::NotFound(Entity::Order))?;

        Order::try_from(row)
    }

    #[instrument(skip(self, order), fields(id = %order.id, status = %order.status))]
    async fn save_order(&self, order: &Order) -> Result<Order> {
        order.validate()?;
        let changes = OrderChanges::try_from(order)?;
        let mut conn = self.conn().await?;

        let row = diesel::update(orders::table.find(order.id))
            .set(&changes)
            .returning(OrderRow::as_returning())
            .get_result::<OrderRow>(&mut *conn)
            .await
            .optional()?
            .ok_or(FulfillmentError::NotFound(Entity::Order))?;

        Order::try_from(row)
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, filter: &OrderFilter, page: Page) -> Result<Vec<Order>> {
        let mut query = orders::table.select(OrderRow::as_select()).into_boxed();

        if let Some(email) = &filter.email {
            query = query.filter(orders::email.eq(email.clone()));
        }
        if let Some(status) = filter.status {
            query = query.filter(orders::status.eq(status.to_string()));
        }

        let mut conn = self.conn().await?;
        let rows = query
            .order((orders::created_at.desc(), orders::id.desc()))
            .offset(page.offset())
            .limit(page.limit())
            .load::<OrderRow>(&mut *conn)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    #[instrument(skip(self, draft, adjustments), fields(lines = draft.order_lines.len()))]
    async fn create_order_with_adjustments(
        &self,
        draft: OrderDraft,
        adjustments: &[StockAdjustment],
    ) -> Result<Order> {
        draft.validate()?;
        let new_order = NewOrderRow::from_draft(Uuid::new_v4(), &draft)?;
        let adjustments = adjustments.to_vec();
        let mut conn = self.conn().await?;

        let row = conn
            .transaction::<_, FulfillmentError, _>(|conn| {
                Box::pin(async move {
                    let row = diesel::insert_into(orders::table)
                        .values(&new_order)
                        .returning(OrderRow::as_returning())
                        .get_result::<OrderRow>(conn)
                        .await?;

                    apply_adjustments(conn, &adjustments).await?;

                    Ok(row)
                })
            })
            .await?;

        Order::try_from(row)
    }

    #[instrument(skip(self, order, adjustments), fields(id = %order.id, from = %expected, to = %order.status))]
    async fn save_order_with_adjustments(
        &self,
        order: &Order,
        expected: OrderStatus,
        adjustments: &[StockAdjustment],
    ) -> Result<Order> {
        order.validate()?;
        let order_id = order.id;
        let changes = OrderChanges::try_from(order)?;
        let adjustments = adjustments.to_vec();
        let mut conn = self.conn().await?;

        let row = conn
            .transaction::<_, FulfillmentError, _>(|conn| {
                Box::pin(async move {
                    let updated = diesel::update(
                        orders::table
                            .filter(orders::id.eq(order_id))
                            .filter(orders::status.eq(expected.to_string())),
                    )
                    .set(&changes)
                    .returning(OrderRow::as_returning())
                    .get_result::<OrderRow>(conn)
                    .await
                    .optional()?;

                    let row = match updated {
                        Some(row) => row,
                        None => {
                            let exists = orders::table
                                .find(order_id)
                                .select(orders::id)
                                .first::<Uuid>(conn)
                                .await
                                .optional()?;
                            return Err(match exists {
                                Some(_) => FulfillmentError::StatusChanged { order_id },
                                None => FulfillmentError::NotFound(Entity::Order),
                            });
                        }
                    };

                    apply_adjustments(conn, &adjustments).await?;

                    Ok(row)
                })
            })
            .await?;

        Order::try_from(row)
    }
}
