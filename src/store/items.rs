//! Inventory item persistence

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::postgres::{map_constraint_error, StoreError};

/// Persisted inventory item
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// New item for insertion
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
}

/// Full-replacement update for an existing item
#[derive(Debug, Clone)]
pub struct ItemChanges {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
}

/// Item store operations
///
/// The `name` column carries a unique constraint; `create` and `update`
/// surface a violation as [`StoreError::Conflict`]. The pre-write existence
/// check in the handlers is only a fast path for a better error message -
/// the constraint is the true enforcement under concurrent writers.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn create(&self, item: NewItem) -> Result<Item, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Item>, StoreError>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Item>, StoreError>;

    /// Replace an item's fields, refreshing `updated_at`.
    /// Fails with [`StoreError::NotFound`] if the id is absent.
    async fn update(&self, id: i64, changes: ItemChanges) -> Result<Item, StoreError>;

    /// Fails with [`StoreError::NotFound`] if the id is absent.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    async fn list_all(&self) -> Result<Vec<Item>, StoreError>;
}

/// PostgreSQL-backed item store
#[derive(Clone)]
pub struct PgItemStore {
    pool: PgPool,
}

impl PgItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn create(&self, item: NewItem) -> Result<Item, StoreError> {
        sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (name, description, quantity, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, quantity, price, created_at, updated_at
            "#,
        )
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "item"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Item>, StoreError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, quantity, price, created_at, updated_at
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Item>, StoreError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, quantity, price, created_at, updated_at
            FROM items
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn update(&self, id: i64, changes: ItemChanges) -> Result<Item, StoreError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET name = $2, description = $3, quantity = $4, price = $5, updated_at = now()
            WHERE id = $1
            RETURNING id, name, description, quantity, price, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.quantity)
        .bind(changes.price)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "item"))?;

        item.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Item>, StoreError> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, quantity, price, created_at, updated_at
            FROM items
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
