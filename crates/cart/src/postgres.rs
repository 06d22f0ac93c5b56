//! PostgreSQL-backed cart storage.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::Result;
use crate::item::{CartItem, CartItemDraft, ItemKind};
use crate::storage::CartStorage;

/// PostgreSQL-backed cart storage.
///
/// One row per line item, keyed by `(cart_id, identifier)` and read back in
/// `position` order. Saves replace the whole entry list inside a single
/// transaction so concurrent readers never observe a partial cart.
#[derive(Clone)]
pub struct PostgresCartStorage {
    pool: PgPool,
    cart_id: Uuid,
}

impl PostgresCartStorage {
    /// Creates storage for one cart within the shared table.
    pub fn new(pool: PgPool, cart_id: Uuid) -> Self {
        Self { pool, cart_id }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns the cart this storage reads and writes.
    pub fn cart_id(&self) -> Uuid {
        self.cart_id
    }

    /// Creates the cart schema if it does not exist yet.
    pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
        sqlx::raw_sql(include_str!(
            "../../../migrations/001_create_cart_items_table.sql"
        ))
        .execute(pool)
        .await?;
        Ok(())
    }

    fn row_to_draft(row: &PgRow) -> std::result::Result<CartItemDraft, sqlx::Error> {
        let kind: String = row.try_get("kind")?;
        let unit_price_cents: Option<i64> = row.try_get("unit_price_cents")?;
        let quantity: i64 = row.try_get("quantity")?;

        Ok(CartItemDraft {
            id: row.try_get("identifier")?,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            unit_price: unit_price_cents.map(|cents| cents as f64 / 100.0),
            currency: Some(row.try_get("currency")?),
            brand: row.try_get("brand")?,
            cover_image: row.try_get("cover_image")?,
            quantity: Some(quantity as f64),
            kind: ItemKind::parse(&kind),
        })
    }
}

#[async_trait]
impl CartStorage for PostgresCartStorage {
    async fn load(&self) -> Result<Vec<CartItemDraft>> {
        let rows = sqlx::query(
            r#"
            SELECT identifier, title, slug, unit_price_cents, currency, brand,
                   cover_image, quantity, kind
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(self.cart_id)
        .fetch_all(&self.pool)
        .await?;

        let drafts = rows
            .iter()
            .map(Self::row_to_draft)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(drafts)
    }

    async fn save(&self, items: &[CartItem]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(self.cart_id)
            .execute(&mut *tx)
            .await?;

        for (position, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items
                    (cart_id, position, identifier, title, slug, unit_price_cents,
                     currency, brand, cover_image, quantity, kind)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(self.cart_id)
            .bind(position as i64)
            .bind(item.id.as_str())
            .bind(&item.title)
            .bind(&item.slug)
            .bind(item.unit_price.map(|p| p.cents()))
            .bind(item.currency.as_str())
            .bind(&item.brand)
            .bind(&item.cover_image)
            .bind(item.quantity as i64)
            .bind(item.kind.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
