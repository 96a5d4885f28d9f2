// core/src/store/postgres.rs

//! PostgreSQL backend.
//!
//! Stock is protected by `SELECT … FOR UPDATE` on the product row, a user's
//! cart by a transaction-scoped advisory lock keyed on the user id. Both are
//! released by commit or rollback only.

use super::{Backend, CartStore, Catalog, InventoryStore, OrderLedger, StoreError, StoreResult};
use crate::models::{
  CartEntry, CartLine, NewOrder, NewProduct, Order, OrderDetails, OrderLine, OrderLineDetails, OrderScope, Product,
  ProductSnapshot, ProductStock,
};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const CART_COLUMNS: &str = "user_id, product_id, quantity, price_at_add_cents, added_at";
const ORDER_COLUMNS: &str = "id, user_id, status, total_amount_cents, created_at";
const PRODUCT_COLUMNS: &str =
  "id, name, description, category_id, price_cents, stock_quantity, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  #[instrument(name = "PgStore::connect", skip(database_url), err(Display))]
  pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    info!("Connected to PostgreSQL.");
    Ok(Self::new(pool))
  }

  /// Applies the embedded schema migrations.
  pub async fn migrate(&self) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  async fn lock_cart(tx: &mut Transaction<'static, Postgres>, user_id: Uuid) -> StoreResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
      .bind(user_id)
      .execute(&mut **tx)
      .await?;
    Ok(())
  }
}

#[derive(FromRow)]
struct CartEntryRow {
  #[sqlx(flatten)]
  line: CartLine,
  product_name: Option<String>,
  product_price_cents: Option<i64>,
}

#[derive(FromRow)]
struct OrderLineRow {
  #[sqlx(flatten)]
  line: OrderLine,
  product_name: Option<String>,
  product_price_cents: Option<i64>,
}

fn snapshot(product_id: Uuid, name: Option<String>, price_cents: Option<i64>) -> Option<ProductSnapshot> {
  match (name, price_cents) {
    (Some(name), Some(price_cents)) => Some(ProductSnapshot {
      id: product_id,
      name,
      price_cents,
    }),
    _ => None,
  }
}

#[async_trait]
impl Backend for PgStore {
  type Tx = Transaction<'static, Postgres>;

  async fn begin(&self) -> StoreResult<Self::Tx> {
    Ok(self.pool.begin().await?)
  }

  async fn commit(&self, tx: Self::Tx) -> StoreResult<()> {
    tx.commit().await?;
    Ok(())
  }

  async fn rollback(&self, tx: Self::Tx) -> StoreResult<()> {
    tx.rollback().await?;
    Ok(())
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn get_cart_lines(&self, tx: &mut Self::Tx, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
    Self::lock_cart(tx, user_id).await?;
    let lines = sqlx::query_as::<_, CartLine>(&format!(
      "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY product_id FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await?;
    debug!(%user_id, lines = lines.len(), "Cart lines loaded under lock.");
    Ok(lines)
  }

  async fn clear_cart(&self, tx: &mut Self::Tx, user_id: Uuid) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(user_id)
      .execute(&mut **tx)
      .await?;
    Ok(result.rows_affected())
  }

  async fn add_cart_quantity(
    &self,
    tx: &mut Self::Tx,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price_cents: i64,
  ) -> StoreResult<CartLine> {
    Self::lock_cart(tx, user_id).await?;
    let line = sqlx::query_as::<_, CartLine>(&format!(
      "INSERT INTO cart_items (user_id, product_id, quantity, price_at_add_cents)
       VALUES ($1, $2, $3, $4)
       ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
       RETURNING {CART_COLUMNS}"
    ))
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .bind(price_cents)
    .fetch_one(&mut **tx)
    .await?;
    Ok(line)
  }

  async fn remove_cart_line(&self, tx: &mut Self::Tx, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
    Self::lock_cart(tx, user_id).await?;
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
      .bind(user_id)
      .bind(product_id)
      .execute(&mut **tx)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn cart_entries(&self, user_id: Uuid) -> StoreResult<Vec<CartEntry>> {
    let rows = sqlx::query_as::<_, CartEntryRow>(
      "SELECT c.user_id, c.product_id, c.quantity, c.price_at_add_cents, c.added_at,
              p.name AS product_name, p.price_cents AS product_price_cents
       FROM cart_items c
       LEFT JOIN products p ON p.id = c.product_id
       WHERE c.user_id = $1
       ORDER BY c.product_id",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|row| CartEntry {
          product: snapshot(row.line.product_id, row.product_name, row.product_price_cents),
          line: row.line,
        })
        .collect(),
    )
  }
}

#[async_trait]
impl InventoryStore for PgStore {
  async fn get_product_for_update(&self, tx: &mut Self::Tx, product_id: Uuid) -> StoreResult<Option<ProductStock>> {
    let stock =
      sqlx::query_as::<_, ProductStock>("SELECT id, price_cents, stock_quantity FROM products WHERE id = $1 FOR UPDATE")
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(stock)
  }

  async fn decrement_stock(&self, tx: &mut Self::Tx, product_id: Uuid, amount: i32) -> StoreResult<()> {
    let result = sqlx::query(
      "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW()
       WHERE id = $1 AND stock_quantity >= $2",
    )
    .bind(product_id)
    .bind(amount)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() != 1 {
      return Err(StoreError::Constraint(format!(
        "stock of product {} cannot be decremented by {}",
        product_id, amount
      )));
    }
    Ok(())
  }
}

#[async_trait]
impl OrderLedger for PgStore {
  async fn insert_order(&self, tx: &mut Self::Tx, order: &NewOrder) -> StoreResult<Order> {
    let created = sqlx::query_as::<_, Order>(&format!(
      "INSERT INTO orders (id, user_id, status, total_amount_cents)
       VALUES ($1, $2, $3, $4)
       RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.status)
    .bind(order.total_amount_cents)
    .fetch_one(&mut **tx)
    .await?;
    Ok(created)
  }

  async fn insert_order_line(&self, tx: &mut Self::Tx, line: &OrderLine) -> StoreResult<()> {
    sqlx::query("INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents) VALUES ($1, $2, $3, $4)")
      .bind(line.order_id)
      .bind(line.product_id)
      .bind(line.quantity)
      .bind(line.unit_price_cents)
      .execute(&mut **tx)
      .await?;
    Ok(())
  }

  #[instrument(name = "PgStore::list_orders", skip(self), err(Display))]
  async fn list_orders(&self, scope: OrderScope) -> StoreResult<Vec<OrderDetails>> {
    let orders = match scope {
      OrderScope::User(user_id) => {
        sqlx::query_as::<_, Order>(&format!(
          "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
      }
      OrderScope::All => {
        sqlx::query_as::<_, Order>(&format!(
          "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?
      }
    };
    if orders.is_empty() {
      return Ok(Vec::new());
    }

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let rows = sqlx::query_as::<_, OrderLineRow>(
      "SELECT oi.order_id, oi.product_id, oi.quantity, oi.unit_price_cents,
              p.name AS product_name, p.price_cents AS product_price_cents
       FROM order_items oi
       LEFT JOIN products p ON p.id = oi.product_id
       WHERE oi.order_id = ANY($1)
       ORDER BY oi.order_id, oi.product_id",
    )
    .bind(order_ids.as_slice())
    .fetch_all(&self.pool)
    .await?;

    let mut lines_by_order: HashMap<Uuid, Vec<OrderLineDetails>> = HashMap::new();
    for row in rows {
      lines_by_order.entry(row.line.order_id).or_default().push(OrderLineDetails {
        product: snapshot(row.line.product_id, row.product_name, row.product_price_cents),
        line: row.line,
      });
    }

    Ok(
      orders
        .into_iter()
        .map(|order| OrderDetails {
          lines: lines_by_order.remove(&order.id).unwrap_or_default(),
          order,
        })
        .collect(),
    )
  }
}

#[async_trait]
impl Catalog for PgStore {
  async fn insert_product(&self, product: NewProduct) -> StoreResult<Product> {
    let created = sqlx::query_as::<_, Product>(&format!(
      "INSERT INTO products (id, name, description, category_id, price_cents, stock_quantity)
       VALUES ($1, $2, $3, $4, $5, $6)
       RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(product.name)
    .bind(product.description)
    .bind(product.category_id)
    .bind(product.price_cents)
    .bind(product.stock_quantity)
    .fetch_one(&self.pool)
    .await?;
    Ok(created)
  }

  async fn get_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  async fn set_product_price(&self, product_id: Uuid, price_cents: i64) -> StoreResult<bool> {
    let result = sqlx::query("UPDATE products SET price_cents = $2, updated_at = NOW() WHERE id = $1")
      .bind(product_id)
      .bind(price_cents)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}
