// core/src/store/mod.rs

//! Storage seams of the cart, inventory and order ledger.
//!
//! Every operation the order workflow performs takes the transaction handle
//! explicitly. Dropping a handle without committing rolls it back, so an
//! early return can never leave half of a workflow behind.

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{
  CartEntry, CartLine, NewOrder, NewProduct, Order, OrderDetails, OrderLine, OrderScope, Product, ProductStock,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Transaction lifecycle of a backend.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
  type Tx: Send + 'static;

  async fn begin(&self) -> StoreResult<Self::Tx>;
  async fn commit(&self, tx: Self::Tx) -> StoreResult<()>;
  async fn rollback(&self, tx: Self::Tx) -> StoreResult<()>;
}

#[async_trait]
pub trait CartStore: Backend {
  /// Locks the user's cart for the rest of `tx` and returns its lines
  /// ordered by product id.
  async fn get_cart_lines(&self, tx: &mut Self::Tx, user_id: Uuid) -> StoreResult<Vec<CartLine>>;

  /// Deletes every line of the user's cart. Returns the number of lines removed.
  async fn clear_cart(&self, tx: &mut Self::Tx, user_id: Uuid) -> StoreResult<u64>;

  /// Adds `quantity` to the (user, product) line, creating it with
  /// `price_cents` as its price-at-add when absent. An existing line keeps
  /// its original price-at-add.
  async fn add_cart_quantity(
    &self,
    tx: &mut Self::Tx,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price_cents: i64,
  ) -> StoreResult<CartLine>;

  /// Returns false when there was no such line.
  async fn remove_cart_line(&self, tx: &mut Self::Tx, user_id: Uuid, product_id: Uuid) -> StoreResult<bool>;

  /// Committed cart lines joined with their products in one fetch.
  async fn cart_entries(&self, user_id: Uuid) -> StoreResult<Vec<CartEntry>>;
}

#[async_trait]
pub trait InventoryStore: Backend {
  /// Reads price and stock, holding the product's row lock until `tx` ends.
  async fn get_product_for_update(&self, tx: &mut Self::Tx, product_id: Uuid) -> StoreResult<Option<ProductStock>>;

  /// Fails with `StoreError::Constraint` if stock would go negative or the
  /// product is gone.
  async fn decrement_stock(&self, tx: &mut Self::Tx, product_id: Uuid, amount: i32) -> StoreResult<()>;
}

#[async_trait]
pub trait OrderLedger: Backend {
  async fn insert_order(&self, tx: &mut Self::Tx, order: &NewOrder) -> StoreResult<Order>;
  async fn insert_order_line(&self, tx: &mut Self::Tx, line: &OrderLine) -> StoreResult<()>;

  /// Newest first, lines and product snapshots fetched in one batch.
  async fn list_orders(&self, scope: OrderScope) -> StoreResult<Vec<OrderDetails>>;
}

/// The slice of product management this crate needs. Full CRUD belongs to
/// the catalog service.
#[async_trait]
pub trait Catalog: Send + Sync + 'static {
  async fn insert_product(&self, product: NewProduct) -> StoreResult<Product>;
  async fn get_product(&self, product_id: Uuid) -> StoreResult<Option<Product>>;

  /// Returns false when the product does not exist.
  async fn set_product_price(&self, product_id: Uuid, price_cents: i64) -> StoreResult<bool>;
}

/// Everything the services need from one backend.
pub trait Store: CartStore + InventoryStore + OrderLedger + Catalog {}

impl<T> Store for T where T: CartStore + InventoryStore + OrderLedger + Catalog {}
