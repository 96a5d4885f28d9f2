// core/src/store/memory.rs

//! In-process backend with the same isolation guarantees as the Postgres one.
//!
//! A transaction takes per-row async locks (one per product, one per user
//! cart) and keeps them until it commits or is dropped. Writes are buffered in
//! the transaction, visible to its own reads, and applied to the shared tables
//! in one critical section at commit. Dropping a `MemoryTx` is a rollback.
//! A row lock nobody holds or waits for is removed from its table when the
//! transaction ends, so the lock tables only track rows in use.

use super::{Backend, CartStore, Catalog, InventoryStore, OrderLedger, StoreError, StoreResult};
use crate::models::{
  CartEntry, CartLine, NewOrder, NewProduct, Order, OrderDetails, OrderLine, OrderLineDetails, OrderScope, Product,
  ProductSnapshot, ProductStock,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, trace};
use uuid::Uuid;

type RowLocks = Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>;

#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
  tables: Mutex<Tables>,
  product_locks: RowLocks,
  cart_locks: RowLocks,
}

impl Inner {
  fn row_lock(&self, key: LockKey) -> Arc<AsyncMutex<()>> {
    let (map, id) = match key {
      LockKey::Product(id) => (&self.product_locks, id),
      LockKey::Cart(id) => (&self.cart_locks, id),
    };
    map.lock().entry(id).or_default().clone()
  }

  // Runs after the guard is dropped. Holders and waiters keep a clone of the
  // Arc, and clones are only taken under the table mutex.
  fn prune_row_lock(&self, key: LockKey) {
    let (map, id) = match key {
      LockKey::Product(id) => (&self.product_locks, id),
      LockKey::Cart(id) => (&self.cart_locks, id),
    };
    let mut locks = map.lock();
    if locks.get(&id).map_or(false, |l| Arc::strong_count(l) == 1) {
      locks.remove(&id);
    }
  }
}

#[derive(Default)]
struct Tables {
  products: HashMap<Uuid, Product>,
  cart: BTreeMap<(Uuid, Uuid), CartLine>,
  // Commit order; the index doubles as a tie-breaker for equal timestamps.
  orders: Vec<Order>,
  order_lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LockKey {
  Product(Uuid),
  Cart(Uuid),
}

#[derive(Debug)]
enum Write {
  InsertOrder(Order),
  InsertOrderLine(OrderLine),
  DecrementStock { product_id: Uuid, amount: i32 },
  UpsertCartLine(CartLine),
  RemoveCartLine { user_id: Uuid, product_id: Uuid },
  ClearCart(Uuid),
}

/// Transaction handle of [`MemoryStore`].
pub struct MemoryTx {
  inner: Arc<Inner>,
  locks: HashMap<LockKey, OwnedMutexGuard<()>>,
  writes: Vec<Write>,
}

impl MemoryTx {
  fn new(inner: Arc<Inner>) -> Self {
    Self {
      inner,
      locks: HashMap::new(),
      writes: Vec::new(),
    }
  }

  /// Re-entrant: a row already locked by this transaction is not locked again.
  async fn acquire(&mut self, key: LockKey) {
    if self.locks.contains_key(&key) {
      return;
    }
    let row_lock = self.inner.row_lock(key);
    trace!(?key, "Waiting for row lock.");
    let guard = row_lock.lock_owned().await;
    self.locks.insert(key, guard);
  }

  /// The user's cart as this transaction sees it: committed lines with its own
  /// pending cart writes replayed on top.
  fn cart_view(&self, tables: &Tables, user_id: Uuid) -> BTreeMap<Uuid, CartLine> {
    let mut view: BTreeMap<Uuid, CartLine> = tables
      .cart
      .range((user_id, Uuid::nil())..)
      .take_while(|((owner, _), _)| *owner == user_id)
      .map(|((_, product_id), line)| (*product_id, line.clone()))
      .collect();

    for write in &self.writes {
      match write {
        Write::UpsertCartLine(line) if line.user_id == user_id => {
          view.insert(line.product_id, line.clone());
        }
        Write::RemoveCartLine {
          user_id: owner,
          product_id,
        } if *owner == user_id => {
          view.remove(product_id);
        }
        Write::ClearCart(owner) if *owner == user_id => view.clear(),
        _ => {}
      }
    }
    view
  }

  fn stock_view(&self, tables: &Tables, product_id: Uuid) -> Option<ProductStock> {
    let product = tables.products.get(&product_id)?;
    let pending: i32 = self
      .writes
      .iter()
      .filter_map(|w| match w {
        Write::DecrementStock { product_id: id, amount } if *id == product_id => Some(*amount),
        _ => None,
      })
      .sum();
    Some(ProductStock {
      id: product.id,
      price_cents: product.price_cents,
      stock_quantity: product.stock_quantity - pending,
    })
  }

  fn release_locks(&mut self) {
    let keys: Vec<LockKey> = self.locks.keys().copied().collect();
    self.locks.clear();
    for key in keys {
      self.inner.prune_row_lock(key);
    }
  }

  fn has_pending_order(&self, order_id: Uuid) -> bool {
    self
      .writes
      .iter()
      .any(|w| matches!(w, Write::InsertOrder(order) if order.id == order_id))
  }
}

impl Drop for MemoryTx {
  fn drop(&mut self) {
    self.release_locks();
  }
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn apply(tables: &mut Tables, writes: Vec<Write>) -> StoreResult<()> {
    // Validate before touching anything so a failed commit leaves no trace.
    let mut decrements: HashMap<Uuid, i32> = HashMap::new();
    for write in &writes {
      if let Write::DecrementStock { product_id, amount } = write {
        *decrements.entry(*product_id).or_default() += *amount;
      }
    }
    for (product_id, total) in &decrements {
      match tables.products.get(product_id) {
        Some(p) if p.stock_quantity >= *total => {}
        _ => {
          return Err(StoreError::Constraint(format!(
            "stock of product {} cannot be decremented by {}",
            product_id, total
          )))
        }
      }
    }

    let now = Utc::now();
    for write in writes {
      match write {
        Write::InsertOrder(order) => tables.orders.push(order),
        Write::InsertOrderLine(line) => tables.order_lines.push(line),
        Write::DecrementStock { product_id, amount } => {
          if let Some(p) = tables.products.get_mut(&product_id) {
            p.stock_quantity -= amount;
            p.updated_at = now;
          }
        }
        Write::UpsertCartLine(line) => {
          tables.cart.insert((line.user_id, line.product_id), line);
        }
        Write::RemoveCartLine { user_id, product_id } => {
          tables.cart.remove(&(user_id, product_id));
        }
        Write::ClearCart(user_id) => tables.cart.retain(|(owner, _), _| *owner != user_id),
      }
    }
    Ok(())
  }

  fn snapshot(tables: &Tables, product_id: Uuid) -> Option<ProductSnapshot> {
    tables.products.get(&product_id).map(ProductSnapshot::from)
  }
}

#[async_trait]
impl Backend for MemoryStore {
  type Tx = MemoryTx;

  async fn begin(&self) -> StoreResult<Self::Tx> {
    Ok(MemoryTx::new(self.inner.clone()))
  }

  async fn commit(&self, mut tx: Self::Tx) -> StoreResult<()> {
    let writes = std::mem::take(&mut tx.writes);
    let num_writes = writes.len();
    {
      let mut tables = self.inner.tables.lock();
      Self::apply(&mut tables, writes)?;
    }
    // Row locks are released only after the writes are visible.
    drop(tx);
    debug!(num_writes, "Memory transaction committed.");
    Ok(())
  }

  async fn rollback(&self, tx: Self::Tx) -> StoreResult<()> {
    debug!(discarded_writes = tx.writes.len(), "Memory transaction rolled back.");
    drop(tx);
    Ok(())
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn get_cart_lines(&self, tx: &mut Self::Tx, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
    tx.acquire(LockKey::Cart(user_id)).await;
    let tables = self.inner.tables.lock();
    Ok(tx.cart_view(&tables, user_id).into_values().collect())
  }

  async fn clear_cart(&self, tx: &mut Self::Tx, user_id: Uuid) -> StoreResult<u64> {
    tx.acquire(LockKey::Cart(user_id)).await;
    let removed = {
      let tables = self.inner.tables.lock();
      tx.cart_view(&tables, user_id).len() as u64
    };
    tx.writes.push(Write::ClearCart(user_id));
    Ok(removed)
  }

  async fn add_cart_quantity(
    &self,
    tx: &mut Self::Tx,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price_cents: i64,
  ) -> StoreResult<CartLine> {
    tx.acquire(LockKey::Cart(user_id)).await;
    let existing = {
      let tables = self.inner.tables.lock();
      tx.cart_view(&tables, user_id).remove(&product_id)
    };
    let line = match existing {
      Some(mut line) => {
        line.quantity = line
          .quantity
          .checked_add(quantity)
          .ok_or_else(|| StoreError::Constraint(format!("cart quantity overflow for product {}", product_id)))?;
        line
      }
      None => CartLine {
        user_id,
        product_id,
        quantity,
        price_at_add_cents: price_cents,
        added_at: Utc::now(),
      },
    };
    tx.writes.push(Write::UpsertCartLine(line.clone()));
    Ok(line)
  }

  async fn remove_cart_line(&self, tx: &mut Self::Tx, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
    tx.acquire(LockKey::Cart(user_id)).await;
    let present = {
      let tables = self.inner.tables.lock();
      tx.cart_view(&tables, user_id).contains_key(&product_id)
    };
    if present {
      tx.writes.push(Write::RemoveCartLine { user_id, product_id });
    }
    Ok(present)
  }

  async fn cart_entries(&self, user_id: Uuid) -> StoreResult<Vec<CartEntry>> {
    let tables = self.inner.tables.lock();
    Ok(
      tables
        .cart
        .range((user_id, Uuid::nil())..)
        .take_while(|((owner, _), _)| *owner == user_id)
        .map(|(_, line)| CartEntry {
          product: Self::snapshot(&tables, line.product_id),
          line: line.clone(),
        })
        .collect(),
    )
  }
}

#[async_trait]
impl InventoryStore for MemoryStore {
  async fn get_product_for_update(&self, tx: &mut Self::Tx, product_id: Uuid) -> StoreResult<Option<ProductStock>> {
    tx.acquire(LockKey::Product(product_id)).await;
    let tables = self.inner.tables.lock();
    Ok(tx.stock_view(&tables, product_id))
  }

  async fn decrement_stock(&self, tx: &mut Self::Tx, product_id: Uuid, amount: i32) -> StoreResult<()> {
    tx.acquire(LockKey::Product(product_id)).await;
    let available = {
      let tables = self.inner.tables.lock();
      tx.stock_view(&tables, product_id).map(|s| s.stock_quantity)
    };
    match available {
      Some(stock) if amount >= 0 && stock >= amount => {
        tx.writes.push(Write::DecrementStock { product_id, amount });
        Ok(())
      }
      _ => Err(StoreError::Constraint(format!(
        "stock of product {} cannot be decremented by {}",
        product_id, amount
      ))),
    }
  }
}

#[async_trait]
impl OrderLedger for MemoryStore {
  async fn insert_order(&self, tx: &mut Self::Tx, order: &NewOrder) -> StoreResult<Order> {
    let duplicate = tx.has_pending_order(order.id) || self.inner.tables.lock().orders.iter().any(|o| o.id == order.id);
    if duplicate {
      return Err(StoreError::Constraint(format!("order {} already exists", order.id)));
    }
    let created = Order {
      id: order.id,
      user_id: order.user_id,
      status: order.status,
      total_amount_cents: order.total_amount_cents,
      created_at: Utc::now(),
    };
    tx.writes.push(Write::InsertOrder(created.clone()));
    Ok(created)
  }

  async fn insert_order_line(&self, tx: &mut Self::Tx, line: &OrderLine) -> StoreResult<()> {
    if !tx.has_pending_order(line.order_id) {
      return Err(StoreError::Constraint(format!(
        "order line references order {} outside this transaction",
        line.order_id
      )));
    }
    let duplicate = tx
      .writes
      .iter()
      .any(|w| matches!(w, Write::InsertOrderLine(l) if l.order_id == line.order_id && l.product_id == line.product_id));
    if duplicate {
      return Err(StoreError::Constraint(format!(
        "order {} already has a line for product {}",
        line.order_id, line.product_id
      )));
    }
    tx.writes.push(Write::InsertOrderLine(line.clone()));
    Ok(())
  }

  async fn list_orders(&self, scope: OrderScope) -> StoreResult<Vec<OrderDetails>> {
    let tables = self.inner.tables.lock();
    let mut selected: Vec<(usize, &Order)> = tables
      .orders
      .iter()
      .enumerate()
      .filter(|(_, o)| match scope {
        OrderScope::User(user_id) => o.user_id == user_id,
        OrderScope::All => true,
      })
      .collect();
    selected.sort_by(|(seq_a, a), (seq_b, b)| b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a)));

    let mut lines_by_order: HashMap<Uuid, Vec<OrderLineDetails>> = HashMap::new();
    for line in &tables.order_lines {
      lines_by_order.entry(line.order_id).or_default().push(OrderLineDetails {
        product: Self::snapshot(&tables, line.product_id),
        line: line.clone(),
      });
    }

    Ok(
      selected
        .into_iter()
        .map(|(_, order)| {
          let mut lines = lines_by_order.remove(&order.id).unwrap_or_default();
          lines.sort_by_key(|l| l.line.product_id);
          OrderDetails {
            order: order.clone(),
            lines,
          }
        })
        .collect(),
    )
  }
}

#[async_trait]
impl Catalog for MemoryStore {
  async fn insert_product(&self, product: NewProduct) -> StoreResult<Product> {
    if product.stock_quantity < 0 || product.price_cents < 0 {
      return Err(StoreError::Constraint("price and stock must not be negative".to_string()));
    }
    let now = Utc::now();
    let created = Product {
      id: Uuid::new_v4(),
      name: product.name,
      description: product.description,
      category_id: product.category_id,
      price_cents: product.price_cents,
      stock_quantity: product.stock_quantity,
      created_at: now,
      updated_at: now,
    };
    self.inner.tables.lock().products.insert(created.id, created.clone());
    Ok(created)
  }

  async fn get_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
    Ok(self.inner.tables.lock().products.get(&product_id).cloned())
  }

  async fn set_product_price(&self, product_id: Uuid, price_cents: i64) -> StoreResult<bool> {
    let mut tables = self.inner.tables.lock();
    match tables.products.get_mut(&product_id) {
      Some(p) => {
        p.price_cents = price_cents;
        p.updated_at = Utc::now();
        Ok(true)
      }
      None => Ok(false),
    }
  }
}

impl MemoryStore {
  /// Removes a product from the catalog. Cart and order lines that point at
  /// it are left alone, like the soft references of the SQL schema.
  pub fn remove_product(&self, product_id: Uuid) -> bool {
    self.inner.tables.lock().products.remove(&product_id).is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  impl MemoryStore {
    fn tracked_row_locks(&self) -> usize {
      self.inner.product_locks.lock().len() + self.inner.cart_locks.lock().len()
    }
  }

  async fn store_with_product(stock: i32) -> (MemoryStore, Product) {
    let store = MemoryStore::new();
    let product = store.insert_product(NewProduct::new("A", 1000, stock)).await.unwrap();
    (store, product)
  }

  #[tokio::test]
  async fn row_locks_are_forgotten_when_transactions_end() {
    let (store, product) = store_with_product(5).await;
    let user = Uuid::new_v4();

    let mut tx = store.begin().await.unwrap();
    store.get_cart_lines(&mut tx, user).await.unwrap();
    store.get_product_for_update(&mut tx, product.id).await.unwrap();
    assert_eq!(store.tracked_row_locks(), 2);
    store.commit(tx).await.unwrap();
    assert_eq!(store.tracked_row_locks(), 0);

    let mut tx = store.begin().await.unwrap();
    store.get_product_for_update(&mut tx, product.id).await.unwrap();
    store.rollback(tx).await.unwrap();
    assert_eq!(store.tracked_row_locks(), 0);

    let mut tx = store.begin().await.unwrap();
    store.get_product_for_update(&mut tx, product.id).await.unwrap();
    drop(tx);
    assert_eq!(store.tracked_row_locks(), 0);
  }

  #[tokio::test]
  async fn failed_commit_still_releases_row_locks() {
    let (store, product) = store_with_product(1).await;

    let mut tx = store.begin().await.unwrap();
    store.get_product_for_update(&mut tx, product.id).await.unwrap();
    store.decrement_stock(&mut tx, product.id, 1).await.unwrap();
    // Another writer drains the stock behind the transaction's back.
    store.inner.tables.lock().products.get_mut(&product.id).unwrap().stock_quantity = 0;

    assert!(matches!(store.commit(tx).await, Err(StoreError::Constraint(_))));
    assert_eq!(store.tracked_row_locks(), 0);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn waiting_transaction_keeps_the_row_lock_alive() {
    let (store, product) = store_with_product(5).await;

    let mut first = store.begin().await.unwrap();
    store.get_product_for_update(&mut first, product.id).await.unwrap();

    let waiter_store = store.clone();
    let product_id = product.id;
    let waiter = tokio::spawn(async move {
      let mut tx = waiter_store.begin().await.unwrap();
      let seen = waiter_store.get_product_for_update(&mut tx, product_id).await.unwrap();
      waiter_store.commit(tx).await.unwrap();
      seen
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    store.decrement_stock(&mut first, product.id, 2).await.unwrap();
    store.commit(first).await.unwrap();

    let seen = waiter.await.unwrap().expect("product exists");
    assert_eq!(seen.stock_quantity, 3);
    assert_eq!(store.tracked_row_locks(), 0);
  }
}
