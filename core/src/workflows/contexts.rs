// core/src/workflows/contexts.rs

//! Context data the workflow pipelines operate on.
//! Handlers receive these wrapped in `ContextData`.

use crate::models::{CartLine, Order, OrderLine, Product};
use crate::store::Store;
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// Holds the open transaction of a run between steps.
///
/// A step takes the handle out, passes it explicitly to every storage call and
/// puts it back before reporting its outcome, so whatever fails, the service
/// finds the handle here and rolls it back.
pub struct TxSlot<T>(Mutex<Option<T>>);

impl<T> TxSlot<T> {
  pub fn empty() -> Self {
    TxSlot(Mutex::new(None))
  }

  pub fn put(&self, tx: T) {
    *self.0.lock() = Some(tx);
  }

  pub fn take(&self) -> Option<T> {
    self.0.lock().take()
  }
}

pub struct CreateOrderCtxData<S: Store> {
  pub store: Arc<S>,
  pub user_id: Uuid,
  pub tx: TxSlot<S::Tx>,
  pub cart_lines: Vec<CartLine>,
  pub total_amount_cents: i64,
  pub order: Option<Order>,
  pub order_lines: Vec<OrderLine>,
  pub cleared_cart_lines: u64,
  pub committed: bool,
}

impl<S: Store> CreateOrderCtxData<S> {
  pub fn new(store: Arc<S>, user_id: Uuid) -> Self {
    Self {
      store,
      user_id,
      tx: TxSlot::empty(),
      cart_lines: Vec::new(),
      total_amount_cents: 0,
      order: None,
      order_lines: Vec::new(),
      cleared_cart_lines: 0,
      committed: false,
    }
  }
}

pub struct AddToCartCtxData<S: Store> {
  pub store: Arc<S>,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub product: Option<Product>,
  pub updated_cart_line: Option<CartLine>,
}

impl<S: Store> AddToCartCtxData<S> {
  pub fn new(store: Arc<S>, user_id: Uuid, product_id: Uuid, quantity: i32) -> Self {
    Self {
      store,
      user_id,
      product_id,
      quantity,
      product: None,
      updated_cart_line: None,
    }
  }
}
