// server/src/state.rs
use crate::config::AppConfig;
use cartflow::{CartService, OrderService, Store};
use std::sync::Arc;

pub struct AppState<S: Store> {
  pub orders: Arc<OrderService<S>>,
  pub carts: Arc<CartService<S>>,
  pub config: Arc<AppConfig>,
}

impl<S: Store> AppState<S> {
  pub fn new(store: Arc<S>, config: Arc<AppConfig>) -> Self {
    Self {
      orders: Arc::new(OrderService::new(store.clone())),
      carts: Arc::new(CartService::new(store)),
      config,
    }
  }
}

// Manual impl: `S` itself need not be `Clone`.
impl<S: Store> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      orders: self.orders.clone(),
      carts: self.carts.clone(),
      config: self.config.clone(),
    }
  }
}
