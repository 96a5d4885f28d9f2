// core/src/workflows/service.rs

use crate::error::{OrderError, Result};
use crate::models::{CartEntry, CartLine, Order, OrderDetails, Requester};
use crate::pipeline::{ContextData, Pipeline, PipelineResult};
use crate::store::Store;
use crate::workflows::add_to_cart::build_add_to_cart_pipeline;
use crate::workflows::contexts::{AddToCartCtxData, CreateOrderCtxData};
use crate::workflows::create_order::build_create_order_pipeline;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Order creation and listing over one store.
pub struct OrderService<S: Store> {
  store: Arc<S>,
  create_order: Pipeline<CreateOrderCtxData<S>, OrderError>,
}

impl<S: Store> OrderService<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      create_order: build_create_order_pipeline(),
    }
  }

  /// Turns the user's whole cart into one pending order.
  ///
  /// Either every write lands (order, lines, stock, emptied cart) or none
  /// does. Storage failures come back as [`OrderError::Storage`] and are never
  /// retried here.
  #[instrument(name = "OrderService::create_order", skip(self))]
  pub async fn create_order(&self, user_id: Uuid) -> Result<Order> {
    self.place_order(user_id).await.inspect_err(log_failure)
  }

  async fn place_order(&self, user_id: Uuid) -> Result<Order> {
    let ctx_data = ContextData::new(CreateOrderCtxData::new(self.store.clone(), user_id));
    let outcome = self.create_order.run(ctx_data.clone()).await;

    let open_tx = { ctx_data.read().tx.take() };
    if let Some(tx) = open_tx {
      match self.store.rollback(tx).await {
        Ok(()) => debug!("Order transaction rolled back."),
        // The backend discards the transaction anyway once the handle is gone.
        Err(e) => error!(error = %e, "Rollback of order transaction failed."),
      }
    }

    if outcome? == PipelineResult::Stopped {
      return Err(OrderError::Internal("order pipeline stopped before commit".to_string()));
    }

    let guard = ctx_data.read();
    match (&guard.order, guard.committed) {
      (Some(order), true) => Ok(order.clone()),
      _ => Err(OrderError::Internal("order pipeline completed without a committed order".to_string())),
    }
  }

  /// The requester's orders, or everybody's for an admin. Newest first.
  #[instrument(name = "OrderService::list_orders", skip(self))]
  pub async fn list_orders(&self, requester: &Requester) -> Result<Vec<OrderDetails>> {
    let orders = self
      .store
      .list_orders(requester.order_scope())
      .await
      .map_err(OrderError::from)
      .inspect_err(log_failure)?;
    debug!(num_orders = orders.len(), "Orders listed.");
    Ok(orders)
  }
}

pub struct CartService<S: Store> {
  store: Arc<S>,
  add_to_cart: Pipeline<AddToCartCtxData<S>, OrderError>,
}

impl<S: Store> CartService<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      add_to_cart: build_add_to_cart_pipeline(),
    }
  }

  /// Adds `quantity` of a product to the cart. A product already in the cart
  /// keeps the price it was first added at.
  #[instrument(name = "CartService::add_to_cart", skip(self))]
  pub async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartLine> {
    self
      .add_line(user_id, product_id, quantity)
      .await
      .inspect_err(log_failure)
  }

  async fn add_line(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartLine> {
    let ctx_data = ContextData::new(AddToCartCtxData::new(self.store.clone(), user_id, product_id, quantity));
    if self.add_to_cart.run(ctx_data.clone()).await? == PipelineResult::Stopped {
      return Err(OrderError::Internal("add to cart pipeline stopped early".to_string()));
    }

    let line = { ctx_data.write().updated_cart_line.take() };
    line.ok_or_else(|| OrderError::Internal("add to cart pipeline produced no cart line".to_string()))
  }

  #[instrument(name = "CartService::get_cart", skip(self))]
  pub async fn get_cart(&self, user_id: Uuid) -> Result<Vec<CartEntry>> {
    self
      .store
      .cart_entries(user_id)
      .await
      .map_err(OrderError::from)
      .inspect_err(log_failure)
  }

  #[instrument(name = "CartService::remove_from_cart", skip(self))]
  pub async fn remove_from_cart(&self, user_id: Uuid, product_id: Uuid) -> Result<()> {
    self.remove_line(user_id, product_id).await.inspect_err(log_failure)
  }

  async fn remove_line(&self, user_id: Uuid, product_id: Uuid) -> Result<()> {
    let mut tx = self.store.begin().await?;
    let removed = match self.store.remove_cart_line(&mut tx, user_id, product_id).await {
      Ok(removed) => removed,
      Err(e) => {
        self.store.rollback(tx).await?;
        return Err(e.into());
      }
    };

    if !removed {
      self.store.rollback(tx).await?;
      return Err(OrderError::CartLineNotFound { user_id, product_id });
    }
    self.store.commit(tx).await?;
    info!(%user_id, %product_id, "Cart line removed.");
    Ok(())
  }
}

// One line per failed operation: refusals at WARN, faults at ERROR.
fn log_failure(err: &OrderError) {
  if err.is_rejection() {
    warn!(error = %err, "Request rejected.");
  } else {
    error!(error = %err, retryable = err.is_retryable(), "Request failed.");
  }
}
