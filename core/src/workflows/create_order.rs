// core/src/workflows/create_order.rs

//! The cart → order pipeline.
//!
//! One transaction spans every step. `begin_transaction` opens it and parks
//! the handle in the context; each later step takes the handle, uses it, and
//! puts it back before returning, success or not. Only `commit_transaction`
//! consumes it. Whatever is still parked when the run ends is rolled back by
//! the caller.

use crate::error::OrderError;
use crate::models::{CartLine, NewOrder, OrderLine};
use crate::pipeline::{ContextData, Pipeline, PipelineControl};
use crate::store::Store;
use crate::workflows::contexts::CreateOrderCtxData;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub(crate) const CREATE_ORDER_STEPS: &[(&str, bool)] = &[
  ("begin_transaction", false),
  ("load_cart_lines", false),
  ("compute_total", false),
  ("insert_order", false),
  ("reserve_stock", false),
  ("clear_cart", false),
  ("commit_transaction", false),
];

/// Σ price-at-add × quantity over `lines`, failing instead of wrapping.
pub fn order_total_cents(lines: &[CartLine]) -> Result<i64, OrderError> {
  lines.iter().try_fold(0i64, |acc, line| {
    line
      .subtotal_cents()
      .and_then(|subtotal| acc.checked_add(subtotal))
      .ok_or(OrderError::AmountOverflow)
  })
}

fn checkout_tx<S: Store>(ctx_data: &ContextData<CreateOrderCtxData<S>>) -> Result<(Arc<S>, Uuid, S::Tx), OrderError> {
  let guard = ctx_data.read();
  let tx = guard
    .tx
    .take()
    .ok_or_else(|| OrderError::Internal("no open transaction in order context".to_string()))?;
  Ok((guard.store.clone(), guard.user_id, tx))
}

fn return_tx<S: Store>(ctx_data: &ContextData<CreateOrderCtxData<S>>, tx: S::Tx) {
  ctx_data.read().tx.put(tx);
}

/// Locks and checks every line's product, then writes its order line and
/// takes its stock. `lines` must already be in ascending product-id order.
async fn reserve_lines<S: Store>(
  store: &S,
  tx: &mut S::Tx,
  order_id: Uuid,
  lines: &[CartLine],
) -> Result<Vec<OrderLine>, OrderError> {
  let mut written = Vec::with_capacity(lines.len());
  for cart_line in lines {
    let product_id = cart_line.product_id;
    let stock = store
      .get_product_for_update(tx, product_id)
      .await?
      .ok_or(OrderError::ProductNotFound { product_id })?;

    if stock.stock_quantity < cart_line.quantity {
      warn!(
        %product_id,
        requested = cart_line.quantity,
        available = stock.stock_quantity,
        "Insufficient stock, aborting order."
      );
      return Err(OrderError::InsufficientStock {
        product_id,
        requested: cart_line.quantity,
        available: stock.stock_quantity,
      });
    }

    let order_line = OrderLine {
      order_id,
      product_id,
      quantity: cart_line.quantity,
      unit_price_cents: cart_line.price_at_add_cents,
    };
    store.insert_order_line(tx, &order_line).await?;
    store.decrement_stock(tx, product_id, cart_line.quantity).await?;
    debug!(%product_id, quantity = cart_line.quantity, "Stock reserved.");
    written.push(order_line);
  }
  Ok(written)
}

pub fn build_create_order_pipeline<S: Store>() -> Pipeline<CreateOrderCtxData<S>, OrderError> {
  let mut p = Pipeline::<CreateOrderCtxData<S>, OrderError>::new(CREATE_ORDER_STEPS);

  p.on_root("begin_transaction", |ctx_data: ContextData<CreateOrderCtxData<S>>| {
    Box::pin(async move {
      let store = { ctx_data.read().store.clone() };
      let tx = store.begin().await?;
      return_tx(&ctx_data, tx);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.on_root("load_cart_lines", |ctx_data: ContextData<CreateOrderCtxData<S>>| {
    Box::pin(async move {
      let (store, user_id, mut tx) = checkout_tx(&ctx_data)?;
      let loaded = store.get_cart_lines(&mut tx, user_id).await;
      return_tx(&ctx_data, tx);

      let lines = loaded?;
      if lines.is_empty() {
        info!(%user_id, "Cart is empty, nothing to order.");
        return Err(OrderError::EmptyCart { user_id });
      }
      debug!(%user_id, num_lines = lines.len(), "Cart lines loaded.");
      ctx_data.write().cart_lines = lines;
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.on_root("compute_total", |ctx_data: ContextData<CreateOrderCtxData<S>>| {
    Box::pin(async move {
      let total = order_total_cents(&ctx_data.read().cart_lines)?;
      ctx_data.write().total_amount_cents = total;
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.on_root("insert_order", |ctx_data: ContextData<CreateOrderCtxData<S>>| {
    Box::pin(async move {
      let total_amount_cents = { ctx_data.read().total_amount_cents };
      let (store, user_id, mut tx) = checkout_tx(&ctx_data)?;
      let new_order = NewOrder::pending(user_id, total_amount_cents);
      let inserted = store.insert_order(&mut tx, &new_order).await;
      return_tx(&ctx_data, tx);

      let order = inserted?;
      debug!(order_id = %order.id, total_amount_cents, "Order row inserted.");
      ctx_data.write().order = Some(order);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  // Product rows are always locked in ascending id order.
  p.before_root("reserve_stock", |ctx_data: ContextData<CreateOrderCtxData<S>>| {
    Box::pin(async move {
      ctx_data.write().cart_lines.sort_by_key(|line| line.product_id);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.on_root("reserve_stock", |ctx_data: ContextData<CreateOrderCtxData<S>>| {
    Box::pin(async move {
      let (order_id, lines) = {
        let guard = ctx_data.read();
        (guard.order.as_ref().map(|o| o.id), guard.cart_lines.clone())
      };
      let order_id = order_id.ok_or_else(|| OrderError::Internal("order row missing before reservation".to_string()))?;

      let (store, _, mut tx) = checkout_tx(&ctx_data)?;
      let reserved = reserve_lines(&*store, &mut tx, order_id, &lines).await;
      return_tx(&ctx_data, tx);

      ctx_data.write().order_lines = reserved?;
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.after_root("reserve_stock", |ctx_data: ContextData<CreateOrderCtxData<S>>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let lines_total = guard.order_lines.iter().try_fold(0i64, |acc, line| {
        line.subtotal_cents().and_then(|subtotal| acc.checked_add(subtotal))
      });
      if lines_total != Some(guard.total_amount_cents) {
        error!(
          expected = guard.total_amount_cents,
          actual = ?lines_total,
          "Order lines do not add up to the order total."
        );
        return Err(OrderError::Internal("order lines do not add up to the order total".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("clear_cart", |ctx_data: ContextData<CreateOrderCtxData<S>>| {
    Box::pin(async move {
      let (store, user_id, mut tx) = checkout_tx(&ctx_data)?;
      let cleared = store.clear_cart(&mut tx, user_id).await;
      return_tx(&ctx_data, tx);

      ctx_data.write().cleared_cart_lines = cleared?;
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p.on_root("commit_transaction", |ctx_data: ContextData<CreateOrderCtxData<S>>| {
    Box::pin(async move {
      let (store, user_id, tx) = checkout_tx(&ctx_data)?;
      store.commit(tx).await?;

      let mut guard = ctx_data.write();
      guard.committed = true;
      if let Some(order) = guard.order.as_ref() {
        info!(
          %user_id,
          order_id = %order.id,
          total_amount_cents = order.total_amount_cents,
          num_lines = guard.order_lines.len(),
          cleared_cart_lines = guard.cleared_cart_lines,
          "Order created."
        );
      }
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p
}
