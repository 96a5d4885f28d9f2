// core/src/workflows/add_to_cart.rs

use crate::error::OrderError;
use crate::pipeline::{ContextData, Pipeline, PipelineControl};
use crate::store::Store;
use crate::workflows::contexts::AddToCartCtxData;
use tracing::{info, warn};

pub(crate) const ADD_TO_CART_STEPS: &[(&str, bool)] = &[
  ("validate_cart_input", false),
  ("fetch_product_for_cart", false),
  ("check_product_stock_for_cart", false),
  ("add_or_update_cart_line", false),
];

pub fn build_add_to_cart_pipeline<S: Store>() -> Pipeline<AddToCartCtxData<S>, OrderError> {
  let mut p = Pipeline::<AddToCartCtxData<S>, OrderError>::new(ADD_TO_CART_STEPS);

  p.on_root("validate_cart_input", |ctx_data: ContextData<AddToCartCtxData<S>>| {
    Box::pin(async move {
      let quantity = { ctx_data.read().quantity };
      if quantity <= 0 {
        warn!(quantity, "Add to cart rejected: quantity must be positive.");
        return Err(OrderError::InvalidQuantity { quantity });
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("fetch_product_for_cart", |ctx_data: ContextData<AddToCartCtxData<S>>| {
    Box::pin(async move {
      let (product_id, store) = {
        let guard = ctx_data.read();
        (guard.product_id, guard.store.clone())
      };

      let product = store
        .get_product(product_id)
        .await?
        .ok_or(OrderError::ProductNotFound { product_id })?;

      info!(
        %product_id,
        price_cents = product.price_cents,
        stock_quantity = product.stock_quantity,
        "Product fetched for cart."
      );
      ctx_data.write().product = Some(product);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  // Advisory only. The authoritative check happens under the row lock when
  // the order is created.
  p.on_root(
    "check_product_stock_for_cart",
    |ctx_data: ContextData<AddToCartCtxData<S>>| {
      Box::pin(async move {
        let guard = ctx_data.read();
        let requested = guard.quantity;
        let Some(product) = guard.product.as_ref() else {
          return Err(OrderError::Internal("product not loaded before stock check".to_string()));
        };

        if product.stock_quantity < requested {
          warn!(
            product_id = %product.id,
            requested,
            available = product.stock_quantity,
            "Add to cart rejected: insufficient stock."
          );
          return Err(OrderError::InsufficientStock {
            product_id: product.id,
            requested,
            available: product.stock_quantity,
          });
        }
        Ok(PipelineControl::Continue)
      })
    },
  );

  p.on_root("add_or_update_cart_line", |ctx_data: ContextData<AddToCartCtxData<S>>| {
    Box::pin(async move {
      let (store, user_id, product_id, quantity, price_cents) = {
        let guard = ctx_data.read();
        let price_cents = guard.product.as_ref().map(|p| p.price_cents);
        (guard.store.clone(), guard.user_id, guard.product_id, guard.quantity, price_cents)
      };
      let price_cents =
        price_cents.ok_or_else(|| OrderError::Internal("product not loaded before cart update".to_string()))?;

      let mut tx = store.begin().await?;
      let line = store
        .add_cart_quantity(&mut tx, user_id, product_id, quantity, price_cents)
        .await?;
      store.commit(tx).await?;

      info!(
        %user_id,
        %product_id,
        quantity = line.quantity,
        price_at_add_cents = line.price_at_add_cents,
        "Cart line stored."
      );
      ctx_data.write().updated_cart_line = Some(line);
      Ok::<_, OrderError>(PipelineControl::Continue)
    })
  });

  p
}
