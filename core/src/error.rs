// core/src/error.rs
use crate::store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Faults of the pipeline engine itself, as opposed to handler failures.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },
}

/// Everything the cart and order operations can fail with.
#[derive(Debug, Error)]
pub enum OrderError {
  #[error("Cart of user {user_id} is empty")]
  EmptyCart { user_id: Uuid },

  #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
  InsufficientStock {
    product_id: Uuid,
    requested: i32,
    available: i32,
  },

  #[error("Product not found: {product_id}")]
  ProductNotFound { product_id: Uuid },

  #[error("Product {product_id} is not in the cart of user {user_id}")]
  CartLineNotFound { user_id: Uuid, product_id: Uuid },

  #[error("Quantity must be a positive number, got {quantity}")]
  InvalidQuantity { quantity: i32 },

  #[error("Order total overflows the amount type")]
  AmountOverflow,

  #[error("Storage error: {0}")]
  Storage(#[from] StoreError),

  #[error("Workflow error: {0}")]
  Workflow(#[from] PipelineError),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl OrderError {
  /// True when the same request may succeed if simply sent again.
  pub fn is_retryable(&self) -> bool {
    matches!(self, OrderError::Storage(e) if e.is_retryable())
  }

  /// True for an ordinary refusal of the request, as opposed to a fault of
  /// the storage or of the workflow itself.
  pub fn is_rejection(&self) -> bool {
    matches!(
      self,
      OrderError::EmptyCart { .. }
        | OrderError::InsufficientStock { .. }
        | OrderError::ProductNotFound { .. }
        | OrderError::CartLineNotFound { .. }
        | OrderError::InvalidQuantity { .. }
        | OrderError::AmountOverflow
    )
  }
}

pub type Result<T, E = OrderError> = std::result::Result<T, E>;
