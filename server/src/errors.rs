// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use cartflow::OrderError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error(transparent)]
  Order(#[from] OrderError),
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Order(e) => match e {
        OrderError::EmptyCart { .. } | OrderError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
        OrderError::InsufficientStock { .. } => StatusCode::CONFLICT,
        OrderError::ProductNotFound { .. } | OrderError::CartLineNotFound { .. } => StatusCode::NOT_FOUND,
        OrderError::AmountOverflow => StatusCode::UNPROCESSABLE_ENTITY,
        OrderError::Storage(_) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        OrderError::Storage(_) | OrderError::Workflow(_) | OrderError::Internal(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }

    let body = match self {
      AppError::Validation(m) => json!({ "error": m, "code": "validation" }),
      AppError::Auth(m) => json!({ "error": m, "code": "unauthorized" }),
      AppError::Config(m) => json!({ "error": "Configuration issue", "detail": m }),
      AppError::Order(e) => order_error_body(e),
    };
    HttpResponse::build(status).json(body)
  }
}

fn order_error_body(e: &OrderError) -> serde_json::Value {
  match e {
    OrderError::EmptyCart { .. } => json!({ "error": "Cart is empty", "code": "empty_cart" }),
    OrderError::InsufficientStock {
      product_id,
      requested,
      available,
    } => json!({
      "error": e.to_string(),
      "code": "insufficient_stock",
      "product_id": product_id,
      "requested": requested,
      "available": available,
    }),
    OrderError::ProductNotFound { product_id } => {
      json!({ "error": e.to_string(), "code": "product_not_found", "product_id": product_id })
    }
    OrderError::CartLineNotFound { product_id, .. } => {
      json!({ "error": e.to_string(), "code": "cart_line_not_found", "product_id": product_id })
    }
    OrderError::InvalidQuantity { quantity } => {
      json!({ "error": e.to_string(), "code": "invalid_quantity", "quantity": quantity })
    }
    OrderError::AmountOverflow => json!({ "error": e.to_string(), "code": "amount_overflow" }),
    // Storage and workflow details stay in the logs.
    OrderError::Storage(_) => json!({
      "error": "Storage operation failed",
      "code": "storage",
      "retryable": e.is_retryable(),
    }),
    OrderError::Workflow(_) | OrderError::Internal(_) => {
      json!({ "error": "An internal error occurred", "code": "internal" })
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
