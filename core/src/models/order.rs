// core/src/models/order.rs

use super::order_line::OrderLineDetails;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Completed,
  Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub status: OrderStatus,
  /// Computed once at creation from the cart lines; never recomputed.
  pub total_amount_cents: i64,
  pub created_at: DateTime<Utc>,
}

/// The row the order creation workflow asks the ledger to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
  pub id: Uuid,
  pub user_id: Uuid,
  pub status: OrderStatus,
  pub total_amount_cents: i64,
}

impl NewOrder {
  pub fn pending(user_id: Uuid, total_amount_cents: i64) -> Self {
    Self {
      id: Uuid::new_v4(),
      user_id,
      status: OrderStatus::Pending,
      total_amount_cents,
    }
  }
}

/// An order with its lines, as returned by order listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
  #[serde(flatten)]
  pub order: Order,
  pub lines: Vec<OrderLineDetails>,
}
