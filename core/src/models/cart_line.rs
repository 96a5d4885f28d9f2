// core/src/models/cart_line.rs

use super::product::ProductSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// One product in a user's cart. `(user_id, product_id)` is unique.
///
/// `price_at_add_cents` is captured when the product first enters the cart and
/// is never refreshed from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CartLine {
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub price_at_add_cents: i64,
  pub added_at: DateTime<Utc>,
}

impl CartLine {
  /// `None` on overflow.
  pub fn subtotal_cents(&self) -> Option<i64> {
    i64::from(self.quantity).checked_mul(self.price_at_add_cents)
  }
}

/// A cart line joined with its product, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartEntry {
  #[serde(flatten)]
  pub line: CartLine,
  pub product: Option<ProductSnapshot>,
}
