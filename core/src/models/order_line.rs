// core/src/models/order_line.rs

use super::product::ProductSnapshot;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable once written. `unit_price_cents` comes from the cart line's
/// price-at-add, not from the live product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct OrderLine {
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price_cents: i64,
}

impl OrderLine {
  pub fn subtotal_cents(&self) -> Option<i64> {
    i64::from(self.quantity).checked_mul(self.unit_price_cents)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineDetails {
  #[serde(flatten)]
  pub line: OrderLine,
  /// `None` once the product has been removed from the catalog.
  pub product: Option<ProductSnapshot>,
}
