// core/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub category_id: Option<Uuid>,
  pub price_cents: i64,
  pub stock_quantity: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input for the catalog seam. Product CRUD itself lives outside this crate.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
  pub name: String,
  pub description: Option<String>,
  pub category_id: Option<Uuid>,
  pub price_cents: i64,
  pub stock_quantity: i32,
}

impl NewProduct {
  pub fn new(name: impl Into<String>, price_cents: i64, stock_quantity: i32) -> Self {
    Self {
      name: name.into(),
      description: None,
      category_id: None,
      price_cents,
      stock_quantity,
    }
  }
}

/// Price and stock of a product as read under its row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct ProductStock {
  pub id: Uuid,
  pub price_cents: i64,
  pub stock_quantity: i32,
}

/// The product as shown next to a cart or order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ProductSnapshot {
  pub id: Uuid,
  pub name: String,
  pub price_cents: i64,
}

impl From<&Product> for ProductSnapshot {
  fn from(p: &Product) -> Self {
    Self {
      id: p.id,
      name: p.name.clone(),
      price_cents: p.price_cents,
    }
  }
}
