// tests/common/mod.rs
#![allow(dead_code)] // Not every test file uses every helper.

use cartflow::{
  CartService, Catalog, ContextData, MemoryStore, NewProduct, OrderService, PipelineControl, PipelineError, Product,
};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

// --- Pipeline engine fixtures ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Pipeline error: {0}")]
  Pipeline(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<PipelineError> for TestError {
  fn from(e: PipelineError) -> Self {
    TestError::Pipeline(e.to_string())
  }
}

pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> cartflow::pipeline::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = step_name, counter = guard.counter, "executed");
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> cartflow::pipeline::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      tracing::warn!(target: "test_handlers", step = step_name, "failing with: '{}'", error_message);
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

// --- Tracing ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Shop fixtures on the memory backend ---
pub struct Shop {
  pub store: Arc<MemoryStore>,
  pub orders: OrderService<MemoryStore>,
  pub carts: CartService<MemoryStore>,
}

pub fn shop() -> Shop {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  Shop {
    orders: OrderService::new(store.clone()),
    carts: CartService::new(store.clone()),
    store,
  }
}

impl Shop {
  pub async fn product(&self, name: &str, price_cents: i64, stock_quantity: i32) -> Product {
    self
      .store
      .insert_product(NewProduct::new(name, price_cents, stock_quantity))
      .await
      .expect("insert product")
  }

  pub async fn stock_of(&self, product_id: Uuid) -> i32 {
    self
      .store
      .get_product(product_id)
      .await
      .expect("get product")
      .expect("product exists")
      .stock_quantity
  }

  pub async fn add(&self, user_id: Uuid, product_id: Uuid, quantity: i32) {
    self
      .carts
      .add_to_cart(user_id, product_id, quantity)
      .await
      .expect("add to cart");
  }
}
