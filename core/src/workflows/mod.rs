// core/src/workflows/mod.rs

//! Business operations built on the pipeline engine and the store traits.

pub mod add_to_cart;
pub mod contexts;
pub mod create_order;
pub mod service;

pub use add_to_cart::build_add_to_cart_pipeline;
pub use contexts::{AddToCartCtxData, CreateOrderCtxData, TxSlot};
pub use create_order::{build_create_order_pipeline, order_total_cents};
pub use service::{CartService, OrderService};
