// src/lib.rs

//! Cartflow: cart, inventory and order ledger with an atomic order workflow.
//!
//! The crate turns a user's shopping cart into a persisted order:
//!  - All writes of one order (order row, lines, stock, cart) commit together or not at all.
//!  - Product rows are locked in ascending id order, so competing orders never oversell.
//!  - A user's cart is locked for the duration of the workflow.
//!  - Storage sits behind traits with a PostgreSQL and an in-memory backend.
//!
//! Workflows are expressed as named-step pipelines (see [`pipeline`]).

pub mod error;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod workflows;

// --- Re-exports for the Public API ---

pub use crate::error::{OrderError, PipelineError, Result};
pub use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult, StepDef};

pub use crate::models::{
  CartEntry, CartLine, NewOrder, NewProduct, Order, OrderDetails, OrderLine, OrderLineDetails, OrderScope,
  OrderStatus, Product, ProductSnapshot, ProductStock, Requester, Role,
};

pub use crate::store::{
  Backend, CartStore, Catalog, InventoryStore, MemoryStore, OrderLedger, PgStore, Store, StoreError, StoreResult,
};

pub use crate::workflows::{CartService, OrderService};

/*
    Core Workflow (create order):
    1. begin_transaction   open the store transaction, park the handle in the context.
    2. load_cart_lines     lock the user's cart, read its lines; empty cart ends here.
    3. compute_total       checked Σ price-at-add × quantity.
    4. insert_order        pending order row carrying the total.
    5. reserve_stock       per line in product-id order: lock product, check, write line, decrement.
    6. clear_cart          delete the user's cart lines.
    7. commit_transaction  consume the handle.
    A handle still parked when the run ends is rolled back by `OrderService`.
*/
