// core/src/models/mod.rs

//! Records of the catalog, cart and order ledger.

pub mod cart_line;
pub mod identity;
pub mod order;
pub mod order_line;
pub mod product;

pub use cart_line::{CartEntry, CartLine};
pub use identity::{OrderScope, Requester, Role};
pub use order::{NewOrder, Order, OrderDetails, OrderStatus};
pub use order_line::{OrderLine, OrderLineDetails};
pub use product::{NewProduct, Product, ProductSnapshot, ProductStock};
