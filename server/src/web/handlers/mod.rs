// server/src/web/handlers/mod.rs

pub mod cart_handlers;
pub mod identity;
pub mod order_handlers;
