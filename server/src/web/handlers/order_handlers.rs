// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use cartflow::Store;
use serde_json::json;
use tracing::{info, instrument};

use super::identity::AuthenticatedUser;
use crate::errors::AppError;
use crate::state::AppState;

/// Places an order for the caller's whole cart.
#[instrument(name = "handler::create_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn create_order_handler<S: Store>(
  app_state: web::Data<AppState<S>>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orders.create_order(auth_user.user_id).await?;

  info!(order_id = %order.id, total_amount_cents = order.total_amount_cents, "Order placed.");
  Ok(HttpResponse::Created().json(json!({
    "message": "Order created successfully.",
    "order": order,
  })))
}

#[instrument(name = "handler::list_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id, role = ?auth_user.role))]
pub async fn list_orders_handler<S: Store>(
  app_state: web::Data<AppState<S>>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.orders.list_orders(&auth_user.requester()).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}
