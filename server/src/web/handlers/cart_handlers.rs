// server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use cartflow::workflows::order_total_cents;
use cartflow::{CartLine, Store};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::identity::AuthenticatedUser;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler<S: Store>(
  app_state: web::Data<AppState<S>>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let line = app_state
    .carts
    .add_to_cart(auth_user.user_id, req_payload.product_id, req_payload.quantity)
    .await?;

  info!(new_quantity = line.quantity, "Add to cart successful.");
  Ok(HttpResponse::Ok().json(json!({
    "message": "Item added to cart successfully.",
    "cart_item": line,
  })))
}

#[instrument(name = "handler::get_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_cart_handler<S: Store>(
  app_state: web::Data<AppState<S>>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let entries = app_state.carts.get_cart(auth_user.user_id).await?;
  let lines: Vec<CartLine> = entries.iter().map(|e| e.line.clone()).collect();
  let total_cents = order_total_cents(&lines)?;

  Ok(HttpResponse::Ok().json(json!({
    "items": entries,
    "total_cents": total_cents,
  })))
}

#[instrument(
  name = "handler::remove_from_cart",
  skip(app_state, auth_user),
  fields(user_id = %auth_user.user_id)
)]
pub async fn remove_from_cart_handler<S: Store>(
  app_state: web::Data<AppState<S>>,
  product_id: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  app_state
    .carts
    .remove_from_cart(auth_user.user_id, product_id.into_inner())
    .await?;
  Ok(HttpResponse::NoContent().finish())
}
