// server/src/web/routes.rs

use actix_web::web;
use cartflow::Store;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::handlers::{cart_handlers, order_handlers};

async fn health_check_handler<S: Store>(app_state: web::Data<AppState<S>>) -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({
    "status": "ok",
    "backend": format!("{:?}", app_state.config.storage_backend).to_lowercase(),
  }))
}

/// Malformed bodies and path segments answer with the same JSON error shape
/// as every other failure.
fn extractor_configs() -> (web::JsonConfig, web::PathConfig) {
  let json = web::JsonConfig::default()
    .limit(16 * 1024)
    .error_handler(|err, _req| AppError::Validation(format!("Invalid request body: {}", err)).into());
  let path = web::PathConfig::default()
    .error_handler(|err, _req| AppError::Validation(format!("Invalid path parameter: {}", err)).into());
  (json, path)
}

pub fn configure_app_routes<S: Store>(cfg: &mut web::ServiceConfig) {
  let (json_config, path_config) = extractor_configs();
  cfg.app_data(json_config).app_data(path_config).service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler::<S>))
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler::<S>))
          .route("", web::get().to(order_handlers::list_orders_handler::<S>)),
      )
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::get_cart_handler::<S>))
          .route("/items", web::post().to(cart_handlers::add_to_cart_handler::<S>))
          .route(
            "/items/{product_id}",
            web::delete().to(cart_handlers::remove_from_cart_handler::<S>),
          ),
      ),
  );
}
