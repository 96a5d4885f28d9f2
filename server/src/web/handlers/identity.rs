// server/src/web/handlers/identity.rs

use actix_web::{FromRequest, HttpRequest};
use cartflow::{Requester, Role};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The caller as asserted by the gateway in front of this service.
///
/// Authentication happens upstream; this extractor only reads the identity
/// headers it forwards. `X-User-Role: admin` grants the admin role, anything
/// else (or no header) is a customer.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub role: Role,
}

impl AuthenticatedUser {
  pub fn requester(&self) -> Requester {
    Requester {
      user_id: self.user_id,
      role: self.role,
    }
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let user_id = req
      .headers()
      .get(USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|s| Uuid::parse_str(s.trim()).ok());

    let Some(user_id) = user_id else {
      warn!("AuthenticatedUser extractor: Missing or invalid X-User-ID header.");
      return futures_util::future::ready(Err(AppError::Auth(
        "User authentication required. Missing or invalid X-User-ID header.".to_string(),
      )));
    };

    let role = match req.headers().get(USER_ROLE_HEADER).and_then(|v| v.to_str().ok()) {
      Some(r) if r.trim().eq_ignore_ascii_case("admin") => Role::Admin,
      _ => Role::Customer,
    };
    futures_util::future::ready(Ok(AuthenticatedUser { user_id, role }))
  }
}
