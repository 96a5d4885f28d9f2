// core/src/models/identity.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Customer,
  Admin,
}

/// The authenticated caller, as supplied by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
  pub user_id: Uuid,
  pub role: Role,
}

impl Requester {
  pub fn customer(user_id: Uuid) -> Self {
    Self {
      user_id,
      role: Role::Customer,
    }
  }

  pub fn admin(user_id: Uuid) -> Self {
    Self {
      user_id,
      role: Role::Admin,
    }
  }

  pub fn is_privileged(&self) -> bool {
    self.role == Role::Admin
  }

  /// Admins see every order, everyone else only their own.
  pub fn order_scope(&self) -> OrderScope {
    if self.is_privileged() {
      OrderScope::All
    } else {
      OrderScope::User(self.user_id)
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
  User(Uuid),
  All,
}
