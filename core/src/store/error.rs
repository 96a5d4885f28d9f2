// core/src/store/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
  /// Lock conflict the database resolved by aborting us (serialization
  /// failure, deadlock victim). Safe to retry the whole operation.
  #[error("Transaction conflict: {0}")]
  Conflict(String),

  /// The database could not be reached or the pool is exhausted.
  #[error("Storage unavailable: {0}")]
  Unavailable(String),

  /// A constraint of the data model would have been violated.
  #[error("Constraint violated: {0}")]
  Constraint(String),

  #[error("Database error: {0}")]
  Sqlx(#[source] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
  pub fn is_retryable(&self) -> bool {
    matches!(self, StoreError::Conflict(_) | StoreError::Unavailable(_))
  }
}

impl From<sqlx::Error> for StoreError {
  fn from(err: sqlx::Error) -> Self {
    if let sqlx::Error::Database(db_err) = &err {
      let code = db_err.code().map(|c| c.into_owned());
      match code.as_deref() {
        // serialization_failure, deadlock_detected
        Some("40001") | Some("40P01") => return StoreError::Conflict(db_err.to_string()),
        // check_violation, foreign_key_violation
        Some("23514") | Some("23503") => return StoreError::Constraint(db_err.to_string()),
        Some(code) if code.starts_with("08") || code == "53300" => {
          return StoreError::Unavailable(db_err.to_string())
        }
        _ => {}
      }
    }
    match err {
      sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
        StoreError::Unavailable(err.to_string())
      }
      _ => StoreError::Sqlx(err),
    }
  }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
