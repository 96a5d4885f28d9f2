// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
  Postgres,
  Memory,
}

impl FromStr for StorageBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
      "memory" => Ok(StorageBackend::Memory),
      other => Err(AppError::Config(format!(
        "Invalid STORAGE_BACKEND '{}': expected 'postgres' or 'memory'",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub storage_backend: StorageBackend,
  /// Required when `storage_backend` is `Postgres`.
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub log_format: LogFormat,
  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source. `from_env` passes the
  /// process environment; tests pass a map.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = get_or("SERVER_PORT", "8080")
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let storage_backend = get_or("STORAGE_BACKEND", "postgres").parse::<StorageBackend>()?;

    let database_url = lookup("DATABASE_URL");
    if storage_backend == StorageBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config(
        "Missing environment variable 'DATABASE_URL' (required by the postgres backend)".to_string(),
      ));
    }
    let database_max_connections = get_or("DATABASE_MAX_CONNECTIONS", "10")
      .parse::<u32>()
      .map_err(|e| AppError::Config(format!("Invalid DATABASE_MAX_CONNECTIONS: {}", e)))?;

    let log_format = match get_or("LOG_FORMAT", "text").to_ascii_lowercase().as_str() {
      "text" => LogFormat::Text,
      "json" => LogFormat::Json,
      other => return Err(AppError::Config(format!("Invalid LOG_FORMAT '{}'", other))),
    };

    let seed_db = get_or("SEED_DB", "false")
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    Ok(Self {
      server_host,
      server_port,
      storage_backend,
      database_url,
      database_max_connections,
      log_format,
      seed_db,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    AppConfig::from_lookup(|name| vars.get(name).cloned())
  }

  #[test]
  fn defaults_for_memory_backend() {
    let config = config_from(&[("STORAGE_BACKEND", "memory")]).unwrap();
    assert_eq!(config.bind_address(), "127.0.0.1:8080");
    assert_eq!(config.storage_backend, StorageBackend::Memory);
    assert_eq!(config.database_max_connections, 10);
    assert_eq!(config.log_format, LogFormat::Text);
    assert!(config.database_url.is_none());
    assert!(!config.seed_db);
  }

  #[test]
  fn postgres_backend_requires_database_url() {
    assert!(matches!(config_from(&[]), Err(AppError::Config(_))));

    let config = config_from(&[("DATABASE_URL", "postgres://localhost/shop"), ("SEED_DB", "true")]).unwrap();
    assert_eq!(config.storage_backend, StorageBackend::Postgres);
    assert!(config.seed_db);
  }

  #[test]
  fn invalid_values_are_config_errors() {
    for vars in [
      vec![("STORAGE_BACKEND", "memory"), ("SERVER_PORT", "eighty")],
      vec![("STORAGE_BACKEND", "sqlite")],
      vec![("STORAGE_BACKEND", "memory"), ("SEED_DB", "yes")],
      vec![("STORAGE_BACKEND", "memory"), ("LOG_FORMAT", "xml")],
      vec![("STORAGE_BACKEND", "memory"), ("DATABASE_MAX_CONNECTIONS", "-1")],
    ] {
      assert!(matches!(config_from(&vars), Err(AppError::Config(_))), "accepted {:?}", vars);
    }
  }
}
