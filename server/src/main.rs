// server/src/main.rs

mod config;
mod errors;
mod seed;
mod state;
mod web;

use crate::config::{AppConfig, LogFormat, StorageBackend};
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use cartflow::{MemoryStore, PgStore, Store};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let builder = tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(EnvFilter::from_default_env()) // RUST_LOG overrides
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Text => builder.init(),
    LogFormat::Json => builder.json().init(),
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = Arc::new(AppConfig::from_env().context("Failed to load application configuration")?);
  init_tracing(app_config.log_format);
  tracing::info!(backend = ?app_config.storage_backend, "Starting cartflow server...");

  match app_config.storage_backend {
    StorageBackend::Postgres => {
      let database_url = app_config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required by the postgres backend")?;
      let store = PgStore::connect(database_url, app_config.database_max_connections)
        .await
        .context("Failed to connect to the database")?;
      store.migrate().await.context("Failed to apply database migrations")?;
      serve(Arc::new(store), app_config).await
    }
    StorageBackend::Memory => {
      tracing::warn!("Using the in-memory store; all data is lost on shutdown.");
      serve(Arc::new(MemoryStore::new()), app_config).await
    }
  }
}

async fn serve<S: Store>(store: Arc<S>, app_config: Arc<AppConfig>) -> anyhow::Result<()> {
  if app_config.seed_db {
    let seeded = seed::seed_catalog(&*store).await.context("Failed to seed database")?;
    tracing::info!(num_products = seeded.len(), "Database seeded.");
  }

  let app_state = AppState::new(store, app_config.clone());
  let server_address = app_config.bind_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes::<S>)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await?;
  Ok(())
}
