//! shell-gateway entry point.
//!
//! Boots the app-shell caching gateway: an actix-web reverse proxy in front
//! of the application origin, with the control surface under `/__sw`.
//! Logging goes to stderr as JSON.

use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use anyhow::Result;
use tracing_subscriber::EnvFilter;

use shellcache_client::{FetchClient, FetchConfig, Network, Registration, RegistrationConfig};
use shellcache_core::{AppConfig, CacheDb, CacheStorage, MemoryStorage, StorageKind};

mod access;
mod error;
mod handler;
mod routes;

#[cfg(test)]
mod testing;

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        origin = %config.origin,
        bind = %config.bind_addr,
        cache = %config.cache_name(),
        "Starting shell-gateway"
    );

    let storage: Arc<dyn CacheStorage> = match config.storage {
        StorageKind::Sqlite => Arc::new(CacheDb::open(&config.db_path).await?),
        StorageKind::Memory => Arc::new(MemoryStorage::new()),
    };
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config))?);

    let registration =
        web::Data::new(Registration::register(RegistrationConfig::from_app_config(&config)?, storage, network).await?);

    if config.control_token.is_none() {
        tracing::info!("no control token set, /__sw accepts loopback peers only");
    }
    let access = web::Data::new(access::ControlAccess::new(config.control_token.clone()));

    let max_bytes = config.max_bytes;
    let data = registration.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(data.clone())
            .app_data(access.clone())
            .app_data(web::PayloadConfig::new(max_bytes))
            .configure(routes::configure)
            .default_service(web::to(handler::proxy))
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await?;

    registration.wait_until_idle().await;
    tracing::info!("shell-gateway stopped");

    Ok(())
}
