/// Persistence: product catalog and purchase ledger
pub mod catalog;
pub mod memory;
pub mod purchases;

pub use catalog::{CatalogStore, PgCatalogStore};
pub use memory::{InMemoryCatalog, InMemoryLedger};
pub use purchases::{AppendOutcome, PgPurchaseLedger, PurchaseLedger};

use crate::config::DatabaseSettings;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connect to PostgreSQL and bring the schema up to date
pub async fn init_pool(config: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.url)
        .await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
