//! Ledger persistence.
//!
//! [`Database`] owns the PostgreSQL pool and the embedded migrations.
//! Domain managers never touch the pool directly; they work against the
//! [`LedgerStore`] trait, implemented by [`PgLedgerStore`] and by the
//! in-process [`MemoryLedgerStore`].

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod memory;
pub mod postgres;
pub mod store;

pub use config::DatabaseConfig;
pub use errors::{StoreError, StoreResult};
pub use memory::{FailPoint, MemoryLedgerStore};
pub use postgres::PgLedgerStore;
pub use store::{LedgerStore, LedgerTx};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open the connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ton_rewards::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), ton_rewards::db::StoreError> {
    ///     let db = Database::new(&DatabaseConfig::development()).await?;
    ///     db.migrate().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .max_lifetime(config.max_lifetime())
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ledger store over this pool
    pub fn ledger(&self) -> PgLedgerStore {
        PgLedgerStore::new(Arc::new(self.pool.clone()))
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
