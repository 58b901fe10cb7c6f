//! Identity store: `PostgreSQL` repositories.
//!
//! The identity store exclusively owns all durable entities. Repositories
//! are thin `Clone` views over the shared pool; methods that must run inside
//! a caller-owned transaction are generic over [`sqlx::PgExecutor`] so the
//! booking engine controls the transaction boundary.

pub mod assignments;
pub mod bookings;
pub mod operators;
pub mod passengers;
pub mod reports;
pub mod trips;

pub use assignments::AssignmentRepository;
pub use bookings::{BookingRepository, BookingSummary, ManifestRow};
pub use operators::OperatorRepository;
pub use passengers::PassengerRepository;
pub use reports::ReportRepository;
pub use trips::{TripAvailability, TripRepository};

use crate::config::PostgresConfig;
use crate::error::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Shared handle over the identity store.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect the pool with the configured bounds.
    ///
    /// # Errors
    ///
    /// Returns `STORE_UNAVAILABLE` if the database cannot be reached.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests).
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns `INTERNAL` if a migration fails to apply.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(crate::error::Error::internal)?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}
