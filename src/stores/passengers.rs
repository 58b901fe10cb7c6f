//! Passenger repository.

use crate::error::{Error, Result};
use crate::types::{Passenger, PassengerId};
use sqlx::PgPool;

/// Persistent storage for passenger accounts.
#[derive(Clone)]
pub struct PassengerRepository {
    pool: PgPool,
}

impl PassengerRepository {
    /// Create a repository over the shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a passenger by identifier.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn find(&self, passenger_id: PassengerId) -> Result<Option<Passenger>> {
        let passenger = sqlx::query_as::<_, Passenger>(
            r"
            SELECT passenger_id, email, display_name, room, phone,
                   penalty_count, blocked_until, created_at
            FROM passengers
            WHERE passenger_id = $1
            ",
        )
        .bind(passenger_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(passenger)
    }

    /// Look up a passenger by email (emails are unique).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Passenger>> {
        let passenger = sqlx::query_as::<_, Passenger>(
            r"
            SELECT passenger_id, email, display_name, room, phone,
                   penalty_count, blocked_until, created_at
            FROM passengers
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(passenger)
    }

    /// Insert a new passenger created at first federated login.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the insert fails; a concurrent first login
    /// with the same email surfaces as a unique violation for the caller to
    /// resolve by re-reading.
    pub async fn create(&self, passenger: &Passenger) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO passengers
                (passenger_id, email, display_name, room, phone,
                 penalty_count, blocked_until, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(passenger.passenger_id)
        .bind(&passenger.email)
        .bind(&passenger.display_name)
        .bind(&passenger.room)
        .bind(&passenger.phone)
        .bind(passenger.penalty_count)
        .bind(passenger.blocked_until)
        .bind(passenger.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Set room and phone at profile completion.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the passenger does not exist.
    pub async fn complete_profile(
        &self,
        passenger_id: PassengerId,
        room: &str,
        phone: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE passengers
            SET room = $2, phone = $3
            WHERE passenger_id = $1
            ",
        )
        .bind(passenger_id)
        .bind(room)
        .bind(phone)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}
