//! Operator repository.

use crate::error::Result;
use crate::types::{Operator, OperatorId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Persistent storage for operator accounts.
#[derive(Clone)]
pub struct OperatorRepository {
    pool: PgPool,
}

impl OperatorRepository {
    /// Create a repository over the shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up an operator by employee ID (unique, case-sensitive).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn find_by_employee_id(&self, employee_id: &str) -> Result<Option<Operator>> {
        let operator = sqlx::query_as::<_, Operator>(
            r"
            SELECT operator_id, employee_id, display_name, password_verifier,
                   phone, status, last_login_at, created_at
            FROM operators
            WHERE employee_id = $1
            ",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(operator)
    }

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the update fails.
    pub async fn touch_last_login(
        &self,
        operator_id: OperatorId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE operators
            SET last_login_at = $2
            WHERE operator_id = $1
            ",
        )
        .bind(operator_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
