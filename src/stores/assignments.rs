//! Trip-assignment repository.

use crate::error::{Error, Result};
use crate::types::{OperatorId, TripAssignment, TripId};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

/// Name of the partial unique index allowing one live assignment per trip.
const UNIQ_LIVE_PER_TRIP: &str = "uniq_live_assignment_per_trip";

const ASSIGNMENT_COLUMNS: &str = r"assignment_id, trip_id, operator_id, bus_label, status,
    assigned_at, started_at, completed_at";

/// Persistent storage for trip assignments.
#[derive(Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    /// Create a repository over the shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The trip's IN_PROGRESS assignment, if one exists.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn live_for_trip(&self, trip_id: TripId) -> Result<Option<TripAssignment>> {
        let assignment = sqlx::query_as::<_, TripAssignment>(&format!(
            r"SELECT {ASSIGNMENT_COLUMNS} FROM trip_assignments
              WHERE trip_id = $1 AND status = 'IN_PROGRESS'"
        ))
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assignment)
    }

    /// Insert an assignment; the partial unique index rejects a second live
    /// assignment for the same trip.
    ///
    /// # Errors
    ///
    /// `TRIP_ALREADY_ACTIVE` if the trip already has an IN_PROGRESS
    /// assignment; a storage error otherwise.
    pub async fn insert(&self, assignment: &TripAssignment) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO trip_assignments
                (assignment_id, trip_id, operator_id, bus_label, status,
                 assigned_at, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(assignment.assignment_id)
        .bind(assignment.trip_id)
        .bind(assignment.operator_id)
        .bind(&assignment.bus_label)
        .bind(assignment.status)
        .bind(assignment.assigned_at)
        .bind(assignment.started_at)
        .bind(assignment.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if let Some(db_err) = err.as_database_error() {
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(UNIQ_LIVE_PER_TRIP)
                {
                    return Error::TripAlreadyActive;
                }
            }
            err.into()
        })?;
        Ok(())
    }

    /// Complete the caller's IN_PROGRESS assignment for a trip.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the update fails; `None` means the
    /// operator has no live assignment for this trip.
    pub async fn complete(
        &self,
        trip_id: TripId,
        operator_id: OperatorId,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<TripAssignment>> {
        let assignment = sqlx::query_as::<_, TripAssignment>(&format!(
            r"UPDATE trip_assignments
              SET status = 'COMPLETED', completed_at = $3
              WHERE trip_id = $1 AND operator_id = $2 AND status = 'IN_PROGRESS'
              RETURNING {ASSIGNMENT_COLUMNS}"
        ))
        .bind(trip_id)
        .bind(operator_id)
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assignment)
    }

    /// All assignments of an operator for trips on a date.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn for_operator_on(
        &self,
        operator_id: OperatorId,
        date: NaiveDate,
    ) -> Result<Vec<TripAssignment>> {
        let assignments = sqlx::query_as::<_, TripAssignment>(&format!(
            r"SELECT a.assignment_id, a.trip_id, a.operator_id, a.bus_label,
                     a.status, a.assigned_at, a.started_at, a.completed_at
              FROM trip_assignments a
              JOIN trips t ON t.trip_id = a.trip_id
              WHERE a.operator_id = $1 AND t.trip_date = $2"
        ))
        .bind(operator_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(assignments)
    }

    /// Whether any live assignment exists for the trip (used for roster
    /// derivation when held by another operator).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn any_live_for_trips(&self, trip_ids: &[TripId]) -> Result<Vec<TripAssignment>> {
        let uuids: Vec<uuid::Uuid> = trip_ids.iter().map(|id| *id.as_uuid()).collect();
        let assignments = sqlx::query_as::<_, TripAssignment>(&format!(
            r"SELECT {ASSIGNMENT_COLUMNS} FROM trip_assignments
              WHERE status = 'IN_PROGRESS' AND trip_id = ANY($1)"
        ))
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;
        Ok(assignments)
    }
}
