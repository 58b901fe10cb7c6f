//! Misconduct-report repository.

use crate::error::Result;
use crate::types::MisconductReport;
use sqlx::PgPool;

/// Persistent storage for misconduct reports.
///
/// Reports are immutable after creation except for review-status
/// transitions, which belong to the (out-of-scope) review tooling; the core
/// only inserts.
#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    /// Create a repository over the shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new report.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the insert fails.
    pub async fn insert(&self, report: &MisconductReport) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO misconduct_reports
                (report_id, passenger_id, trip_id, operator_id, reason,
                 comments, evidence_locator, status, reported_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(report.report_id)
        .bind(report.passenger_id)
        .bind(report.trip_id)
        .bind(report.operator_id)
        .bind(report.reason)
        .bind(&report.comments)
        .bind(&report.evidence_locator)
        .bind(report.status)
        .bind(report.reported_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
