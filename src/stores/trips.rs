//! Trip repository and availability summaries.

use crate::error::Result;
use crate::types::{Direction, Trip, TripId};
use chrono::NaiveDate;
use sqlx::PgPool;

/// A trip joined with its live booking counts.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct TripAvailability {
    /// The trip itself
    #[sqlx(flatten)]
    pub trip: Trip,
    /// Bookings occupying a seat (CONFIRMED or BOARDED)
    pub booked_count: i64,
    /// Bookings queued on the waitlist
    pub waitlist_count: i64,
}

impl TripAvailability {
    /// Seats still open to students, floored at zero.
    #[must_use]
    pub fn available_seats(&self) -> i64 {
        i64::from(self.trip.student_seats()) - self.booked_count
    }
}

/// Persistent storage for trips.
#[derive(Clone)]
pub struct TripRepository {
    pool: PgPool,
}

impl TripRepository {
    /// Create a repository over the shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new trip.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the insert fails (capacity and faculty
    /// bounds are also enforced by check constraints).
    pub async fn create(&self, trip: &Trip) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO trips
                (trip_id, direction, destination, bus_label, trip_date,
                 departure_time, capacity, faculty_reserved, status, day_class,
                 created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(trip.trip_id)
        .bind(trip.direction)
        .bind(&trip.destination)
        .bind(&trip.bus_label)
        .bind(trip.trip_date)
        .bind(trip.departure_time)
        .bind(trip.capacity)
        .bind(trip.faculty_reserved)
        .bind(trip.status)
        .bind(trip.day_class)
        .bind(trip.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Look up a trip by identifier.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn find(&self, trip_id: TripId) -> Result<Option<Trip>> {
        let trip = sqlx::query_as::<_, Trip>(
            r"
            SELECT trip_id, direction, destination, bus_label, trip_date,
                   departure_time, capacity, faculty_reserved, status,
                   day_class, created_at
            FROM trips
            WHERE trip_id = $1
            ",
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(trip)
    }

    /// Active trips for a direction and date with live booking counts,
    /// ordered by departure time.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list_available(
        &self,
        direction: Direction,
        date: NaiveDate,
    ) -> Result<Vec<TripAvailability>> {
        let trips = sqlx::query_as::<_, TripAvailability>(
            r"
            SELECT t.trip_id, t.direction, t.destination, t.bus_label,
                   t.trip_date, t.departure_time, t.capacity,
                   t.faculty_reserved, t.status, t.day_class, t.created_at,
                   COALESCE(b.booked_count, 0)   AS booked_count,
                   COALESCE(b.waitlist_count, 0) AS waitlist_count
            FROM trips t
            LEFT JOIN (
                SELECT trip_id,
                       COUNT(*) FILTER (WHERE status IN ('CONFIRMED', 'BOARDED')) AS booked_count,
                       COUNT(*) FILTER (WHERE status = 'WAITLIST')                AS waitlist_count
                FROM bookings
                GROUP BY trip_id
            ) b USING (trip_id)
            WHERE t.direction = $1 AND t.trip_date = $2 AND t.status = 'ACTIVE'
            ORDER BY t.departure_time
            ",
        )
        .bind(direction)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(trips)
    }

    /// All active trips on a date, ordered by departure time (operator
    /// day roster).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<Trip>> {
        let trips = sqlx::query_as::<_, Trip>(
            r"
            SELECT trip_id, direction, destination, bus_label, trip_date,
                   departure_time, capacity, faculty_reserved, status,
                   day_class, created_at
            FROM trips
            WHERE trip_date = $1 AND status = 'ACTIVE'
            ORDER BY departure_time
            ",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(trips)
    }
}
