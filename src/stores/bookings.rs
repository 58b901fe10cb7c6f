//! Booking repository: the transactional core's storage surface.
//!
//! Methods used inside the allocator/waitlist/boarding critical sections are
//! generic over [`PgExecutor`] so they run on the engine's transaction;
//! read-only listings run on the pool directly.

use crate::error::{Error, Result};
use crate::types::{
    Booking, BookingId, BookingStatus, DayClass, Direction, PassengerId, TripId, TripStatus,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgExecutor, PgPool};

/// Names of the partial unique indexes carrying the booking invariants.
const UNIQ_PER_TRIP: &str = "uniq_live_booking_per_trip";
const UNIQ_PER_DIRECTION: &str = "uniq_live_booking_per_direction";

const BOOKING_COLUMNS: &str = r"booking_id, passenger_id, trip_id, direction, status,
    boarding_token, waitlist_position, created_at, boarded_at";

/// A booking joined with its trip, for history and profile listings.
#[derive(Clone, Debug, sqlx::FromRow, serde::Serialize)]
pub struct BookingSummary {
    /// Booking identifier
    pub booking_id: BookingId,
    /// Trip identifier
    pub trip_id: TripId,
    /// Booking status
    pub status: BookingStatus,
    /// Boarding token, when confirmed or boarded
    pub boarding_token: Option<String>,
    /// Waitlist rank, when waitlisted
    pub waitlist_position: Option<i32>,
    /// Booking creation time
    pub created_at: DateTime<Utc>,
    /// Boarding time, when boarded
    pub boarded_at: Option<DateTime<Utc>>,
    /// Trip direction
    pub direction: Direction,
    /// Trip destination label
    pub destination: Option<String>,
    /// Trip bus label
    pub bus_label: Option<String>,
    /// Trip service date
    pub trip_date: NaiveDate,
    /// Trip departure time
    pub departure_time: NaiveTime,
    /// Trip status
    pub trip_status: TripStatus,
    /// Trip schedule class
    pub day_class: DayClass,
}

/// One row of the operator's passenger manifest.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ManifestRow {
    /// Passenger identifier
    pub passenger_id: PassengerId,
    /// Passenger display name
    pub display_name: String,
    /// Booking identifier
    pub booking_id: BookingId,
    /// Booking status (CONFIRMED or BOARDED)
    pub status: BookingStatus,
}

/// Persistent storage for bookings.
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Create a repository over the shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a booking by identifier.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn find(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    /// The passenger's non-terminal booking for a trip, if any (a live
    /// booking blocks a second one for the same trip).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn active_for_trip<'e, E>(
        &self,
        exec: E,
        passenger_id: PassengerId,
        trip_id: TripId,
    ) -> Result<Option<Booking>>
    where
        E: PgExecutor<'e>,
    {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            r"SELECT {BOOKING_COLUMNS} FROM bookings
              WHERE passenger_id = $1 AND trip_id = $2 AND status <> 'CANCELLED'"
        ))
        .bind(passenger_id)
        .bind(trip_id)
        .fetch_optional(exec)
        .await?;
        Ok(booking)
    }

    /// The passenger's non-terminal booking in a direction, if any (a live
    /// booking blocks a second one the same way, across trips).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn active_for_direction<'e, E>(
        &self,
        exec: E,
        passenger_id: PassengerId,
        direction: Direction,
    ) -> Result<Option<Booking>>
    where
        E: PgExecutor<'e>,
    {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            r"SELECT {BOOKING_COLUMNS} FROM bookings
              WHERE passenger_id = $1 AND direction = $2 AND status <> 'CANCELLED'"
        ))
        .bind(passenger_id)
        .bind(direction)
        .fetch_optional(exec)
        .await?;
        Ok(booking)
    }

    /// Seats currently occupied on a trip (CONFIRMED + BOARDED).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn seats_taken<'e, E>(&self, exec: E, trip_id: TripId) -> Result<i64>
    where
        E: PgExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*) FROM bookings
              WHERE trip_id = $1 AND status IN ('CONFIRMED', 'BOARDED')",
        )
        .bind(trip_id)
        .fetch_one(exec)
        .await?;
        Ok(count)
    }

    /// Highest waitlist position currently assigned for a trip.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn max_waitlist_position<'e, E>(&self, exec: E, trip_id: TripId) -> Result<Option<i32>>
    where
        E: PgExecutor<'e>,
    {
        let max: Option<i32> = sqlx::query_scalar(
            r"SELECT MAX(waitlist_position) FROM bookings
              WHERE trip_id = $1 AND status = 'WAITLIST'",
        )
        .bind(trip_id)
        .fetch_one(exec)
        .await?;
        Ok(max)
    }

    /// Insert a booking, mapping the invariant indexes to their conflict
    /// kinds.
    ///
    /// # Errors
    ///
    /// `DUPLICATE_FOR_TRIP` / `DUPLICATE_FOR_DIRECTION` when the partial
    /// unique indexes reject the row; a storage error otherwise.
    pub async fn insert<'e, E>(&self, exec: E, booking: &Booking) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r"
            INSERT INTO bookings
                (booking_id, passenger_id, trip_id, direction, status,
                 boarding_token, waitlist_position, created_at, boarded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(booking.booking_id)
        .bind(booking.passenger_id)
        .bind(booking.trip_id)
        .bind(booking.direction)
        .bind(booking.status)
        .bind(&booking.boarding_token)
        .bind(booking.waitlist_position)
        .bind(booking.created_at)
        .bind(booking.boarded_at)
        .execute(exec)
        .await
        .map_err(map_booking_insert_error)?;
        Ok(())
    }

    /// Load a booking by id and trip for scan validation.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn find_for_scan<'e, E>(
        &self,
        exec: E,
        booking_id: BookingId,
        trip_id: TripId,
    ) -> Result<Option<Booking>>
    where
        E: PgExecutor<'e>,
    {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            r"SELECT {BOOKING_COLUMNS} FROM bookings
              WHERE booking_id = $1 AND trip_id = $2"
        ))
        .bind(booking_id)
        .bind(trip_id)
        .fetch_optional(exec)
        .await?;
        Ok(booking)
    }

    /// Transition a confirmed booking to BOARDED, stamping `boarded_at`
    /// exactly once.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the booking is no longer CONFIRMED.
    pub async fn mark_boarded<'e, E>(
        &self,
        exec: E,
        booking_id: BookingId,
        boarded_at: DateTime<Utc>,
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"UPDATE bookings
              SET status = 'BOARDED', boarded_at = $2
              WHERE booking_id = $1 AND status = 'CONFIRMED'",
        )
        .bind(booking_id)
        .bind(boarded_at)
        .execute(exec)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    /// Cancel a booking and clear its waitlist rank.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the booking is already terminal.
    pub async fn cancel<'e, E>(&self, exec: E, booking_id: BookingId) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"UPDATE bookings
              SET status = 'CANCELLED', waitlist_position = NULL
              WHERE booking_id = $1 AND status IN ('CONFIRMED', 'WAITLIST')",
        )
        .bind(booking_id)
        .execute(exec)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    /// Head of the trip's waitlist: minimum position, ties broken by
    /// creation time.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn waitlist_head<'e, E>(&self, exec: E, trip_id: TripId) -> Result<Option<Booking>>
    where
        E: PgExecutor<'e>,
    {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            r"SELECT {BOOKING_COLUMNS} FROM bookings
              WHERE trip_id = $1 AND status = 'WAITLIST'
              ORDER BY waitlist_position ASC, created_at ASC
              LIMIT 1"
        ))
        .bind(trip_id)
        .fetch_optional(exec)
        .await?;
        Ok(booking)
    }

    /// Promote a waitlisted booking to CONFIRMED with its fresh boarding
    /// token.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the booking is no longer waitlisted.
    pub async fn promote<'e, E>(
        &self,
        exec: E,
        booking_id: BookingId,
        boarding_token: &str,
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"UPDATE bookings
              SET status = 'CONFIRMED', boarding_token = $2, waitlist_position = NULL
              WHERE booking_id = $1 AND status = 'WAITLIST'",
        )
        .bind(booking_id)
        .bind(boarding_token)
        .execute(exec)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    /// Close the gap left at `vacated_position`: decrement every waitlist
    /// rank above it, restoring positions to `{1..k}`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the update fails.
    pub async fn shift_waitlist_after<'e, E>(
        &self,
        exec: E,
        trip_id: TripId,
        vacated_position: i32,
    ) -> Result<u64>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"UPDATE bookings
              SET waitlist_position = waitlist_position - 1
              WHERE trip_id = $1 AND status = 'WAITLIST' AND waitlist_position > $2",
        )
        .bind(trip_id)
        .bind(vacated_position)
        .execute(exec)
        .await?;
        Ok(result.rows_affected())
    }

    /// All bookings of a passenger joined with their trips, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn history_for_passenger(
        &self,
        passenger_id: PassengerId,
    ) -> Result<Vec<BookingSummary>> {
        let rows = sqlx::query_as::<_, BookingSummary>(&summary_query(
            "b.passenger_id = $1",
            "ORDER BY b.created_at DESC",
        ))
        .bind(passenger_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// The passenger's live bookings joined with their trips.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn active_for_passenger(
        &self,
        passenger_id: PassengerId,
    ) -> Result<Vec<BookingSummary>> {
        let rows = sqlx::query_as::<_, BookingSummary>(&summary_query(
            "b.passenger_id = $1 AND b.status <> 'CANCELLED'",
            "ORDER BY t.trip_date, t.departure_time",
        ))
        .bind(passenger_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Seated passengers of a trip (CONFIRMED and BOARDED), ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn manifest_for_trip(&self, trip_id: TripId) -> Result<Vec<ManifestRow>> {
        let rows = sqlx::query_as::<_, ManifestRow>(
            r"
            SELECT p.passenger_id, p.display_name, b.booking_id, b.status
            FROM bookings b
            JOIN passengers p ON p.passenger_id = b.passenger_id
            WHERE b.trip_id = $1 AND b.status IN ('CONFIRMED', 'BOARDED')
            ORDER BY p.display_name
            ",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn summary_query(filter: &str, order: &str) -> String {
    format!(
        r"
        SELECT b.booking_id, b.trip_id, b.status, b.boarding_token,
               b.waitlist_position, b.created_at, b.boarded_at,
               t.direction, t.destination, t.bus_label, t.trip_date,
               t.departure_time, t.status AS trip_status, t.day_class
        FROM bookings b
        JOIN trips t ON t.trip_id = b.trip_id
        WHERE {filter}
        {order}
        "
    )
}

fn map_booking_insert_error(err: sqlx::Error) -> Error {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some(UNIQ_PER_TRIP) => Error::DuplicateForTrip,
                Some(UNIQ_PER_DIRECTION) => Error::DuplicateForDirection,
                _ => Error::internal(err),
            };
        }
    }
    err.into()
}
