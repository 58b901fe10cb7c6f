//! Seat allocation.
//!
//! `book` admits a request against the trip's student capacity or appends it
//! to the waitlist. Among concurrent requests for one trip, the lease order
//! decides who is admitted; the serializable transaction re-checks make the
//! decision hold even if a lease expires mid-flight.

use super::{BookingEngine, BookingOutcome, RETRY_BACKOFF_MS, SERIALIZATION_RETRIES};
use crate::coord::CoordStore;
use crate::error::{Error, Result};
use crate::types::{Booking, BookingId, BookingStatus, PassengerId, Trip, TripId, TripStatus};
use std::time::Duration;

impl BookingEngine {
    /// Book a seat on a trip, or join its waitlist.
    ///
    /// # Errors
    ///
    /// `BLOCKED`, `TRIP_UNAVAILABLE`, `DUPLICATE_FOR_TRIP`,
    /// `DUPLICATE_FOR_DIRECTION`, `CONCURRENT_REQUEST`, or a storage error.
    pub async fn book(
        &self,
        passenger_id: PassengerId,
        trip_id: TripId,
    ) -> Result<BookingOutcome> {
        let now = self.clock.now();

        let passenger = self
            .passengers
            .find(passenger_id)
            .await?
            .ok_or(Error::NotFound)?;
        if passenger.is_blocked(now) {
            return Err(Error::Blocked);
        }

        let trip = match self.trips.find(trip_id).await? {
            Some(trip) if trip.status == TripStatus::Active && !trip.is_departed(now) => trip,
            _ => return Err(Error::TripUnavailable),
        };

        // Cheap pre-checks before the lease; the transaction re-checks are
        // authoritative.
        if self
            .bookings
            .active_for_trip(self.db.pool(), passenger_id, trip_id)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateForTrip);
        }
        if self
            .bookings
            .active_for_direction(self.db.pool(), passenger_id, trip.direction)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateForDirection);
        }

        let Some(lease) = self
            .coord
            .try_acquire(CoordStore::booking_key(trip_id))
            .await?
        else {
            return Err(Error::ConcurrentRequest);
        };

        let result = self.book_with_retry(passenger_id, &trip).await;
        self.coord.release(lease).await;

        if let Ok(outcome) = &result {
            match outcome {
                BookingOutcome::Confirmed { booking_id, .. } => {
                    tracing::info!(%booking_id, %trip_id, %passenger_id, "booking confirmed");
                }
                BookingOutcome::Waitlisted { booking_id, position } => {
                    tracing::info!(%booking_id, %trip_id, %passenger_id, position, "booking waitlisted");
                }
            }
        }
        result
    }

    /// Run the allocation transaction, retrying serialization conflicts.
    async fn book_with_retry(
        &self,
        passenger_id: PassengerId,
        trip: &Trip,
    ) -> Result<BookingOutcome> {
        let mut attempt = 0;
        loop {
            match self.book_tx(passenger_id, trip).await {
                Err(Error::ConcurrentRequest) if attempt < SERIALIZATION_RETRIES => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(
                        RETRY_BACKOFF_MS << (attempt - 1),
                    ))
                    .await;
                }
                other => return other,
            }
        }
    }

    /// The single allocation transaction: re-check duplicates, count seats,
    /// insert CONFIRMED or WAITLIST.
    async fn book_tx(&self, passenger_id: PassengerId, trip: &Trip) -> Result<BookingOutcome> {
        let now = self.clock.now();
        let mut tx = self.db.pool().begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        // Authoritative re-checks under the transaction.
        if self
            .bookings
            .active_for_trip(&mut *tx, passenger_id, trip.trip_id)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateForTrip);
        }
        if self
            .bookings
            .active_for_direction(&mut *tx, passenger_id, trip.direction)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateForDirection);
        }

        let taken = self.bookings.seats_taken(&mut *tx, trip.trip_id).await?;
        let booking_id = BookingId::new();

        let outcome = if admits(taken, trip.student_seats()) {
            let boarding_token = self.tokens.issue_boarding(
                booking_id,
                trip.trip_id,
                passenger_id,
                trip.departure_at(),
                now,
            );
            self.bookings
                .insert(
                    &mut *tx,
                    &Booking {
                        booking_id,
                        passenger_id,
                        trip_id: trip.trip_id,
                        direction: trip.direction,
                        status: BookingStatus::Confirmed,
                        boarding_token: Some(boarding_token.clone()),
                        waitlist_position: None,
                        created_at: now,
                        boarded_at: None,
                    },
                )
                .await?;
            BookingOutcome::Confirmed {
                booking_id,
                boarding_token,
            }
        } else {
            let position = next_waitlist_position(
                self.bookings
                    .max_waitlist_position(&mut *tx, trip.trip_id)
                    .await?,
            );
            self.bookings
                .insert(
                    &mut *tx,
                    &Booking {
                        booking_id,
                        passenger_id,
                        trip_id: trip.trip_id,
                        direction: trip.direction,
                        status: BookingStatus::Waitlist,
                        boarding_token: None,
                        waitlist_position: Some(position),
                        created_at: now,
                        boarded_at: None,
                    },
                )
                .await?;
            BookingOutcome::Waitlisted {
                booking_id,
                position,
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

/// A request is admitted while occupied seats are below the student
/// allocation; the faculty reservation is never allocated here.
pub(crate) const fn admits(seats_taken: i64, student_seats: i32) -> bool {
    seats_taken < student_seats as i64
}

/// Waitlist ranks are dense and FIFO: the next entry goes one past the
/// current maximum, or at rank 1 on an empty waitlist.
pub(crate) const fn next_waitlist_position(current_max: Option<i32>) -> i32 {
    match current_max {
        Some(max) => max + 1,
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_stops_at_student_allocation() {
        // capacity 35, faculty 5 → 30 student seats
        assert!(admits(0, 30));
        assert!(admits(29, 30));
        assert!(!admits(30, 30), "faculty seats are never allocated");
        assert!(!admits(31, 30));
    }

    #[test]
    fn zero_student_seats_always_waitlists() {
        assert!(!admits(0, 0));
    }

    #[test]
    fn waitlist_positions_are_dense_and_fifo() {
        assert_eq!(next_waitlist_position(None), 1);
        assert_eq!(next_waitlist_position(Some(1)), 2);
        assert_eq!(next_waitlist_position(Some(7)), 8);
    }
}
