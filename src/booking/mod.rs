//! The booking engine: seat allocation, waitlist management, and boarding
//! validation.
//!
//! All three operations follow the same discipline: resolve and pre-check on
//! the pool, take the operation's lease from the coordination store, do the
//! state transition inside a single serializable transaction (the
//! authoritative re-check), then release the lease unconditionally. No await
//! point separates the transaction's reads from its writes.

pub mod allocator;
pub mod boarding;
pub mod waitlist;

use crate::clock::Clock;
use crate::coord::CoordStore;
use crate::stores::{BookingRepository, Database, PassengerRepository, TripRepository};
use crate::token::TokenService;
use crate::types::{BookingId, PassengerId};
use std::sync::Arc;

/// Number of internal retries for serialization conflicts before the
/// failure surfaces as `CONCURRENT_REQUEST`.
pub(crate) const SERIALIZATION_RETRIES: u32 = 2;

/// Base backoff between serialization retries; doubles per attempt.
pub(crate) const RETRY_BACKOFF_MS: u64 = 25;

/// Outcome of a `book` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingOutcome {
    /// A seat was available; the booking is confirmed and carries its
    /// boarding token.
    Confirmed {
        /// The new booking
        booking_id: BookingId,
        /// Signed boarding token to present at the bus
        boarding_token: String,
    },
    /// The trip is full; the booking joined the waitlist.
    Waitlisted {
        /// The new booking
        booking_id: BookingId,
        /// 1-based FIFO rank
        position: i32,
    },
}

/// Outcome of a `cancel` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The booking was cancelled; at most one waitlisted passenger was
    /// promoted into the freed seat.
    Cancelled {
        /// The promoted booking and its owner, if a promotion happened
        promoted: Option<(BookingId, PassengerId)>,
    },
    /// The booking was already cancelled; idempotent success.
    AlreadyCancelled,
}

/// Outcome of a boarding scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// First scan: the passenger is now boarded.
    Boarded {
        /// Scanned booking
        booking_id: BookingId,
        /// Its owner
        passenger_id: PassengerId,
    },
    /// Duplicate scan: advisory, never double-counts.
    AlreadyBoarded {
        /// Scanned booking
        booking_id: BookingId,
        /// Its owner
        passenger_id: PassengerId,
    },
}

/// Seat allocation, cancellation, and boarding over the identity and
/// coordination stores.
#[derive(Clone)]
pub struct BookingEngine {
    pub(crate) db: Database,
    pub(crate) bookings: BookingRepository,
    pub(crate) trips: TripRepository,
    pub(crate) passengers: PassengerRepository,
    pub(crate) coord: CoordStore,
    pub(crate) tokens: TokenService,
    pub(crate) clock: Arc<dyn Clock>,
}

impl BookingEngine {
    /// Assemble the engine from its collaborators.
    #[must_use]
    pub fn new(
        db: Database,
        coord: CoordStore,
        tokens: TokenService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let pool = db.pool().clone();
        Self {
            bookings: BookingRepository::new(pool.clone()),
            trips: TripRepository::new(pool.clone()),
            passengers: PassengerRepository::new(pool),
            db,
            coord,
            tokens,
            clock,
        }
    }
}
