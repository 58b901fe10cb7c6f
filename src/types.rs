//! Domain types for the campus bus reservation core.
//!
//! Value objects, entities, and status enums shared by every component.
//! Entities reference each other by identifier only; there are no object
//! graphs, and repositories return these structs directly from row data.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
        )]
        #[sqlx(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing `Uuid`
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a passenger
    PassengerId
);
entity_id!(
    /// Unique identifier for an operator
    OperatorId
);
entity_id!(
    /// Unique identifier for a trip
    TripId
);
entity_id!(
    /// Unique identifier for a booking
    BookingId
);
entity_id!(
    /// Unique identifier for a trip assignment
    AssignmentId
);
entity_id!(
    /// Unique identifier for a misconduct report
    ReportId
);

// ============================================================================
// Status enums
// ============================================================================

/// Travel direction of a trip.
///
/// Each trip runs exactly one direction; a passenger may hold at most one
/// non-terminal booking per direction across all trips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum Direction {
    /// Campus → city
    #[serde(rename = "CAMPUS_TO_CITY")]
    #[sqlx(rename = "CAMPUS_TO_CITY")]
    CampusToCity,
    /// City → campus
    #[serde(rename = "CITY_TO_CAMPUS")]
    #[sqlx(rename = "CITY_TO_CAMPUS")]
    CityToCampus,
}

impl Direction {
    /// Wire name of the direction
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CampusToCity => "CAMPUS_TO_CITY",
            Self::CityToCampus => "CITY_TO_CAMPUS",
        }
    }

    /// Parse a wire name (query parameters arrive as plain strings).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CAMPUS_TO_CITY" => Some(Self::CampusToCity),
            "CITY_TO_CAMPUS" => Some(Self::CityToCampus),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking lifecycle status.
///
/// `Confirmed` and `Waitlist` are live; `Cancelled` is terminal; `Boarded`
/// is terminal except that it still occupies a seat for counting purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Seat held, boarding token issued
    #[sqlx(rename = "CONFIRMED")]
    Confirmed,
    /// Queued for a seat, 1-based FIFO position
    #[sqlx(rename = "WAITLIST")]
    Waitlist,
    /// Released by the passenger (terminal)
    #[sqlx(rename = "CANCELLED")]
    Cancelled,
    /// Scanned aboard the bus
    #[sqlx(rename = "BOARDED")]
    Boarded,
}

impl BookingStatus {
    /// A non-terminal booking blocks further bookings for the same trip
    /// and direction.
    #[must_use]
    pub const fn is_non_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Waitlist | Self::Boarded)
    }

    /// Statuses that occupy a student seat.
    #[must_use]
    pub const fn occupies_seat(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Boarded)
    }
}

/// Trip lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    /// Open for booking
    #[sqlx(rename = "ACTIVE")]
    Active,
    /// Cancelled by administration
    #[sqlx(rename = "CANCELLED")]
    Cancelled,
    /// Run finished
    #[sqlx(rename = "COMPLETED")]
    Completed,
}

/// Weekday/weekend schedule class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayClass {
    /// Monday through Friday schedule
    #[sqlx(rename = "WEEKDAY")]
    Weekday,
    /// Saturday/Sunday schedule
    #[sqlx(rename = "WEEKEND")]
    Weekend,
}

/// Operator account status; only `Active` operators may log in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorStatus {
    /// May log in and run trips
    #[sqlx(rename = "ACTIVE")]
    Active,
    /// Disabled administratively
    #[sqlx(rename = "INACTIVE")]
    Inactive,
    /// Suspended pending review
    #[sqlx(rename = "SUSPENDED")]
    Suspended,
}

/// Trip assignment lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    /// Created but not yet started
    #[sqlx(rename = "ASSIGNED")]
    Assigned,
    /// Operator is running the trip; at most one per trip
    #[sqlx(rename = "IN_PROGRESS")]
    InProgress,
    /// Run finished
    #[sqlx(rename = "COMPLETED")]
    Completed,
    /// Cancelled administratively
    #[sqlx(rename = "CANCELLED")]
    Cancelled,
}

/// Derived per-operator trip status for the day roster.
///
/// Not stored; computed from assignments and departure time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RosterStatus {
    /// The operator has a live assignment for this trip
    InProgress,
    /// Assignment completed, or departure passed with no live assignment
    Completed,
    /// Not yet started
    Upcoming,
}

/// Reason attached to a misconduct report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportReason {
    /// Behavioral incident aboard the bus
    #[sqlx(rename = "BEHAVIOR")]
    Behavior,
    /// Attempted boarding without a valid token
    #[sqlx(rename = "INVALID_BOARDING_ATTEMPT")]
    InvalidBoardingAttempt,
    /// Anything else; comments are mandatory
    #[sqlx(rename = "OTHER")]
    Other,
}

/// Review status of a misconduct report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    /// Awaiting review
    #[sqlx(rename = "PENDING")]
    Pending,
    /// Reviewed, outcome undecided
    #[sqlx(rename = "REVIEWED")]
    Reviewed,
    /// Closed
    #[sqlx(rename = "RESOLVED")]
    Resolved,
}

// ============================================================================
// Entities
// ============================================================================

/// A passenger account, created on first federated login.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Passenger {
    /// Unique passenger identifier
    pub passenger_id: PassengerId,
    /// Verified, domain-restricted email (unique)
    pub email: String,
    /// Display name from the identity provider
    pub display_name: String,
    /// Dormitory room, set at profile completion
    pub room: Option<String>,
    /// Contact phone, set at profile completion
    pub phone: Option<String>,
    /// Accumulated penalty count
    pub penalty_count: i32,
    /// End of the current block, if any
    pub blocked_until: Option<DateTime<Utc>>,
    /// Account creation time
    pub created_at: DateTime<Utc>,
}

impl Passenger {
    /// A passenger is blocked while they hold three or more penalties and
    /// the block has not yet expired.
    #[must_use]
    pub fn is_blocked(&self, now: DateTime<Utc>) -> bool {
        self.penalty_count >= 3 && self.blocked_until.is_some_and(|until| until > now)
    }

    /// Profile is complete once both room and phone are on file.
    #[must_use]
    pub fn profile_complete(&self) -> bool {
        self.room.is_some() && self.phone.is_some()
    }
}

/// An operator account, created administratively.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Operator {
    /// Unique operator identifier
    pub operator_id: OperatorId,
    /// Employee ID used at login (unique)
    pub employee_id: String,
    /// Display name
    pub display_name: String,
    /// Salted one-way password verifier (argon2 PHC string); never serialized out
    #[serde(skip_serializing)]
    pub password_verifier: String,
    /// Optional contact phone
    pub phone: Option<String>,
    /// Account status
    pub status: OperatorStatus,
    /// Last successful login
    pub last_login_at: Option<DateTime<Utc>>,
    /// Account creation time
    pub created_at: DateTime<Utc>,
}

/// A scheduled bus run.
///
/// Immutable after the first booking except for `status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trip {
    /// Unique trip identifier
    pub trip_id: TripId,
    /// Travel direction
    pub direction: Direction,
    /// Optional destination label
    pub destination: Option<String>,
    /// Optional bus label (e.g. "Bus #05")
    pub bus_label: Option<String>,
    /// Service date
    pub trip_date: NaiveDate,
    /// Departure time on the service date
    pub departure_time: NaiveTime,
    /// Total seats on the bus (≤ 50)
    pub capacity: i32,
    /// Seats reserved for faculty (≤ capacity / 2)
    pub faculty_reserved: i32,
    /// Trip status
    pub status: TripStatus,
    /// Weekday/weekend class
    pub day_class: DayClass,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Trip {
    /// Seats available to students: capacity minus the faculty reservation.
    #[must_use]
    pub const fn student_seats(&self) -> i32 {
        self.capacity - self.faculty_reserved
    }

    /// Departure instant, UTC.
    #[must_use]
    pub fn departure_at(&self) -> DateTime<Utc> {
        self.trip_date.and_time(self.departure_time).and_utc()
    }

    /// Whether the trip has already departed at `now`.
    #[must_use]
    pub fn is_departed(&self, now: DateTime<Utc>) -> bool {
        self.departure_at() <= now
    }
}

/// A passenger's claim on a seat of a trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    /// Unique booking identifier
    pub booking_id: BookingId,
    /// Owning passenger
    pub passenger_id: PassengerId,
    /// Booked trip
    pub trip_id: TripId,
    /// Trip direction, denormalized for the per-direction uniqueness constraint
    pub direction: Direction,
    /// Booking status
    pub status: BookingStatus,
    /// Signed boarding token; present iff status is CONFIRMED or BOARDED
    pub boarding_token: Option<String>,
    /// 1-based FIFO rank; present iff status is WAITLIST
    pub waitlist_position: Option<i32>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Time the passenger was scanned aboard, set exactly once
    pub boarded_at: Option<DateTime<Utc>>,
}

/// A record binding an operator to a trip for a single run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TripAssignment {
    /// Unique assignment identifier
    pub assignment_id: AssignmentId,
    /// Trip being run
    pub trip_id: TripId,
    /// Operator running it
    pub operator_id: OperatorId,
    /// Bus label for this run
    pub bus_label: String,
    /// Assignment status
    pub status: AssignmentStatus,
    /// When the assignment was created
    pub assigned_at: DateTime<Utc>,
    /// When the operator started the run
    pub started_at: Option<DateTime<Utc>>,
    /// When the run finished
    pub completed_at: Option<DateTime<Utc>>,
}

/// An operator-filed misconduct report.
///
/// Immutable after creation except for `status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MisconductReport {
    /// Unique report identifier
    pub report_id: ReportId,
    /// Reported passenger
    pub passenger_id: PassengerId,
    /// Trip on which the incident occurred
    pub trip_id: TripId,
    /// Reporting operator
    pub operator_id: OperatorId,
    /// Incident category
    pub reason: ReportReason,
    /// Free-text details; required when reason is OTHER
    pub comments: Option<String>,
    /// Blob-store locator of the evidence photo, if the upload succeeded
    pub evidence_locator: Option<String>,
    /// Review status
    pub status: ReportStatus,
    /// Filing time
    pub reported_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn passenger(penalties: i32, blocked_until: Option<DateTime<Utc>>) -> Passenger {
        Passenger {
            passenger_id: PassengerId::new(),
            email: "s1@campus.edu".to_string(),
            display_name: "S One".to_string(),
            room: None,
            phone: None,
            penalty_count: penalties,
            blocked_until,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn blocked_requires_both_penalties_and_live_block() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let future = Some(now + Duration::days(1));
        let past = Some(now - Duration::days(1));

        assert!(passenger(3, future).is_blocked(now));
        assert!(passenger(5, future).is_blocked(now));
        assert!(!passenger(2, future).is_blocked(now), "below penalty floor");
        assert!(!passenger(3, past).is_blocked(now), "block expired");
        assert!(!passenger(3, None).is_blocked(now), "no block window");
    }

    #[test]
    fn profile_complete_needs_room_and_phone() {
        let mut p = passenger(0, None);
        assert!(!p.profile_complete());
        p.room = Some("H4-210".to_string());
        assert!(!p.profile_complete());
        p.phone = Some("+91-9999999999".to_string());
        assert!(p.profile_complete());
    }

    #[test]
    fn trip_departure_and_student_seats() {
        let trip = Trip {
            trip_id: TripId::new(),
            direction: Direction::CampusToCity,
            destination: None,
            bus_label: None,
            trip_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            departure_time: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            capacity: 35,
            faculty_reserved: 5,
            status: TripStatus::Active,
            day_class: DayClass::Weekday,
            created_at: Utc::now(),
        };

        assert_eq!(trip.student_seats(), 30);

        let before = Utc.with_ymd_and_hms(2026, 3, 2, 18, 29, 59).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 18, 30, 0).unwrap();
        assert!(!trip.is_departed(before));
        assert!(trip.is_departed(at));
    }

    #[test]
    fn booking_status_classes() {
        assert!(BookingStatus::Confirmed.is_non_terminal());
        assert!(BookingStatus::Waitlist.is_non_terminal());
        assert!(BookingStatus::Boarded.is_non_terminal());
        assert!(!BookingStatus::Cancelled.is_non_terminal());

        assert!(BookingStatus::Confirmed.occupies_seat());
        assert!(BookingStatus::Boarded.occupies_seat());
        assert!(!BookingStatus::Waitlist.occupies_seat());
        assert!(!BookingStatus::Cancelled.occupies_seat());
    }

    #[test]
    fn direction_wire_names() {
        assert_eq!(Direction::CampusToCity.as_str(), "CAMPUS_TO_CITY");
        assert_eq!(
            serde_json::to_string(&Direction::CityToCampus).unwrap(),
            "\"CITY_TO_CAMPUS\""
        );
    }
}
