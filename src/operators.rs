//! Operator sessions and trip assignments.
//!
//! Login verifies the employee's password against its salted argon2
//! verifier and mints a 24-hour operator session. The day roster derives a
//! per-trip status from assignments and departure times. Starting an
//! assignment is guarded by the one-live-assignment-per-trip invariant.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::stores::{AssignmentRepository, OperatorRepository, TripRepository};
use crate::token::TokenService;
use crate::types::{
    AssignmentStatus, Operator, OperatorId, OperatorStatus, RosterStatus, Trip, TripAssignment,
    TripId,
};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Successful login: the minted session and the operator it belongs to.
#[derive(Clone, Debug)]
pub struct OperatorLogin {
    /// Signed operator session token
    pub token: String,
    /// The authenticated operator
    pub operator: Operator,
}

/// One row of the operator's day roster.
#[derive(Clone, Debug)]
pub struct RosterEntry {
    /// The trip
    pub trip: Trip,
    /// Derived status for this operator
    pub status: RosterStatus,
}

/// Operator authentication and assignment lifecycle.
#[derive(Clone)]
pub struct OperatorService {
    operators: OperatorRepository,
    trips: TripRepository,
    assignments: AssignmentRepository,
    tokens: TokenService,
    clock: Arc<dyn Clock>,
}

impl OperatorService {
    /// Assemble the service from its collaborators.
    #[must_use]
    pub fn new(
        operators: OperatorRepository,
        trips: TripRepository,
        assignments: AssignmentRepository,
        tokens: TokenService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            operators,
            trips,
            assignments,
            tokens,
            clock,
        }
    }

    /// Authenticate an operator by employee ID and password.
    ///
    /// # Errors
    ///
    /// `BAD_CREDENTIALS` for an unknown account or wrong password (the two
    /// are indistinguishable to the caller), `ACCOUNT_SUSPENDED` for
    /// non-active accounts, or a storage error.
    pub async fn login(&self, employee_id: &str, password: &str) -> Result<OperatorLogin> {
        let Some(operator) = self.operators.find_by_employee_id(employee_id).await? else {
            return Err(Error::BadCredentials);
        };

        if operator.status != OperatorStatus::Active {
            return Err(Error::AccountSuspended);
        }

        if !verify_password(password, &operator.password_verifier) {
            return Err(Error::BadCredentials);
        }

        let now = self.clock.now();
        self.operators
            .touch_last_login(operator.operator_id, now)
            .await?;

        let token =
            self.tokens
                .issue_operator_session(operator.operator_id, &operator.employee_id, now);

        tracing::info!(operator_id = %operator.operator_id, "operator logged in");
        Ok(OperatorLogin { token, operator })
    }

    /// The operator's roster for a date: every active trip with a derived
    /// status.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a query fails.
    pub async fn day_roster(
        &self,
        operator_id: OperatorId,
        date: NaiveDate,
    ) -> Result<Vec<RosterEntry>> {
        let trips = self.trips.list_for_date(date).await?;
        let trip_ids: Vec<TripId> = trips.iter().map(|t| t.trip_id).collect();

        let own: HashMap<TripId, TripAssignment> = self
            .assignments
            .for_operator_on(operator_id, date)
            .await?
            .into_iter()
            .map(|a| (a.trip_id, a))
            .collect();

        let live: HashSet<TripId> = self
            .assignments
            .any_live_for_trips(&trip_ids)
            .await?
            .into_iter()
            .map(|a| a.trip_id)
            .collect();

        let now = self.clock.now();
        Ok(trips
            .into_iter()
            .map(|trip| {
                let status = derive_roster_status(
                    trip.is_departed(now),
                    own.get(&trip.trip_id),
                    live.contains(&trip.trip_id),
                );
                RosterEntry { trip, status }
            })
            .collect())
    }

    /// Start running a trip: insert an IN_PROGRESS assignment.
    ///
    /// # Errors
    ///
    /// `NOT_FOUND` for an unknown trip, `TRIP_ALREADY_ACTIVE` if any
    /// operator already has a live assignment for it, or a storage error.
    pub async fn start_assignment(
        &self,
        operator_id: OperatorId,
        trip_id: TripId,
        bus_label: &str,
    ) -> Result<TripAssignment> {
        self.trips.find(trip_id).await?.ok_or(Error::NotFound)?;

        // Friendly pre-check; the partial unique index is the backstop for
        // two operators racing this call.
        if self.assignments.live_for_trip(trip_id).await?.is_some() {
            return Err(Error::TripAlreadyActive);
        }

        let now = self.clock.now();
        let assignment = TripAssignment {
            assignment_id: crate::types::AssignmentId::new(),
            trip_id,
            operator_id,
            bus_label: bus_label.to_string(),
            status: AssignmentStatus::InProgress,
            assigned_at: now,
            started_at: Some(now),
            completed_at: None,
        };
        self.assignments.insert(&assignment).await?;

        tracing::info!(
            assignment_id = %assignment.assignment_id,
            %trip_id,
            %operator_id,
            "assignment started"
        );
        Ok(assignment)
    }

    /// Finish the caller's live assignment for a trip.
    ///
    /// # Errors
    ///
    /// `NOT_FOUND` if the operator has no IN_PROGRESS assignment for the
    /// trip, or a storage error.
    pub async fn end_assignment(
        &self,
        operator_id: OperatorId,
        trip_id: TripId,
    ) -> Result<TripAssignment> {
        let now = self.clock.now();
        let assignment = self
            .assignments
            .complete(trip_id, operator_id, now)
            .await?
            .ok_or(Error::NotFound)?;

        tracing::info!(
            assignment_id = %assignment.assignment_id,
            %trip_id,
            %operator_id,
            "assignment completed"
        );
        Ok(assignment)
    }
}

/// Derive the roster status of one trip for one operator.
///
/// In progress if this operator's assignment is live; completed if their
/// assignment finished, or the trip departed with no live assignment from
/// anyone; upcoming otherwise.
fn derive_roster_status(
    departed: bool,
    own: Option<&TripAssignment>,
    any_live: bool,
) -> RosterStatus {
    match own.map(|a| a.status) {
        Some(AssignmentStatus::InProgress) => RosterStatus::InProgress,
        Some(AssignmentStatus::Completed) => RosterStatus::Completed,
        _ if departed && !any_live => RosterStatus::Completed,
        _ => RosterStatus::Upcoming,
    }
}

/// Hash a password into a salted argon2 PHC verifier string.
///
/// # Errors
///
/// Returns `INTERNAL` if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::internal(anyhow::anyhow!("password hashing failed: {e}")))
}

/// Verify a password against its stored verifier. An unparseable verifier
/// counts as a mismatch.
#[must_use]
pub fn verify_password(password: &str, verifier: &str) -> bool {
    PasswordHash::new(verifier)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssignmentId;
    use chrono::Utc;

    fn assignment(status: AssignmentStatus) -> TripAssignment {
        TripAssignment {
            assignment_id: AssignmentId::new(),
            trip_id: TripId::new(),
            operator_id: OperatorId::new(),
            bus_label: "Bus #05".to_string(),
            status,
            assigned_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn own_live_assignment_wins() {
        let own = assignment(AssignmentStatus::InProgress);
        assert_eq!(
            derive_roster_status(false, Some(&own), true),
            RosterStatus::InProgress
        );
        // Even past departure, a live run stays in progress.
        assert_eq!(
            derive_roster_status(true, Some(&own), true),
            RosterStatus::InProgress
        );
    }

    #[test]
    fn completed_assignment_reads_completed() {
        let own = assignment(AssignmentStatus::Completed);
        assert_eq!(
            derive_roster_status(false, Some(&own), false),
            RosterStatus::Completed
        );
    }

    #[test]
    fn departed_trip_with_no_live_run_reads_completed() {
        assert_eq!(derive_roster_status(true, None, false), RosterStatus::Completed);
    }

    #[test]
    fn departed_trip_someone_else_is_running_stays_upcoming_for_me() {
        assert_eq!(derive_roster_status(true, None, true), RosterStatus::Upcoming);
    }

    #[test]
    fn future_trip_with_no_assignment_is_upcoming() {
        assert_eq!(derive_roster_status(false, None, false), RosterStatus::Upcoming);
    }

    #[test]
    fn password_round_trip() {
        let verifier = hash_password("buspass").unwrap();
        assert!(verifier.starts_with("$argon2"));
        assert!(verify_password("buspass", &verifier));
        assert!(!verify_password("wrong", &verifier));
    }

    #[test]
    fn unparseable_verifier_is_a_mismatch() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
