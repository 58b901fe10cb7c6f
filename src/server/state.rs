//! Application state for the HTTP server.
//!
//! All configuration and collaborators are bound at process start; handlers
//! clone the state (cheap, everything is `Arc` or pool-backed) and hold no
//! static framework state of their own.

use crate::booking::BookingEngine;
use crate::clock::Clock;
use crate::config::Config;
use crate::evidence::EvidenceService;
use crate::operators::OperatorService;
use crate::stores::{BookingRepository, Database, PassengerRepository, TripRepository};
use crate::telemetry::TelemetryPublisher;
use crate::token::TokenService;
use std::sync::Arc;

/// Shared state for every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    /// Configuration (for settings read at request time)
    pub config: Arc<Config>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Token signing and verification
    pub tokens: TokenService,
    /// Identity store handle
    pub db: Database,
    /// Booking engine (allocation, cancellation, boarding)
    pub engine: BookingEngine,
    /// Operator sessions and assignments
    pub operators: OperatorService,
    /// Telemetry publisher
    pub telemetry: TelemetryPublisher,
    /// Misconduct-report intake
    pub evidence: EvidenceService,
    /// Passenger repository (profile and login reads)
    pub passengers: PassengerRepository,
    /// Trip repository (listings and creation)
    pub trips: TripRepository,
    /// Booking repository (history and manifest reads)
    pub bookings: BookingRepository,
}
