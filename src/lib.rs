//! Transactional core of the campus bus reservation service.
//!
//! Arbitrates finite seats on scheduled trips among concurrent passengers,
//! maintains a strictly ordered waitlist with atomic promotion, issues and
//! validates signed single-use boarding tokens, and runs the operator-side
//! trip lifecycle with position telemetry and misconduct capture.
//!
//! # Architecture
//!
//! A stateless request tier over four backing services:
//!
//! - **Identity store** (`PostgreSQL` via `sqlx`): the authoritative home of
//!   passengers, operators, trips, bookings, assignments, and reports.
//!   Every seat-affecting transition happens inside a single serializable
//!   transaction.
//! - **Coordination store** (Redis): short-TTL leases that serialise
//!   writers per trip (`book:`, `cancel:`) and per booking (`scan:`). The
//!   transaction re-checks stay authoritative; the leases provide fairness
//!   and cut conflict rates.
//! - **Telemetry topic** (Kafka-compatible): fire-and-forward position
//!   publication, at-least-once, keyed by trip.
//! - **Blob store** (`object_store`): evidence photos, uploaded server-side
//!   so clients can never forge a locator.
//!
//! Request flow: [`server`] routes → [`auth`] extractors ([`token`] MACs) →
//! one of [`booking`], [`operators`], [`telemetry`], [`evidence`] →
//! [`stores`] / [`coord`].

pub mod api;
pub mod auth;
pub mod booking;
pub mod clock;
pub mod config;
pub mod coord;
pub mod error;
pub mod evidence;
pub mod operators;
pub mod server;
pub mod stores;
pub mod telemetry;
pub mod token;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
