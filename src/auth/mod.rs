//! Request identity: bearer-token extraction and session extractors.

pub mod middleware;

pub use middleware::{BearerToken, OperatorSession, PassengerSession};
