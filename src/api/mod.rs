//! HTTP handlers: the request boundary.
//!
//! Handlers parse, authenticate via the extractor types, dispatch to one
//! component, and shape the response. No business logic lives here.

pub mod auth;
pub mod boarding;
pub mod bookings;
pub mod operator;
pub mod trips;

use crate::error::Error;
use axum::extract::{FromRequest, Request};
use axum::{async_trait, Json};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// JSON body extractor that maps every deserialization failure to
/// `MALFORMED_REQUEST`, keeping the error surface uniform.
pub struct Body<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Body<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|_| Error::MalformedRequest)?;
        Ok(Self(value))
    }
}

/// Parse a path segment as a UUID, surfacing `MALFORMED_REQUEST` instead of
/// the default rejection text.
pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw).map_err(|_| Error::MalformedRequest)
}
