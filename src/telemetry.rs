//! Telemetry publisher.
//!
//! Accepts position reports from an active operator and forwards them to the
//! topic `{prefix}/{trip_id}` with at-least-once delivery. Nothing is
//! persisted here: a dropped publish is superseded by the next periodic one,
//! and consumers must not assume ordering against bookings.

use crate::config::TelemetryConfig;
use crate::error::{Error, Result};
use crate::types::TripId;
use chrono::{DateTime, Utc};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use serde::Serialize;
use std::time::Duration;

/// Position payload published to the topic.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Trip the bus is running
    pub trip_id: TripId,
    /// Latitude, degrees in [-90, 90]
    pub lat: f64,
    /// Longitude, degrees in [-180, 180]
    pub lon: f64,
    /// Speed in km/h; 0 when the device does not report one
    pub speed: f64,
    /// Report time
    pub ts: DateTime<Utc>,
}

/// Publishes operator position reports to the telemetry topic.
#[derive(Clone)]
pub struct TelemetryPublisher {
    producer: FutureProducer,
    topic_prefix: String,
    timeout: Duration,
}

impl TelemetryPublisher {
    /// Build the producer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `INTERNAL` if the producer cannot be constructed.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", config.publish_timeout_ms.to_string())
            // At-least-once: leader acknowledgement and retries are enough;
            // duplicate positions are harmless.
            .set("acks", "1")
            .create()
            .map_err(Error::internal)?;

        Ok(Self {
            producer,
            topic_prefix: config.topic_prefix.clone(),
            timeout: Duration::from_millis(config.publish_timeout_ms),
        })
    }

    /// Topic for a trip's positions.
    #[must_use]
    pub fn topic_for(&self, trip_id: TripId) -> String {
        format!("{}/{trip_id}", self.topic_prefix)
    }

    /// Validate and publish one position report. `speed` defaults to 0 and
    /// `ts` to now.
    ///
    /// # Errors
    ///
    /// `INVALID_COORDINATE` for out-of-range positions;
    /// `TELEMETRY_UNAVAILABLE` when the topic rejects or times out the
    /// publish (the operator app retries at its next cadence).
    pub async fn publish_position(
        &self,
        trip_id: TripId,
        lat: f64,
        lon: f64,
        speed: Option<f64>,
        ts: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Position> {
        validate_coordinates(lat, lon)?;

        let position = Position {
            trip_id,
            lat,
            lon,
            speed: speed.unwrap_or(0.0),
            ts: ts.unwrap_or(now),
        };

        // Positions are plain data; serialization cannot fail.
        let payload = serde_json::to_vec(&position).unwrap_or_default();
        let topic = self.topic_for(trip_id);
        let key = trip_id.to_string();

        self.producer
            .send(
                FutureRecord::to(&topic).key(&key).payload(&payload),
                Timeout::After(self.timeout),
            )
            .await
            .map_err(|(err, _)| {
                tracing::warn!(%trip_id, error = %err, "telemetry publish failed");
                Error::TelemetryUnavailable
            })?;

        tracing::debug!(%trip_id, lat, lon, "position published");
        Ok(position)
    }
}

/// Reject positions outside the WGS84 coordinate ranges.
///
/// # Errors
///
/// Returns `INVALID_COORDINATE` when either component is out of range or
/// not a number.
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(Error::InvalidCoordinate);
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::InvalidCoordinate);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn coordinate_ranges_are_inclusive() {
        assert!(validate_coordinates(0.0, 0.0).is_ok());
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(validate_coordinates(-90.0, -180.0).is_ok());

        assert!(validate_coordinates(90.001, 0.0).is_err());
        assert!(validate_coordinates(-90.001, 0.0).is_err());
        assert!(validate_coordinates(0.0, 180.001).is_err());
        assert!(validate_coordinates(0.0, -180.001).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
        assert!(validate_coordinates(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn payload_uses_the_wire_field_names() {
        let position = Position {
            trip_id: TripId::new(),
            lat: 26.936,
            lon: 75.923,
            speed: 42.0,
            ts: Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap(),
        };
        let value = serde_json::to_value(&position).unwrap();
        let obj = value.as_object().unwrap();

        for key in ["tripId", "lat", "lon", "speed", "ts"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 5);
    }
}
