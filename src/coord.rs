//! Coordination store: short-TTL leases in Redis.
//!
//! Booking, cancellation, and scan paths each serialise their writers with a
//! per-key lease (`book:{trip_id}`, `cancel:{trip_id}`, `scan:{booking_id}`).
//! A lease is a `SET NX PX` sentinel holding a random owner value; release
//! deletes the key only if the owner still matches, so a slow worker cannot
//! drop a lease that has already expired and been re-acquired by someone
//! else. The TTL bounds the critical section even if the process crashes.
//!
//! Leases are an admission aid; the identity-store transaction re-checks are
//! authoritative. Never hold two leases at once.

use crate::error::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use redis::aio::ConnectionManager;
use redis::Client;

use crate::types::{BookingId, TripId};

/// Lease TTL and connection handle over the coordination store.
#[derive(Clone)]
pub struct CoordStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    /// Lease lifetime in milliseconds.
    ttl_ms: u64,
}

/// A held lease. Pass it back to [`CoordStore::release`] when the critical
/// section ends; if the process dies first, the TTL releases it.
#[derive(Debug)]
pub struct Lease {
    key: String,
    owner: String,
}

impl Lease {
    /// The lease key (for logging).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl CoordStore {
    /// Connect to the coordination store.
    ///
    /// # Errors
    ///
    /// Returns `STORE_UNAVAILABLE` if the connection cannot be established.
    pub async fn connect(redis_url: &str, ttl_seconds: u64) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await?;
        Ok(Self {
            conn_manager,
            ttl_ms: ttl_seconds * 1000,
        })
    }

    /// Lease key guarding seat allocation for a trip.
    #[must_use]
    pub fn booking_key(trip_id: TripId) -> String {
        format!("book:{trip_id}")
    }

    /// Lease key guarding cancellation/promotion for a trip.
    #[must_use]
    pub fn cancel_key(trip_id: TripId) -> String {
        format!("cancel:{trip_id}")
    }

    /// Lease key guarding scans of a booking.
    #[must_use]
    pub fn scan_key(booking_id: BookingId) -> String {
        format!("scan:{booking_id}")
    }

    /// Try to acquire the lease once. `None` means another writer holds it;
    /// callers surface that as their retriable conflict kind.
    ///
    /// # Errors
    ///
    /// Returns `STORE_UNAVAILABLE` if Redis is unreachable.
    pub async fn try_acquire(&self, key: String) -> Result<Option<Lease>> {
        let mut conn = self.conn_manager.clone();
        let owner = random_owner();

        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&owner)
            .arg("NX")
            .arg("PX")
            .arg(self.ttl_ms)
            .query_async(&mut conn)
            .await?;

        Ok(reply.map(|_| Lease { key, owner }))
    }

    /// Release a held lease. Best-effort: a failed release is logged and the
    /// TTL cleans up; the caller's result does not depend on it.
    pub async fn release(&self, lease: Lease) {
        let mut conn = self.conn_manager.clone();

        // Compare-owner-delete, atomic on the server.
        let script = redis::Script::new(
            r"if redis.call('get', KEYS[1]) == ARGV[1] then
                  return redis.call('del', KEYS[1])
              else
                  return 0
              end",
        );

        let released: std::result::Result<i64, redis::RedisError> = script
            .key(&lease.key)
            .arg(&lease.owner)
            .invoke_async(&mut conn)
            .await;

        match released {
            Ok(1) => {}
            Ok(_) => {
                tracing::debug!(key = %lease.key, "lease already expired before release");
            }
            Err(err) => {
                tracing::warn!(key = %lease.key, error = %err, "lease release failed; TTL will reclaim");
            }
        }
    }
}

/// 128-bit random owner value, base64url encoded.
fn random_owner() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_keys_are_scoped_by_operation() {
        let trip = TripId::new();
        let booking = BookingId::new();

        assert_eq!(CoordStore::booking_key(trip), format!("book:{trip}"));
        assert_eq!(CoordStore::cancel_key(trip), format!("cancel:{trip}"));
        assert_eq!(CoordStore::scan_key(booking), format!("scan:{booking}"));
    }

    #[test]
    fn owner_values_are_unique_and_url_safe() {
        let a = random_owner();
        let b = random_owner();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
