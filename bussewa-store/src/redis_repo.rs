use async_trait::async_trait;
use bussewa_core::{
    Booking, BookingStore, BookingUpdate, CancellationReason, Leg, LegSelection,
    SeatCancellation, StoreError, StoreResult,
};
use redis::AsyncCommands;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Cross-process seat claims keyed by (bus, leg, seat).
#[async_trait]
pub trait SeatLocks: Send + Sync {
    /// Claim the seat for `booking_id`. `false` means someone else holds it.
    async fn acquire(&self, bus_id: Uuid, leg: Leg, seat_number: u32, booking_id: Uuid) -> StoreResult<bool>;

    async fn holder(&self, bus_id: Uuid, leg: Leg, seat_number: u32) -> StoreResult<Option<Uuid>>;

    /// Drop the claim, but only if `booking_id` still holds it.
    async fn release(&self, bus_id: Uuid, leg: Leg, seat_number: u32, booking_id: Uuid) -> StoreResult<bool>;
}

fn seat_key(bus_id: Uuid, leg: Leg, seat_number: u32) -> String {
    format!("seat:{}:{}:{}", bus_id, leg.as_str(), seat_number)
}

fn unavailable(err: redis::RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[derive(Clone)]
pub struct RedisSeatLocks {
    client: redis::Client,
    ttl_seconds: u64,
}

impl RedisSeatLocks {
    /// `ttl_seconds` of 0 keeps claims until they are released.
    pub fn new(connection_string: &str, ttl_seconds: u64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client, ttl_seconds })
    }

    pub fn from_config(config: &crate::app_config::RedisConfig) -> Result<Self, redis::RedisError> {
        Self::new(&config.url, config.lock_ttl_seconds)
    }
}

#[async_trait]
impl SeatLocks for RedisSeatLocks {
    async fn acquire(&self, bus_id: Uuid, leg: Leg, seat_number: u32, booking_id: Uuid) -> StoreResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(unavailable)?;
        let key = seat_key(bus_id, leg, seat_number);

        // SET NX: only set if nobody holds the seat
        let mut cmd = redis::cmd("SET");
        cmd.arg(&key).arg(booking_id.to_string()).arg("NX");
        if self.ttl_seconds > 0 {
            cmd.arg("EX").arg(self.ttl_seconds);
        }
        let result: Option<String> = cmd.query_async(&mut conn).await.map_err(unavailable)?;

        debug!(key = %key, acquired = result.is_some(), "Seat lock attempt");
        Ok(result.is_some())
    }

    async fn holder(&self, bus_id: Uuid, leg: Leg, seat_number: u32) -> StoreResult<Option<Uuid>> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(unavailable)?;
        let value: Option<String> = conn
            .get(seat_key(bus_id, leg, seat_number))
            .await
            .map_err(unavailable)?;

        value
            .map(|raw| {
                Uuid::parse_str(&raw)
                    .map_err(|e| StoreError::Backend(format!("bad seat lock value {raw:?}: {e}")))
            })
            .transpose()
    }

    async fn release(&self, bus_id: Uuid, leg: Leg, seat_number: u32, booking_id: Uuid) -> StoreResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(unavailable)?;
        // Compare-and-delete so a stale release never drops another booking's claim
        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
        "#,
        );

        let removed: i64 = script
            .key(seat_key(bus_id, leg, seat_number))
            .arg(booking_id.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(removed == 1)
    }
}

/// [`BookingStore`] wrapper that takes a seat claim before every seat write.
///
/// Use it when several processes write to a store that cannot enforce
/// uniqueness itself.
pub struct SeatLockedStore<S, L = RedisSeatLocks> {
    inner: S,
    locks: L,
}

impl<S: BookingStore, L: SeatLocks> SeatLockedStore<S, L> {
    pub fn new(inner: S, locks: L) -> Self {
        Self { inner, locks }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Best effort: a failed release only leaves a stale claim behind.
    async fn release_quietly(&self, bus_id: Uuid, leg: Leg, seat_number: u32, booking_id: Uuid) {
        if let Err(err) = self.locks.release(bus_id, leg, seat_number, booking_id).await {
            warn!(%bus_id, %leg, seat_number, error = %err, "Failed to release seat lock");
        }
    }

    /// Returns `true` when this call created the claim.
    async fn claim(&self, bus_id: Uuid, leg: Leg, seat_number: u32, booking_id: Uuid) -> StoreResult<bool> {
        if self.locks.acquire(bus_id, leg, seat_number, booking_id).await? {
            return Ok(true);
        }

        match self.locks.holder(bus_id, leg, seat_number).await? {
            Some(holder) if holder == booking_id => Ok(false),
            Some(holder) => Err(StoreError::Conflict { bus_id, leg, seat_number, holder }),
            // Expired between the two calls; try once more
            None if self.locks.acquire(bus_id, leg, seat_number, booking_id).await? => Ok(true),
            None => Err(StoreError::Unavailable(format!(
                "seat {seat_number} on bus {bus_id} changed hands while claiming"
            ))),
        }
    }
}

fn held_seat(booking: &Booking, leg: Leg) -> Option<(Uuid, u32)> {
    let seat = booking.leg(leg);
    if !seat.is_assigned() {
        return None;
    }
    Some((seat.bus_id?, seat.seat_index()?))
}

#[async_trait]
impl<S: BookingStore, L: SeatLocks> BookingStore for SeatLockedStore<S, L> {
    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        self.inner.list_bookings().await
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        self.inner.get_booking(id).await
    }

    async fn update_booking(&self, id: Uuid, update: BookingUpdate) -> StoreResult<Booking> {
        let Some(change) = update.seat.clone() else {
            return self.inner.update_booking(id, update).await;
        };
        let leg = change.leg;

        let current = self.inner.get_booking(id).await?.ok_or(StoreError::NotFound(id))?;
        let previous = held_seat(&current, leg);

        let mut target = current.clone();
        target.apply(&update);
        let next = held_seat(&target, leg);

        let claimed = match next {
            Some((bus_id, seat_number)) => self.claim(bus_id, leg, seat_number, id).await?,
            None => false,
        };

        match self.inner.update_booking(id, update).await {
            Ok(updated) => {
                if let Some((bus_id, seat_number)) = previous {
                    if previous != next {
                        self.release_quietly(bus_id, leg, seat_number, id).await;
                    }
                }
                Ok(updated)
            }
            Err(err) => {
                if let (true, Some((bus_id, seat_number))) = (claimed, next) {
                    info!(booking_id = %id, seat_number, "Write failed, releasing seat lock");
                    self.release_quietly(bus_id, leg, seat_number, id).await;
                }
                Err(err)
            }
        }
    }

    async fn cancel_booking(
        &self,
        id: Uuid,
        scope: LegSelection,
        reason: CancellationReason,
        notes: String,
    ) -> StoreResult<SeatCancellation> {
        let current = self.inner.get_booking(id).await?.ok_or(StoreError::NotFound(id))?;
        let record = self.inner.cancel_booking(id, scope, reason, notes).await?;

        for leg in scope.legs() {
            if let Some((bus_id, seat_number)) = held_seat(&current, leg) {
                self.release_quietly(bus_id, leg, seat_number, id).await;
            }
        }
        Ok(record)
    }
}
