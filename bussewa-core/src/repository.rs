use crate::leg::{Leg, LegSelection};
use crate::models::{Booking, Bus, CancellationReason, Journey, SeatCancellation};
use crate::StoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seat change for one leg. `bus_id: None` leaves the leg's bus untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LegSeatUpdate {
    pub leg: Leg,
    pub seat_number: String,
    pub bus_id: Option<Uuid>,
}

/// Partial booking fields sent to the store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingUpdate {
    pub seat: Option<LegSeatUpdate>,
    pub is_volunteer: Option<bool>,
    pub remarks: Option<String>,
}

impl BookingUpdate {
    pub fn assign(leg: Leg, seat_number: u32, bus_id: Uuid) -> Self {
        Self {
            seat: Some(LegSeatUpdate {
                leg,
                seat_number: seat_number.to_string(),
                bus_id: Some(bus_id),
            }),
            ..Self::default()
        }
    }

    pub fn clear(leg: Leg) -> Self {
        Self {
            seat: Some(LegSeatUpdate {
                leg,
                seat_number: String::new(),
                bus_id: None,
            }),
            ..Self::default()
        }
    }

    /// Put the booking on another bus; the seat never carries over.
    pub fn move_to(leg: Leg, bus_id: Uuid) -> Self {
        Self {
            seat: Some(LegSeatUpdate {
                leg,
                seat_number: String::new(),
                bus_id: Some(bus_id),
            }),
            ..Self::default()
        }
    }

    pub fn volunteer(flag: bool) -> Self {
        Self {
            is_volunteer: Some(flag),
            ..Self::default()
        }
    }
}

/// External booking store.
///
/// Implementations must reject a write that would put two bookings in the
/// same (bus, leg, seat) with [`crate::StoreError::Conflict`].
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn list_bookings(&self) -> StoreResult<Vec<Booking>>;

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    async fn update_booking(&self, id: Uuid, update: BookingUpdate) -> StoreResult<Booking>;

    /// Cancel the legs in `scope`, clearing their seats in the same write.
    async fn cancel_booking(
        &self,
        id: Uuid,
        scope: LegSelection,
        reason: CancellationReason,
        notes: String,
    ) -> StoreResult<SeatCancellation>;
}

/// External registry of buses and journey dates
#[async_trait]
pub trait BusDirectory: Send + Sync {
    async fn list_buses(&self, leg: Option<Leg>) -> StoreResult<Vec<Bus>>;

    async fn list_journeys(&self, active_only: bool) -> StoreResult<Vec<Journey>>;
}
