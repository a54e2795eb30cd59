use crate::eligibility::EligibilityFilter;
use crate::error::{SeatingError, SeatingResult, ValidationError};
use crate::events::{now, SeatEvent};
use crate::retry::{retry_transient, RetryPolicy};
use bussewa_core::{
    Booking, BookingStore, BookingUpdate, Bus, CancellationReason, Leg, LegSelection,
    SeatCancellation,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Applies seat changes to the external booking store.
///
/// Each call is validated locally, then sent as a single update. Seat
/// uniqueness is left to the store, so two operators racing for a seat get
/// one success and one [`SeatingError::Conflict`].
pub struct SeatAssigner {
    store: Arc<dyn BookingStore>,
    retry: RetryPolicy,
    events: Option<broadcast::Sender<SeatEvent>>,
}

pub fn validate_seat(seat_number: u32, bus: &Bus) -> Result<(), ValidationError> {
    if bus.capacity == 0 {
        return Err(ValidationError::InvalidCapacity(bus.id));
    }
    if !(1..=bus.capacity).contains(&seat_number) {
        return Err(ValidationError::SeatOutOfRange {
            seat_number,
            capacity: bus.capacity,
        });
    }
    Ok(())
}

impl SeatAssigner {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
            events: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Publish a [`SeatEvent`] after every successful write.
    pub fn with_events(mut self, events: broadcast::Sender<SeatEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn store(&self) -> &Arc<dyn BookingStore> {
        &self.store
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch the current booking snapshot, retrying transient failures.
    pub async fn snapshot(&self) -> SeatingResult<Vec<Booking>> {
        let store = &self.store;
        let bookings = retry_transient(&self.retry, "list_bookings", || store.list_bookings()).await?;
        Ok(bookings)
    }

    /// Put a booking in `seat_number` on `bus` for `leg`.
    ///
    /// Re-sending the same assignment is harmless; the store sees the seat
    /// already held by this booking.
    #[instrument(skip(self, bus), fields(bus_id = ?bus.map(|b| b.id)))]
    pub async fn assign_seat(
        &self,
        booking_id: Uuid,
        seat_number: u32,
        bus: Option<&Bus>,
        leg: Leg,
    ) -> SeatingResult<Booking> {
        let bus = bus.ok_or(ValidationError::MissingBus)?;
        validate_seat(seat_number, bus)?;

        self.fetch_placeable(booking_id, bus, leg).await?;
        self.place(booking_id, seat_number, bus, leg).await
    }

    /// Re-fetch a booking and check it may still be seated on `bus`.
    pub(crate) async fn fetch_placeable(&self, booking_id: Uuid, bus: &Bus, leg: Leg) -> SeatingResult<Booking> {
        let booking = self.fetch(booking_id).await?;
        EligibilityFilter::new(leg, Some(bus))
            .check_placeable(&booking)
            .map_err(|reason| SeatingError::NotEligible { booking_id, reason })?;
        Ok(booking)
    }

    /// Write an already validated seat and announce it.
    pub(crate) async fn place(
        &self,
        booking_id: Uuid,
        seat_number: u32,
        bus: &Bus,
        leg: Leg,
    ) -> SeatingResult<Booking> {
        let updated = self
            .write(booking_id, BookingUpdate::assign(leg, seat_number, bus.id))
            .await?;

        info!(
            booking_id = %booking_id,
            passenger = %updated.passenger.name,
            seat_number,
            leg = %leg,
            "Seat assigned"
        );
        self.publish(SeatEvent::SeatAssigned {
            booking_id,
            bus_id: bus.id,
            leg,
            seat_number,
            at: now(),
        });

        Ok(updated)
    }

    /// Clear the seat for `leg`. The leg's bus stays as it was.
    #[instrument(skip(self))]
    pub async fn clear_seat(&self, booking_id: Uuid, leg: Leg) -> SeatingResult<Booking> {
        let previous_seat = self.fetch(booking_id).await?.leg(leg).seat_number.clone();

        let updated = self.write(booking_id, BookingUpdate::clear(leg)).await?;

        info!(booking_id = %booking_id, leg = %leg, previous_seat = %previous_seat, "Seat cleared");
        self.publish(SeatEvent::SeatCleared {
            booking_id,
            leg,
            previous_seat,
            at: now(),
        });

        Ok(updated)
    }

    /// Move the booking to `new_bus` for `leg`. The seat is always cleared;
    /// both fields travel in one update.
    #[instrument(skip(self, new_bus), fields(new_bus_id = %new_bus.id))]
    pub async fn move_bus(&self, booking_id: Uuid, leg: Leg, new_bus: &Bus) -> SeatingResult<Booking> {
        if new_bus.capacity == 0 {
            return Err(ValidationError::InvalidCapacity(new_bus.id).into());
        }

        let updated = self
            .write(booking_id, BookingUpdate::move_to(leg, new_bus.id))
            .await?;

        info!(booking_id = %booking_id, leg = %leg, bus = %new_bus.number, "Booking moved to another bus");
        self.publish(SeatEvent::BusChanged {
            booking_id,
            leg,
            bus_id: new_bus.id,
            at: now(),
        });

        Ok(updated)
    }

    pub async fn set_volunteer(&self, booking_id: Uuid, is_volunteer: bool) -> SeatingResult<Booking> {
        let updated = self
            .write(booking_id, BookingUpdate::volunteer(is_volunteer))
            .await?;

        info!(booking_id = %booking_id, is_volunteer, "Volunteer flag updated");
        self.publish(SeatEvent::VolunteerChanged {
            booking_id,
            is_volunteer,
            at: now(),
        });

        Ok(updated)
    }

    /// Cancel the legs in `scope`. Seat release happens inside the store's
    /// cancel so no seat outlives its booking.
    #[instrument(skip(self, notes))]
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        scope: LegSelection,
        reason: CancellationReason,
        notes: &str,
    ) -> SeatingResult<SeatCancellation> {
        let store = &self.store;
        let record = retry_transient(&self.retry, "cancel_booking", || {
            store.cancel_booking(booking_id, scope, reason, notes.to_string())
        })
        .await?;

        info!(
            booking_id = %booking_id,
            onward_seat = %record.original_onward_seat,
            return_seat = %record.original_return_seat,
            "Booking cancelled"
        );
        self.publish(SeatEvent::BookingCancelled {
            booking_id,
            scope,
            at: now(),
        });

        Ok(record)
    }

    async fn fetch(&self, booking_id: Uuid) -> SeatingResult<Booking> {
        let store = &self.store;
        retry_transient(&self.retry, "get_booking", || store.get_booking(booking_id))
            .await?
            .ok_or(SeatingError::NotFound(booking_id))
    }

    async fn write(&self, booking_id: Uuid, update: BookingUpdate) -> SeatingResult<Booking> {
        let store = &self.store;
        let result = retry_transient(&self.retry, "update_booking", || {
            store.update_booking(booking_id, update.clone())
        })
        .await;

        result.map_err(|err| {
            warn!(booking_id = %booking_id, error = %err, "Booking update rejected");
            SeatingError::from(err)
        })
    }

    fn publish(&self, event: SeatEvent) {
        if let Some(events) = &self.events {
            // No subscribers is fine; nobody is looking at a seat grid.
            let _ = events.send(event);
        }
    }
}
