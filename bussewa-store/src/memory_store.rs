use async_trait::async_trait;
use bussewa_core::{
    Booking, BookingStore, BookingUpdate, Bus, BusDirectory, CancellationReason, Journey, Leg,
    LegSelection, SeatCancellation, StoreError, StoreResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// In-process booking store and bus directory.
///
/// Every write runs its uniqueness check and its mutation under one write
/// lock, which gives the same guarantee as a unique index on
/// (bus, leg, seat) in a database.
#[derive(Default)]
pub struct MemoryBookingStore {
    bookings: RwLock<Vec<Booking>>,
    buses: RwLock<Vec<Bus>>,
    journeys: RwLock<Vec<Journey>>,
    cancellations: RwLock<Vec<SeatCancellation>>,
    pending_outages: AtomicUsize,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bookings(bookings: Vec<Booking>) -> Self {
        Self {
            bookings: RwLock::new(bookings),
            ..Self::default()
        }
    }

    pub async fn insert_booking(&self, booking: Booking) {
        self.bookings.write().await.push(booking);
    }

    pub async fn insert_bus(&self, bus: Bus) {
        self.buses.write().await.push(bus);
    }

    pub async fn insert_journey(&self, journey: Journey) {
        self.journeys.write().await.push(journey);
    }

    pub async fn cancellations(&self) -> Vec<SeatCancellation> {
        self.cancellations.read().await.clone()
    }

    /// Make the next `count` calls fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, count: usize) {
        self.pending_outages.store(count, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        let outage = self
            .pending_outages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if outage {
            debug!("Simulated store outage");
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }

    /// Reject `candidate` if its seat on `leg` is held by another live booking.
    fn check_seat_free(bookings: &[Booking], candidate: &Booking, leg: Leg) -> StoreResult<()> {
        let seat = candidate.leg(leg);
        if !seat.is_assigned() {
            return Ok(());
        }
        let Some(bus_id) = seat.bus_id else {
            return Err(StoreError::Backend(format!(
                "booking {} has seat {} on {} without a bus",
                candidate.id, seat.seat_number, leg
            )));
        };

        let holder = bookings.iter().find(|other| {
            let theirs = other.leg(leg);
            other.id != candidate.id
                && !other.is_cancelled()
                && theirs.bus_id == Some(bus_id)
                && same_seat(&theirs.seat_number, &seat.seat_number)
        });

        match holder {
            Some(holder) => Err(StoreError::Conflict {
                bus_id,
                leg,
                seat_number: seat.seat_index().unwrap_or(0),
                holder: holder.id,
            }),
            None => Ok(()),
        }
    }
}

fn same_seat(a: &str, b: &str) -> bool {
    match (a.trim().parse::<u32>(), b.trim().parse::<u32>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        self.check_available()?;
        Ok(self.bookings.read().await.clone())
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        self.check_available()?;
        Ok(self.bookings.read().await.iter().find(|b| b.id == id).cloned())
    }

    async fn update_booking(&self, id: Uuid, update: BookingUpdate) -> StoreResult<Booking> {
        self.check_available()?;
        let mut bookings = self.bookings.write().await;
        let index = bookings
            .iter()
            .position(|b| b.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let mut candidate = bookings[index].clone();
        candidate.apply(&update);
        if let Some(change) = &update.seat {
            Self::check_seat_free(&bookings, &candidate, change.leg)?;
        }

        bookings[index] = candidate.clone();
        Ok(candidate)
    }

    async fn cancel_booking(
        &self,
        id: Uuid,
        scope: LegSelection,
        reason: CancellationReason,
        notes: String,
    ) -> StoreResult<SeatCancellation> {
        self.check_available()?;
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let record = booking.cancel(scope, reason, notes);
        info!(booking_id = %id, status = ?booking.status, "Cancellation recorded");

        self.cancellations.write().await.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl BusDirectory for MemoryBookingStore {
    async fn list_buses(&self, leg: Option<Leg>) -> StoreResult<Vec<Bus>> {
        self.check_available()?;
        Ok(self
            .buses
            .read()
            .await
            .iter()
            .filter(|bus| bus.is_active && leg.map_or(true, |leg| bus.serves(leg)))
            .cloned()
            .collect())
    }

    async fn list_journeys(&self, active_only: bool) -> StoreResult<Vec<Journey>> {
        self.check_available()?;
        let mut journeys: Vec<Journey> = self
            .journeys
            .read()
            .await
            .iter()
            .filter(|journey| !active_only || journey.is_active)
            .cloned()
            .collect();
        journeys.sort_by_key(|journey| (journey.date, journey.leg == Leg::Return));
        Ok(journeys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bussewa_core::{BookingStatus, Passenger, PaymentStatus};
    use chrono::NaiveDate;

    fn paid() -> Booking {
        Booking::new(Passenger::new("P"), LegSelection::Both).with_payment(PaymentStatus::Paid)
    }

    #[tokio::test]
    async fn test_update_rejects_taken_seat() {
        let first = paid();
        let second = paid();
        let store = MemoryBookingStore::with_bookings(vec![first.clone(), second.clone()]);
        let bus = Uuid::new_v4();

        store
            .update_booking(first.id, BookingUpdate::assign(Leg::Onward, 5, bus))
            .await
            .unwrap();
        let err = store
            .update_booking(second.id, BookingUpdate::assign(Leg::Onward, 5, bus))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::Conflict { bus_id: bus, leg: Leg::Onward, seat_number: 5, holder: first.id }
        );

        // Same seat on the other leg or another bus is fine
        store
            .update_booking(second.id, BookingUpdate::assign(Leg::Return, 5, bus))
            .await
            .unwrap();
        store
            .update_booking(second.id, BookingUpdate::assign(Leg::Onward, 5, Uuid::new_v4()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reassigning_own_seat_is_idempotent() {
        let booking = paid();
        let store = MemoryBookingStore::with_bookings(vec![booking.clone()]);
        let bus = Uuid::new_v4();

        for _ in 0..2 {
            let updated = store
                .update_booking(booking.id, BookingUpdate::assign(Leg::Onward, 3, bus))
                .await
                .unwrap();
            assert_eq!(updated.onward.seat_number, "3");
        }
    }

    #[tokio::test]
    async fn test_cancel_frees_seat_for_others() {
        let first = paid();
        let second = paid();
        let store = MemoryBookingStore::with_bookings(vec![first.clone(), second.clone()]);
        let bus = Uuid::new_v4();

        store
            .update_booking(first.id, BookingUpdate::assign(Leg::Onward, 1, bus))
            .await
            .unwrap();
        let record = store
            .cancel_booking(first.id, LegSelection::Both, CancellationReason::Other, "no-show".into())
            .await
            .unwrap();

        assert_eq!(record.original_onward_seat, "1");
        let cancelled = store.get_booking(first.id).await.unwrap().unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.onward.bus_id, None);
        assert_eq!(store.cancellations().await.len(), 1);

        store
            .update_booking(second.id, BookingUpdate::assign(Leg::Onward, 1, bus))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_seat_without_bus_is_rejected() {
        let booking = paid();
        let store = MemoryBookingStore::with_bookings(vec![booking.clone()]);
        let update = BookingUpdate {
            seat: Some(bussewa_core::LegSeatUpdate {
                leg: Leg::Onward,
                seat_number: "4".to_string(),
                bus_id: None,
            }),
            ..BookingUpdate::default()
        };

        let err = store.update_booking(booking.id, update).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(store.get_booking(booking.id).await.unwrap().unwrap().onward.seat_number, "");
    }

    #[tokio::test]
    async fn test_unknown_booking() {
        let store = MemoryBookingStore::new();
        let id = Uuid::new_v4();
        let err = store.update_booking(id, BookingUpdate::clear(Leg::Onward)).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound(id));
    }

    #[tokio::test]
    async fn test_simulated_outage() {
        let store = MemoryBookingStore::new();
        store.fail_next(1);

        assert!(matches!(store.list_bookings().await, Err(StoreError::Unavailable(_))));
        assert!(store.list_bookings().await.is_ok());
    }

    #[tokio::test]
    async fn test_directory_filters() {
        let store = MemoryBookingStore::new();
        let day = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
        let onward_bus = Bus::new("KA-01", 42).with_journey(Leg::Onward, day);
        let any_bus = Bus::new("KA-02", 40);
        let mut retired = Bus::new("KA-03", 40);
        retired.is_active = false;
        store.insert_bus(onward_bus.clone()).await;
        store.insert_bus(any_bus.clone()).await;
        store.insert_bus(retired).await;

        let return_buses = store.list_buses(Some(Leg::Return)).await.unwrap();
        assert_eq!(return_buses, vec![any_bus.clone()]);
        assert_eq!(store.list_buses(None).await.unwrap().len(), 2);

        let mut old = Journey::new(Leg::Return, day);
        old.is_active = false;
        store.insert_journey(old).await;
        store.insert_journey(Journey::new(Leg::Onward, day)).await;
        assert_eq!(store.list_journeys(true).await.unwrap().len(), 1);
        let all = store.list_journeys(false).await.unwrap();
        assert_eq!(all[0].leg, Leg::Onward);
    }
}
