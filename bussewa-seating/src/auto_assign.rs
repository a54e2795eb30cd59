use crate::assignment::SeatAssigner;
use crate::eligibility::{EligibilityFilter, Ineligibility};
use crate::error::{SeatingError, SeatingResult, ValidationError};
use crate::priority::booking_age;
use crate::seat_map::SeatMap;
use bussewa_core::config::SeatingConfig;
use bussewa_core::{Booking, Bus, Leg};
use futures_util::stream::{self, StreamExt};
use std::cmp::Reverse;
use std::pin::pin;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Assigned { seat_number: u32 },
    Failed { seat_number: u32, error: SeatingError },
    /// Bus was full by the time this booking's turn came.
    NoSeat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutoAssignItem {
    pub booking_id: Uuid,
    pub passenger_name: String,
    pub derived_age: u32,
    pub outcome: ItemOutcome,
}

/// Result of one auto-assign batch. A partial batch is a normal outcome:
/// every successful item is already durable in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoAssignReport {
    pub bus_id: Uuid,
    pub leg: Leg,
    /// Processed bookings, in priority order.
    pub items: Vec<AutoAssignItem>,
    /// Bookings for this bus and leg left out by the eligibility filter.
    /// Already seated bookings are not counted.
    pub not_eligible: Vec<(Uuid, Ineligibility)>,
}

impl AutoAssignReport {
    pub fn assigned(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, ItemOutcome::Assigned { .. }))
            .count()
    }

    /// Items for which a store write was attempted.
    pub fn attempted(&self) -> usize {
        self.items
            .iter()
            .filter(|item| !matches!(item.outcome, ItemOutcome::NoSeat))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.failed_bookings().len()
    }

    pub fn failed_bookings(&self) -> Vec<Uuid> {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, ItemOutcome::Failed { .. }))
            .map(|item| item.booking_id)
            .collect()
    }

    pub fn unplaced_bookings(&self) -> Vec<Uuid> {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, ItemOutcome::NoSeat))
            .map(|item| item.booking_id)
            .collect()
    }

    pub fn seat_for(&self, booking_id: Uuid) -> Option<u32> {
        self.items.iter().find(|item| item.booking_id == booking_id).and_then(|item| {
            match item.outcome {
                ItemOutcome::Assigned { seat_number } => Some(seat_number),
                _ => None,
            }
        })
    }

    /// Operator-facing summary, e.g. "2 assigned, 1 not eligible".
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} assigned", self.assigned())];
        let failed = self.failed();
        if failed > 0 {
            parts.push(format!("{} failed", failed));
        }
        let unplaced = self.unplaced_bookings().len();
        if unplaced > 0 {
            parts.push(format!("{} without a seat", unplaced));
        }
        if !self.not_eligible.is_empty() {
            parts.push(format!("{} not eligible", self.not_eligible.len()));
        }
        parts.join(", ")
    }
}

/// Seats every eligible, unseated booking on one bus, oldest passenger
/// first, filling seats front to back.
///
/// Unlike a single suggestion, the batch ignores priority blocks: sorting by
/// age already puts seniors at the front.
pub struct AutoAssigner {
    assigner: Arc<SeatAssigner>,
    concurrency: usize,
}

impl AutoAssigner {
    pub fn new(assigner: Arc<SeatAssigner>) -> Self {
        Self {
            assigner,
            concurrency: 1,
        }
    }

    pub fn from_config(assigner: Arc<SeatAssigner>, config: &SeatingConfig) -> Self {
        Self::new(assigner).with_concurrency(config.auto_assign_concurrency)
    }

    /// Booking lookups kept in flight ahead of the seat writes.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetch a snapshot, filter it and seat everything eligible.
    #[instrument(skip(self, bus), fields(bus_id = %bus.id, bus = %bus.number))]
    pub async fn run(&self, bus: &Bus, leg: Leg) -> SeatingResult<AutoAssignReport> {
        if !bus.serves(leg) {
            return Err(ValidationError::LegMismatch { bus_id: bus.id, leg }.into());
        }

        let bookings = self.assigner.snapshot().await?;
        let seat_map = SeatMap::for_bus(bus, leg, &bookings);
        let filter = EligibilityFilter::new(leg, Some(bus));
        let (eligible, _) = filter.partition(&bookings);

        // Only bookings travelling on this bus and leg are worth reporting
        let not_eligible: Vec<(Uuid, Ineligibility)> = bookings
            .iter()
            .filter(|booking| filter.applies_to(booking))
            .filter_map(|booking| match filter.check(booking) {
                Err(Ineligibility::AlreadyAssigned) | Ok(()) => None,
                Err(reason) => Some((booking.id, reason)),
            })
            .collect();

        let mut report = self.assign_all(bus, leg, &seat_map, eligible).await;
        report.not_eligible = not_eligible;

        info!(summary = %report.summary(), "Auto-assign finished");
        Ok(report)
    }

    /// Seat `eligible` bookings against a copy of `seat_map`. The copy is
    /// advisory and dropped afterwards; rebuild from the store to see the
    /// real outcome.
    ///
    /// Booking lookups run up to `concurrency` ahead, but seats are written
    /// one at a time in priority order, so the resulting layout does not
    /// depend on the concurrency setting.
    pub async fn assign_all(
        &self,
        bus: &Bus,
        leg: Leg,
        seat_map: &SeatMap,
        mut eligible: Vec<Booking>,
    ) -> AutoAssignReport {
        // sort_by_key is stable, so equal ages keep snapshot order
        eligible.sort_by_key(|booking| Reverse(booking_age(booking)));

        let mut seats = seat_map.clone();
        let assigner = &self.assigner;
        let mut lookups = pin!(stream::iter(eligible)
            .map(|booking| async move {
                let current = assigner.fetch_placeable(booking.id, bus, leg).await;
                (booking, current)
            })
            .buffered(self.concurrency));

        let mut items = Vec::new();
        while let Some((booking, current)) = lookups.next().await {
            let outcome = match current {
                Ok(_) => self.place_next_free(&booking, bus, leg, &mut seats).await,
                Err(err) => match seats.first_free() {
                    None => ItemOutcome::NoSeat,
                    Some(seat_number) => {
                        error!(
                            booking_id = %booking.id,
                            passenger = %booking.passenger.name,
                            error = %err,
                            "Booking can no longer be seated"
                        );
                        ItemOutcome::Failed { seat_number, error: err }
                    }
                },
            };
            items.push(item(&booking, outcome));
        }

        AutoAssignReport {
            bus_id: bus.id,
            leg,
            items,
            not_eligible: Vec::new(),
        }
    }

    /// Write the booking into the first free seat. A seat the store reports
    /// as taken is marked with its holder and the next free one is tried.
    async fn place_next_free(&self, booking: &Booking, bus: &Bus, leg: Leg, seats: &mut SeatMap) -> ItemOutcome {
        loop {
            let Some(seat_number) = seats.first_free() else {
                warn!(booking_id = %booking.id, "No free seat left");
                return ItemOutcome::NoSeat;
            };

            match self.assigner.place(booking.id, seat_number, bus, leg).await {
                Ok(_) => {
                    seats.occupy(seat_number, booking.id);
                    return ItemOutcome::Assigned { seat_number };
                }
                Err(SeatingError::Conflict { holder, .. }) => {
                    warn!(
                        booking_id = %booking.id,
                        seat_number,
                        holder = %holder,
                        "Seat taken since the snapshot, trying the next one"
                    );
                    seats.occupy(seat_number, holder);
                }
                Err(err) => {
                    error!(
                        booking_id = %booking.id,
                        passenger = %booking.passenger.name,
                        seat_number,
                        error = %err,
                        "Auto-assign failed for booking"
                    );
                    return ItemOutcome::Failed { seat_number, error: err };
                }
            }
        }
    }
}

fn item(booking: &Booking, outcome: ItemOutcome) -> AutoAssignItem {
    AutoAssignItem {
        booking_id: booking.id,
        passenger_name: booking.passenger.name.clone(),
        derived_age: booking_age(booking),
        outcome,
    }
}
