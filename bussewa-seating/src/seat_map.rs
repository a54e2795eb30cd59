use crate::priority::{booking_age, PriorityTier};
use bussewa_core::{Booking, Bus, Leg};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use tracing::warn;
use uuid::Uuid;

/// Two bookings claiming one seat in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatConflict {
    pub seat_number: u32,
    /// Booking that keeps the slot (first in snapshot order).
    pub holder: Uuid,
    pub claimant: Uuid,
}

/// Occupancy of one bus on one leg, derived from a booking snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMap {
    bus_id: Uuid,
    leg: Leg,
    slots: Vec<Option<Uuid>>,
    conflicts: Vec<SeatConflict>,
}

/// Parse a stored seat string; anything outside `1..=capacity` is no seat.
pub fn parse_seat_number(raw: &str, capacity: u32) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|seat| (1..=capacity).contains(seat))
}

impl SeatMap {
    pub fn empty(bus_id: Uuid, leg: Leg, capacity: u32) -> Self {
        Self {
            bus_id,
            leg,
            slots: vec![None; capacity as usize],
            conflicts: Vec::new(),
        }
    }

    /// Build the map from a full booking snapshot.
    ///
    /// Unparseable or out-of-range seat strings are ignored. When two
    /// bookings claim the same seat the first keeps it and the second is
    /// recorded in [`SeatMap::conflicts`].
    pub fn build(capacity: u32, leg: Leg, bus_id: Uuid, bookings: &[Booking]) -> Self {
        let mut map = Self::empty(bus_id, leg, capacity);

        for booking in bookings {
            let seat = booking.leg(leg);
            if seat.bus_id != Some(bus_id) {
                continue;
            }
            let Some(seat_number) = parse_seat_number(&seat.seat_number, capacity) else {
                continue;
            };

            let slot = &mut map.slots[(seat_number - 1) as usize];
            match *slot {
                None => *slot = Some(booking.id),
                Some(holder) if holder == booking.id => {}
                Some(holder) => {
                    warn!(
                        bus_id = %bus_id,
                        leg = %leg,
                        seat_number,
                        holder = %holder,
                        claimant = %booking.id,
                        "Seat claimed by more than one booking"
                    );
                    map.conflicts.push(SeatConflict {
                        seat_number,
                        holder,
                        claimant: booking.id,
                    });
                }
            }
        }

        map
    }

    pub fn for_bus(bus: &Bus, leg: Leg, bookings: &[Booking]) -> Self {
        Self::build(bus.capacity, leg, bus.id, bookings)
    }

    pub fn bus_id(&self) -> Uuid {
        self.bus_id
    }

    pub fn leg(&self) -> Leg {
        self.leg
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn slots(&self) -> &[Option<Uuid>] {
        &self.slots
    }

    /// Booking in a 1-based seat.
    pub fn occupant(&self, seat_number: u32) -> Option<Uuid> {
        let index = (seat_number as usize).checked_sub(1)?;
        self.slots.get(index).copied().flatten()
    }

    pub fn is_free(&self, seat_number: u32) -> bool {
        let Some(index) = (seat_number as usize).checked_sub(1) else {
            return false;
        };
        matches!(self.slots.get(index), Some(None))
    }

    /// First free 1-based seat whose zero-based index lies in `range`.
    pub fn first_free_in(&self, range: Range<usize>) -> Option<u32> {
        let end = range.end.min(self.slots.len());
        let start = range.start.min(end);
        self.slots[start..end]
            .iter()
            .position(Option::is_none)
            .map(|offset| (start + offset + 1) as u32)
    }

    pub fn first_free(&self) -> Option<u32> {
        self.first_free_in(0..self.slots.len())
    }

    /// Mark a seat taken in this copy. Returns false if it was not free.
    pub fn occupy(&mut self, seat_number: u32, booking_id: Uuid) -> bool {
        if !self.is_free(seat_number) {
            return false;
        }
        self.slots[(seat_number - 1) as usize] = Some(booking_id);
        true
    }

    pub fn seat_of(&self, booking_id: Uuid) -> Option<u32> {
        self.slots
            .iter()
            .position(|slot| *slot == Some(booking_id))
            .map(|index| (index + 1) as u32)
    }

    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.len() - self.free_count()
    }

    pub fn conflicts(&self) -> &[SeatConflict] {
        &self.conflicts
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Legend status of one seat. Out-of-range seats read as `Unknown`.
    pub fn classify(&self, seat_number: u32, bookings: &[Booking]) -> SeatStatus {
        if seat_number == 0 || seat_number > self.capacity() {
            return SeatStatus::Unknown;
        }
        match self.occupant(seat_number) {
            None => SeatStatus::Available,
            Some(id) => bookings
                .iter()
                .find(|b| b.id == id)
                .map_or(SeatStatus::Unknown, SeatStatus::of),
        }
    }

    /// Legend status of every seat, in seat order.
    pub fn statuses(&self, bookings: &[Booking]) -> Vec<SeatStatus> {
        let by_id: HashMap<Uuid, &Booking> = bookings.iter().map(|b| (b.id, b)).collect();
        self.slots
            .iter()
            .map(|slot| match slot {
                None => SeatStatus::Available,
                Some(id) => by_id
                    .get(id)
                    .map_or(SeatStatus::Unknown, |booking| SeatStatus::of(booking)),
            })
            .collect()
    }

    /// Positions on a 2+2 coach, four seats per row.
    pub fn layout(&self, priority_block_size: u32) -> Vec<SeatPosition> {
        (1..=self.capacity())
            .map(|seat_number| {
                let index = seat_number - 1;
                SeatPosition {
                    seat_number,
                    row: index / SEATS_PER_ROW,
                    side: if index % SEATS_PER_ROW < 2 { Side::Left } else { Side::Right },
                    is_priority: index < priority_block_size,
                }
            })
            .collect()
    }
}

const SEATS_PER_ROW: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPosition {
    pub seat_number: u32,
    pub row: u32,
    pub side: Side,
    pub is_priority: bool,
}

/// How an occupied seat is flagged on the seat grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Volunteer,
    Senior,
    Family,
    Occupied,
    /// Occupant not present in the snapshot
    Unknown,
}

impl SeatStatus {
    pub fn of(booking: &Booking) -> Self {
        if booking.is_volunteer {
            SeatStatus::Volunteer
        } else if booking_age(booking) >= PriorityTier::SENIOR_AGE {
            SeatStatus::Senior
        } else if booking.passenger.related_to.is_some() {
            SeatStatus::Family
        } else {
            SeatStatus::Occupied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bussewa_core::{LegSelection, Passenger};
    use rand::Rng;

    fn seated(bus_id: Uuid, leg: Leg, seat: &str) -> Booking {
        let mut booking = Booking::new(Passenger::new("P"), LegSelection::Both);
        let leg_seat = booking.leg_mut(leg);
        leg_seat.seat_number = seat.to_string();
        leg_seat.bus_id = Some(bus_id);
        booking
    }

    #[test]
    fn test_build_marks_matching_seats() {
        let bus_id = Uuid::new_v4();
        let other_bus = Uuid::new_v4();
        let bookings = vec![
            seated(bus_id, Leg::Onward, "1"),
            seated(bus_id, Leg::Onward, "42"),
            seated(other_bus, Leg::Onward, "2"),
            seated(bus_id, Leg::Return, "3"),
        ];

        let map = SeatMap::build(42, Leg::Onward, bus_id, &bookings);

        assert_eq!(map.occupant(1), Some(bookings[0].id));
        assert_eq!(map.occupant(42), Some(bookings[1].id));
        assert_eq!(map.occupant(2), None);
        assert_eq!(map.occupant(3), None);
        assert_eq!(map.occupied_count(), 2);
        assert_eq!(map.free_count(), 40);
    }

    #[test]
    fn test_invalid_seat_strings_are_unassigned() {
        let bus_id = Uuid::new_v4();
        let bookings = vec![
            seated(bus_id, Leg::Onward, "abc"),
            seated(bus_id, Leg::Onward, "0"),
            seated(bus_id, Leg::Onward, "43"),
            seated(bus_id, Leg::Onward, "-1"),
            seated(bus_id, Leg::Onward, ""),
        ];

        let map = SeatMap::build(42, Leg::Onward, bus_id, &bookings);

        assert_eq!(map.occupied_count(), 0);
        assert!(!map.has_conflicts());
    }

    #[test]
    fn test_duplicate_claim_is_flagged() {
        let bus_id = Uuid::new_v4();
        let first = seated(bus_id, Leg::Onward, "5");
        let second = seated(bus_id, Leg::Onward, "5");

        let map = SeatMap::build(42, Leg::Onward, bus_id, &[first.clone(), second.clone()]);

        assert_eq!(map.occupant(5), Some(first.id));
        assert_eq!(
            map.conflicts(),
            &[SeatConflict { seat_number: 5, holder: first.id, claimant: second.id }]
        );
    }

    #[test]
    fn test_random_snapshots_never_double_book_and_rebuild_identically() {
        let mut rng = rand::thread_rng();
        let buses = [Uuid::new_v4(), Uuid::new_v4()];

        for _ in 0..50 {
            let capacity = rng.gen_range(1..=45);
            let bookings: Vec<Booking> = (0..rng.gen_range(0..80))
                .map(|_| {
                    let bus = buses[rng.gen_range(0..buses.len())];
                    let leg = if rng.gen_bool(0.5) { Leg::Onward } else { Leg::Return };
                    let seat = rng.gen_range(0..=capacity + 3).to_string();
                    seated(bus, leg, &seat)
                })
                .collect();

            let map = SeatMap::build(capacity, Leg::Onward, buses[0], &bookings);
            let again = SeatMap::build(capacity, Leg::Onward, buses[0], &bookings);
            assert_eq!(map, again);

            let occupants: Vec<Uuid> = map.slots().iter().flatten().copied().collect();
            let mut unique = occupants.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(occupants.len(), unique.len());
        }
    }

    #[test]
    fn test_first_free_in_range() {
        let bus_id = Uuid::new_v4();
        let bookings = vec![seated(bus_id, Leg::Onward, "1"), seated(bus_id, Leg::Onward, "2")];
        let mut map = SeatMap::build(10, Leg::Onward, bus_id, &bookings);

        assert_eq!(map.first_free(), Some(3));
        assert_eq!(map.first_free_in(0..2), None);
        assert_eq!(map.first_free_in(5..50), Some(6));
        assert_eq!(map.first_free_in(12..20), None);

        let id = Uuid::new_v4();
        assert!(map.occupy(3, id));
        assert!(!map.occupy(3, Uuid::new_v4()));
        assert!(!map.occupy(11, id));
        assert_eq!(map.seat_of(id), Some(3));
    }

    #[test]
    fn test_statuses_follow_legend_precedence() {
        let bus_id = Uuid::new_v4();
        let mut volunteer = seated(bus_id, Leg::Onward, "1");
        volunteer.is_volunteer = true;
        volunteer.passenger.age = Some(80);
        let mut senior = seated(bus_id, Leg::Onward, "2");
        senior.passenger.age = Some(70);
        let mut family = seated(bus_id, Leg::Onward, "3");
        family.passenger.related_to = Some(Uuid::new_v4());
        let plain = seated(bus_id, Leg::Onward, "4");
        let bookings = vec![volunteer, senior, family, plain];

        let map = SeatMap::build(6, Leg::Onward, bus_id, &bookings);
        let statuses = map.statuses(&bookings[..3]);

        assert_eq!(
            statuses,
            vec![
                SeatStatus::Volunteer,
                SeatStatus::Senior,
                SeatStatus::Family,
                SeatStatus::Unknown,
                SeatStatus::Available,
                SeatStatus::Available,
            ]
        );
        assert_eq!(map.classify(4, &bookings), SeatStatus::Occupied);
        assert_eq!(map.classify(5, &bookings), SeatStatus::Available);
        assert_eq!(map.classify(7, &bookings), SeatStatus::Unknown);
    }

    #[test]
    fn test_layout_rows() {
        let map = SeatMap::empty(Uuid::new_v4(), Leg::Onward, 42);
        let layout = map.layout(8);

        assert_eq!(layout.len(), 42);
        assert_eq!(layout[0].side, Side::Left);
        assert_eq!(layout[2].side, Side::Right);
        assert!(layout[7].is_priority);
        assert!(!layout[8].is_priority);
        assert_eq!(layout[41].row, 10);
    }
}
