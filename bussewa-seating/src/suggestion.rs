use crate::priority::{booking_age, PriorityTier};
use crate::seat_map::SeatMap;
use bussewa_core::config::SeatingConfig;
use bussewa_core::Booking;
use serde::Serialize;

/// Best free seat for a passenger of `age`, drawn only from that age's tier.
///
/// Tiers never spill over: a senior whose block is full gets `None` even
/// when general seating has room. The operator picks a seat by hand then.
pub fn suggest_seat_for_age(seat_map: &SeatMap, age: u32, block_size: u32) -> Option<u32> {
    let range = PriorityTier::for_age(age).slot_range(block_size, seat_map.capacity());
    seat_map.first_free_in(range)
}

pub fn suggest_seat(seat_map: &SeatMap, booking: &Booking, block_size: u32) -> Option<u32> {
    suggest_seat_for_age(seat_map, booking_age(booking), block_size)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub seat_number: u32,
    pub tier: PriorityTier,
    pub derived_age: u32,
}

/// Suggests seats with a fixed priority block size
#[derive(Debug, Clone, Copy)]
pub struct SeatSuggester {
    block_size: u32,
}

impl SeatSuggester {
    pub fn new(block_size: u32) -> Self {
        Self { block_size }
    }

    pub fn from_config(config: &SeatingConfig) -> Self {
        Self::new(config.priority_seat_block_size)
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn suggest(&self, seat_map: &SeatMap, booking: &Booking) -> Option<Suggestion> {
        let derived_age = booking_age(booking);
        suggest_seat_for_age(seat_map, derived_age, self.block_size).map(|seat_number| Suggestion {
            seat_number,
            tier: PriorityTier::for_age(derived_age),
            derived_age,
        })
    }
}

impl Default for SeatSuggester {
    fn default() -> Self {
        Self::from_config(&SeatingConfig::default())
    }
}
