use bussewa_core::{Booking, Passenger};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

/// Age used when neither an explicit age nor a known bucket is recorded.
pub const FALLBACK_AGE: u32 = 30;

/// Coarse age buckets used for pricing and display.
///
/// Each bucket stands for a single representative age. That value is a
/// placement heuristic, not a real age: "65 & Above" reads as 65 whether the
/// passenger is 66 or 90.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AgeBucket {
    SeventyFiveAndAbove,
    SixtyFiveAndAbove,
    AboveTwelveBelowSixtyFive,
    AboveTwelveBelowSeventyFive,
    TwelveAndBelow,
    Unspecified,
}

impl AgeBucket {
    /// Parse a stored bucket label. Labels carry gender prefixes such as
    /// "M-" or "M&F-", so matching is by substring. The "Above 12" buckets
    /// must be tested before "12 & Below", which they contain.
    pub fn parse(label: &str) -> Self {
        if label.contains("75 & Above") {
            AgeBucket::SeventyFiveAndAbove
        } else if label.contains("65 & Above") {
            AgeBucket::SixtyFiveAndAbove
        } else if label.contains("Above 12 & Below 65") {
            AgeBucket::AboveTwelveBelowSixtyFive
        } else if label.contains("Above 12 & Below 75") {
            AgeBucket::AboveTwelveBelowSeventyFive
        } else if label.contains("12 & Below") {
            AgeBucket::TwelveAndBelow
        } else {
            AgeBucket::Unspecified
        }
    }

    /// Bucket for an explicit age. Only the gender-neutral buckets are
    /// derivable, so 13-64 always lands in "Above 12 & Below 65".
    pub fn for_age(age: u32) -> Self {
        match age {
            0..=12 => AgeBucket::TwelveAndBelow,
            13..=64 => AgeBucket::AboveTwelveBelowSixtyFive,
            65..=74 => AgeBucket::SixtyFiveAndAbove,
            _ => AgeBucket::SeventyFiveAndAbove,
        }
    }

    pub fn representative_age(&self) -> u32 {
        match self {
            AgeBucket::SeventyFiveAndAbove => 75,
            AgeBucket::SixtyFiveAndAbove => 65,
            AgeBucket::AboveTwelveBelowSixtyFive => 40,
            AgeBucket::AboveTwelveBelowSeventyFive => 40,
            AgeBucket::TwelveAndBelow => 12,
            AgeBucket::Unspecified => FALLBACK_AGE,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::SeventyFiveAndAbove => "75 & Above",
            AgeBucket::SixtyFiveAndAbove => "65 & Above",
            AgeBucket::AboveTwelveBelowSixtyFive => "Above 12 & Below 65",
            AgeBucket::AboveTwelveBelowSeventyFive => "Above 12 & Below 75",
            AgeBucket::TwelveAndBelow => "12 & Below",
            AgeBucket::Unspecified => "",
        }
    }

    fn admits(&self, age: u32) -> bool {
        match self {
            AgeBucket::SeventyFiveAndAbove => age >= 75,
            AgeBucket::SixtyFiveAndAbove => age >= 65,
            AgeBucket::AboveTwelveBelowSixtyFive => (13..65).contains(&age),
            AgeBucket::AboveTwelveBelowSeventyFive => (13..75).contains(&age),
            AgeBucket::TwelveAndBelow => age <= 12,
            AgeBucket::Unspecified => true,
        }
    }
}

/// Age used for seat priority. An explicit, non-zero age always wins over
/// the bucket label.
pub fn derived_age(passenger: &Passenger) -> u32 {
    match passenger.age.filter(|age| *age > 0) {
        Some(age) => {
            let bucket = AgeBucket::parse(&passenger.age_criteria);
            if !bucket.admits(age) {
                debug!(
                    passenger_id = %passenger.id,
                    age,
                    bucket = bucket.label(),
                    "Explicit age disagrees with age bucket; using explicit age"
                );
            }
            age
        }
        None => AgeBucket::parse(&passenger.age_criteria).representative_age(),
    }
}

pub fn booking_age(booking: &Booking) -> u32 {
    derived_age(&booking.passenger)
}

/// Passengers whose explicit age contradicts their stored bucket.
/// Which of the two is correct is left to an operator.
pub fn age_mismatch(passenger: &Passenger) -> Option<(u32, AgeBucket)> {
    let age = passenger.age.filter(|age| *age > 0)?;
    let bucket = AgeBucket::parse(&passenger.age_criteria);
    (!bucket.admits(age)).then_some((age, bucket))
}

/// Seat block a manual suggestion draws from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriorityTier {
    Senior,
    Mid,
    General,
}

impl PriorityTier {
    pub const SENIOR_AGE: u32 = 65;
    pub const MID_AGE: u32 = 50;

    pub fn for_age(age: u32) -> Self {
        if age >= Self::SENIOR_AGE {
            PriorityTier::Senior
        } else if age >= Self::MID_AGE {
            PriorityTier::Mid
        } else {
            PriorityTier::General
        }
    }

    /// Zero-based slot range of this tier, clipped to `capacity`.
    pub fn slot_range(&self, block_size: u32, capacity: u32) -> Range<usize> {
        let block = block_size as usize;
        let capacity = capacity as usize;
        let (start, end) = match self {
            PriorityTier::Senior => (0, block),
            PriorityTier::Mid => (block, block.saturating_mul(2)),
            PriorityTier::General => (block.saturating_mul(2), capacity),
        };
        start.min(capacity)..end.min(capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passenger(age: Option<u32>, criteria: &str) -> Passenger {
        let mut passenger = Passenger::new("P").with_age_criteria(criteria);
        passenger.age = age;
        passenger
    }

    #[test]
    fn test_bucket_table() {
        assert_eq!(derived_age(&passenger(None, "M&F-75 & Above")), 75);
        assert_eq!(derived_age(&passenger(None, "M-65 & Above")), 65);
        assert_eq!(derived_age(&passenger(None, "F-12 & Below")), 12);
        assert_eq!(derived_age(&passenger(None, "M-Above 12 & Below 65")), 40);
        assert_eq!(derived_age(&passenger(None, "F-Above 12 & Below 75")), 40);
        assert_eq!(derived_age(&passenger(None, "")), 30);
        assert_eq!(derived_age(&passenger(None, "unknown")), 30);
    }

    #[test]
    fn test_explicit_age_wins() {
        assert_eq!(derived_age(&passenger(Some(70), "M-12 & Below")), 70);
        assert_eq!(derived_age(&passenger(Some(0), "M-65 & Above")), 65);
    }

    #[test]
    fn test_age_mismatch() {
        assert_eq!(
            age_mismatch(&passenger(Some(70), "M-12 & Below")),
            Some((70, AgeBucket::TwelveAndBelow))
        );
        assert_eq!(age_mismatch(&passenger(Some(70), "M-65 & Above")), None);
        assert_eq!(age_mismatch(&passenger(None, "M-65 & Above")), None);
    }

    #[test]
    fn test_bucket_for_age() {
        assert_eq!(AgeBucket::for_age(8), AgeBucket::TwelveAndBelow);
        assert_eq!(AgeBucket::for_age(40), AgeBucket::AboveTwelveBelowSixtyFive);
        assert_eq!(AgeBucket::for_age(65), AgeBucket::SixtyFiveAndAbove);
        assert_eq!(AgeBucket::for_age(81).label(), "75 & Above");
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(PriorityTier::for_age(65), PriorityTier::Senior);
        assert_eq!(PriorityTier::for_age(64), PriorityTier::Mid);
        assert_eq!(PriorityTier::for_age(50), PriorityTier::Mid);
        assert_eq!(PriorityTier::for_age(49), PriorityTier::General);
    }

    #[test]
    fn test_slot_ranges_clip_to_capacity() {
        assert_eq!(PriorityTier::Senior.slot_range(8, 42), 0..8);
        assert_eq!(PriorityTier::Mid.slot_range(8, 42), 8..16);
        assert_eq!(PriorityTier::General.slot_range(8, 42), 16..42);
        assert_eq!(PriorityTier::Mid.slot_range(8, 12), 8..12);
        assert_eq!(PriorityTier::General.slot_range(8, 12), 12..12);
    }
}
