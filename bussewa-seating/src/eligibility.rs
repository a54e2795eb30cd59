use bussewa_core::{Booking, Bus, Leg};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a booking cannot be placed right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Ineligibility {
    #[error("booking is cancelled")]
    Cancelled,

    #[error("booking is not paid and has no allocation override")]
    Unpaid,

    #[error("booking does not travel on the {0} leg")]
    LegNotBooked(Leg),

    #[error("booking travels on {booking} but the bus runs on {bus}")]
    DateMismatch { booking: NaiveDate, bus: NaiveDate },

    #[error("booking already holds a seat on this leg")]
    AlreadyAssigned,
}

/// Selects the bookings that may be seated on one leg, optionally against a
/// specific bus whose journey date must match.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityFilter {
    leg: Leg,
    bus_date: Option<NaiveDate>,
}

impl EligibilityFilter {
    pub fn new(leg: Leg, bus: Option<&Bus>) -> Self {
        Self {
            leg,
            bus_date: bus.and_then(Bus::journey_date),
        }
    }

    pub fn leg(&self) -> Leg {
        self.leg
    }

    /// Rules that hold regardless of the booking's current seat.
    pub fn check_placeable(&self, booking: &Booking) -> Result<(), Ineligibility> {
        if booking.is_cancelled() {
            return Err(Ineligibility::Cancelled);
        }
        if !booking.is_paid() && !booking.allow_unpaid_allocation {
            return Err(Ineligibility::Unpaid);
        }
        if !booking.leg_selection.includes(self.leg) {
            return Err(Ineligibility::LegNotBooked(self.leg));
        }
        if let (Some(bus), Some(own)) = (self.bus_date, booking.leg(self.leg).journey_date) {
            if own != bus {
                return Err(Ineligibility::DateMismatch { booking: own, bus });
            }
        }
        Ok(())
    }

    /// Whether the booking travels on this leg and, when the bus is bound
    /// to a date, on that date. Payment and status are not considered.
    pub fn applies_to(&self, booking: &Booking) -> bool {
        if !booking.leg_selection.includes(self.leg) {
            return false;
        }
        match (self.bus_date, booking.leg(self.leg).journey_date) {
            (Some(bus), Some(own)) => own == bus,
            _ => true,
        }
    }

    /// Full check for an unassigned booking awaiting a seat.
    pub fn check(&self, booking: &Booking) -> Result<(), Ineligibility> {
        self.check_placeable(booking)?;
        if booking.leg(self.leg).is_assigned() {
            return Err(Ineligibility::AlreadyAssigned);
        }
        Ok(())
    }

    pub fn is_eligible(&self, booking: &Booking) -> bool {
        self.check(booking).is_ok()
    }

    /// Eligible bookings in snapshot order.
    pub fn eligible<'a>(&self, bookings: &'a [Booking]) -> Vec<&'a Booking> {
        bookings.iter().filter(|b| self.is_eligible(b)).collect()
    }

    /// Split a snapshot into eligible bookings and the rejected ones with
    /// their reason.
    pub fn partition(&self, bookings: &[Booking]) -> (Vec<Booking>, Vec<(Uuid, Ineligibility)>) {
        let mut eligible = Vec::new();
        let mut rejected = Vec::new();
        for booking in bookings {
            match self.check(booking) {
                Ok(()) => eligible.push(booking.clone()),
                Err(reason) => rejected.push((booking.id, reason)),
            }
        }
        (eligible, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bussewa_core::{BookingStatus, LegSelection, Passenger, PaymentStatus};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn paid(selection: LegSelection) -> Booking {
        Booking::new(Passenger::new("P"), selection).with_payment(PaymentStatus::Paid)
    }

    #[test]
    fn test_payment_rule() {
        let filter = EligibilityFilter::new(Leg::Onward, None);

        assert!(filter.is_eligible(&paid(LegSelection::Both)));

        let pending = paid(LegSelection::Both).with_payment(PaymentStatus::Pending);
        assert_eq!(filter.check(&pending), Err(Ineligibility::Unpaid));

        let partial = paid(LegSelection::Both).with_payment(PaymentStatus::Partial);
        assert_eq!(filter.check(&partial), Err(Ineligibility::Unpaid));

        let mut overridden = pending.clone();
        overridden.allow_unpaid_allocation = true;
        assert!(filter.is_eligible(&overridden));
    }

    #[test]
    fn test_leg_rule() {
        let onward = EligibilityFilter::new(Leg::Onward, None);
        let ret = EligibilityFilter::new(Leg::Return, None);
        let booking = paid(LegSelection::Return);

        assert_eq!(onward.check(&booking), Err(Ineligibility::LegNotBooked(Leg::Onward)));
        assert!(ret.is_eligible(&booking));
    }

    #[test]
    fn test_date_rule() {
        let bus = Bus::new("KA-01", 42).with_journey(Leg::Onward, date(14));
        let filter = EligibilityFilter::new(Leg::Onward, Some(&bus));

        let undated = paid(LegSelection::Both);
        let same_day = paid(LegSelection::Both).with_journey_date(Leg::Onward, date(14));
        let other_day = paid(LegSelection::Both).with_journey_date(Leg::Onward, date(15));
        let other_leg_dated = paid(LegSelection::Both).with_journey_date(Leg::Return, date(20));

        assert!(filter.is_eligible(&undated));
        assert!(filter.is_eligible(&same_day));
        assert!(filter.is_eligible(&other_leg_dated));
        assert_eq!(
            filter.check(&other_day),
            Err(Ineligibility::DateMismatch { booking: date(15), bus: date(14) })
        );

        let undated_bus = Bus::new("KA-02", 42);
        assert!(EligibilityFilter::new(Leg::Onward, Some(&undated_bus)).is_eligible(&other_day));
    }

    #[test]
    fn test_applies_to_ignores_payment_and_status() {
        let bus = Bus::new("KA-01", 42).with_journey(Leg::Onward, date(14));
        let filter = EligibilityFilter::new(Leg::Onward, Some(&bus));

        let mut cancelled = paid(LegSelection::Onward).with_payment(PaymentStatus::Pending);
        cancelled.status = BookingStatus::Cancelled;
        assert!(filter.applies_to(&cancelled));

        assert!(!filter.applies_to(&paid(LegSelection::Return)));
        assert!(!filter.applies_to(&paid(LegSelection::Both).with_journey_date(Leg::Onward, date(15))));
        assert!(filter.applies_to(&paid(LegSelection::Both).with_journey_date(Leg::Onward, date(14))));
    }

    #[test]
    fn test_assigned_and_cancelled_are_excluded() {
        let filter = EligibilityFilter::new(Leg::Onward, None);

        let mut seated = paid(LegSelection::Both);
        seated.onward.seat_number = "4".to_string();
        assert_eq!(filter.check(&seated), Err(Ineligibility::AlreadyAssigned));
        assert!(filter.check_placeable(&seated).is_ok());

        let mut placeholder = paid(LegSelection::Both);
        placeholder.onward.seat_number = "0".to_string();
        assert!(filter.is_eligible(&placeholder));

        let mut cancelled = paid(LegSelection::Both);
        cancelled.status = BookingStatus::Cancelled;
        assert_eq!(filter.check(&cancelled), Err(Ineligibility::Cancelled));
    }

    #[test]
    fn test_partition_keeps_order() {
        let filter = EligibilityFilter::new(Leg::Onward, None);
        let bookings = vec![
            paid(LegSelection::Both),
            paid(LegSelection::Both).with_payment(PaymentStatus::Pending),
            paid(LegSelection::Onward),
        ];

        let (eligible, rejected) = filter.partition(&bookings);

        assert_eq!(
            eligible.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![bookings[0].id, bookings[2].id]
        );
        assert_eq!(rejected, vec![(bookings[1].id, Ineligibility::Unpaid)]);
        assert_eq!(filter.eligible(&bookings).len(), 2);
    }
}
